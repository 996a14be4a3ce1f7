// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Stream profile generation.
//!
//! Turns calls into [`StreamProfile`]s and aggregates them into a
//! [`SystemProfile`]. Apart from the generation timestamp everything here is a
//! pure function of its inputs, so re-ingesting the same calls yields the same
//! stream ids and descriptions.

use std::collections::HashSet;

use chrono::{NaiveDateTime, SecondsFormat, Utc};
use log::{debug, info};

use crate::correlate::build_lookup;
use crate::model::{
    CallRecord, ChannelDescriptor, StreamMetadata, StreamProfile, SystemProfile, WalletAssignment,
};
use crate::wallet::WalletPool;

const DESCRIPTION_SEPARATOR: &str = " | ";
const CALL_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Globally unique, deterministic id of the stream for one call.
#[must_use]
pub fn stream_id(system_id: &str, channel_num: i64, call_id: &str) -> String {
    format!("{system_id}-{channel_num}-{call_id}")
}

/// Display name: descriptor description, then its short tag, then
/// `Channel <num>`.
#[must_use]
pub fn stream_name(call: &CallRecord, descriptor: Option<&ChannelDescriptor>) -> String {
    descriptor
        .and_then(|d| d.description().or_else(|| d.short_tag()))
        .map_or_else(|| format!("Channel {}", call.channel_num), str::to_string)
}

/// Render a call time as `YYYY-MM-DD HH:MM:SS UTC`, falling back to the raw
/// string when it does not parse.
#[must_use]
pub fn format_call_time(raw: &str) -> String {
    let whole_seconds = raw.split('.').next().unwrap_or(raw);
    NaiveDateTime::parse_from_str(whole_seconds, CALL_TIME_FORMAT)
        .map_or_else(|_| raw.to_string(), |t| t.format(DISPLAY_TIME_FORMAT).to_string())
}

/// Compose the human-readable description of a stream.
#[must_use]
pub fn describe(call: &CallRecord, system_id: &str, descriptor: Option<&ChannelDescriptor>) -> String {
    let mut parts = vec![
        format!("System: {system_id}"),
        format!("Duration: {}s", call.duration),
        format!("Radios: {}", call.sources.len()),
        format!("Time: {}", format_call_time(&call.time)),
    ];

    if let Some(category) = descriptor.and_then(ChannelDescriptor::category) {
        parts.insert(1, format!("Category: {category}"));
    }

    parts.join(DESCRIPTION_SEPARATOR)
}

/// Build the stream profile for one call.
#[must_use]
pub fn generate_profile(
    call: &CallRecord,
    system_id: &str,
    descriptor: Option<&ChannelDescriptor>,
    wallet: Option<WalletAssignment>,
) -> StreamProfile {
    StreamProfile {
        stream_id: stream_id(system_id, call.channel_num, &call.id),
        name: stream_name(call, descriptor),
        description: describe(call, system_id, descriptor),
        audio_url: call.url.clone(),
        system_name: system_id.to_string(),
        channel_id: call.channel_num,
        timestamp: call.time.clone(),
        duration: call.duration,
        filename: call.filename.clone(),
        src_list: call.sources.clone(),
        metadata: StreamMetadata {
            star_count: call.star_count,
            call_id: call.id.clone(),
            channel: descriptor.cloned(),
        },
        wallet,
    }
}

/// Sort newest first by raw timestamp string.
///
/// Assumes upstream formats timestamps consistently; no date parsing is done.
pub fn sort_newest_first(streams: &mut [StreamProfile]) {
    streams.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

/// Generate the profile of a whole system.
///
/// Calls with no duration are skipped, and a call repeated upstream yields
/// one stream (the first seen). Wallets are requested only when a pool is
/// supplied.
pub async fn generate_system_profile(
    system_id: &str,
    descriptors: &[ChannelDescriptor],
    calls: &[CallRecord],
    wallets: Option<&WalletPool>,
) -> SystemProfile {
    let lookup = build_lookup(descriptors);
    debug!(
        "Correlated {} of {} channel descriptors",
        lookup.len(),
        descriptors.len()
    );

    let mut seen = HashSet::new();
    let mut streams: Vec<StreamProfile> = calls
        .iter()
        .filter(|call| call.is_ingestible())
        .map(|call| generate_profile(call, system_id, lookup.get(&call.channel_num), None))
        .filter(|stream| {
            let first = seen.insert(stream.stream_id.clone());
            if !first {
                debug!("Dropping repeated stream {}", stream.stream_id);
            }
            first
        })
        .collect();

    if let Some(pool) = wallets {
        let assigned = pool.assign_all(&mut streams).await;
        info!("Assigned wallets to {assigned} of {} streams", streams.len());
    }

    sort_newest_first(&mut streams);

    SystemProfile {
        system_id: system_id.to_string(),
        total_streams: streams.len(),
        total_channels: descriptors.len(),
        channels: descriptors.to_vec(),
        streams,
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}
