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

//! Data model for channels, calls and the stream profiles derived from them.
//!
//! Upstream records keep their OpenMHz field names on the wire (`talkgroupNum`,
//! `srcList`, ...). Derived records serialize with the field names the stream
//! registry has always used, so existing `streams.json` consumers keep working.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Channel (talkgroup) descriptor as returned by the upstream API.
///
/// Upstream schemas vary between systems, so the descriptor keeps the raw
/// JSON object and exposes typed accessors for the fields the pipeline uses.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelDescriptor(Map<String, Value>);

impl ChannelDescriptor {
    #[must_use]
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Build a descriptor from a JSON value, if it is an object.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    /// Raw access to any field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Long human-readable description (e.g. "Fire Dispatch").
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.str_field("description")
    }

    /// Short alpha tag (e.g. "FIRE_DISP").
    #[must_use]
    pub fn short_tag(&self) -> Option<&str> {
        self.str_field("alpha")
    }

    /// Category tag (e.g. "Law Dispatch").
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.str_field("tag")
    }

    fn str_field(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }
}

/// Upstream sends `null` for absent optional fields; treat it like a
/// missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One source radio keyed into a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRadio {
    /// Radio unit id.
    pub src: i64,
    /// Offset into the call in seconds.
    #[serde(default, deserialize_with = "null_as_default")]
    pub pos: f64,
}

/// A recorded transmission as returned by the upstream API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "talkgroupNum")]
    pub channel_num: i64,
    /// ISO-like timestamp, kept verbatim.
    pub time: String,
    /// Duration in seconds.
    #[serde(rename = "len", default, deserialize_with = "null_as_default")]
    pub duration: f64,
    #[serde(rename = "srcList", default, deserialize_with = "null_as_default")]
    pub sources: Vec<SourceRadio>,
    #[serde(rename = "star", default, deserialize_with = "null_as_default")]
    pub star_count: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub filename: String,
}

impl CallRecord {
    /// Only calls with a positive duration carry audio worth ingesting.
    #[must_use]
    pub fn is_ingestible(&self) -> bool {
        self.duration > 0.0
    }
}

/// Wallet identity issued for a stream by the wallet collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAssignment {
    pub address: String,
    #[serde(default)]
    pub contract_address: Option<String>,
    pub mode: String,
    pub created_at: String,
}

/// Call-level metadata carried alongside a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamMetadata {
    pub star_count: u32,
    pub call_id: String,
    #[serde(rename = "talkgroup_info")]
    pub channel: Option<ChannelDescriptor>,
}

/// Enriched, ingestible record derived from one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamProfile {
    pub stream_id: String,
    pub name: String,
    pub description: String,
    pub audio_url: String,
    pub system_name: String,
    #[serde(rename = "talkgroup_id")]
    pub channel_id: i64,
    pub timestamp: String,
    pub duration: f64,
    pub filename: String,
    pub src_list: Vec<SourceRadio>,
    pub metadata: StreamMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet: Option<WalletAssignment>,
}

impl StreamProfile {
    /// Attach a wallet unless one is already set.
    ///
    /// Returns `false` if the stream already carried a wallet.
    pub fn attach_wallet(&mut self, wallet: WalletAssignment) -> bool {
        if self.wallet.is_some() {
            return false;
        }
        self.wallet = Some(wallet);
        true
    }
}

/// All streams generated for one radio system in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemProfile {
    pub system_id: String,
    pub total_streams: usize,
    #[serde(rename = "total_talkgroups")]
    pub total_channels: usize,
    #[serde(rename = "talkgroups", default)]
    pub channels: Vec<ChannelDescriptor>,
    /// Newest first.
    pub streams: Vec<StreamProfile>,
    pub generated_at: String,
}

/// System-level information from the upstream API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    #[serde(default)]
    pub name: Option<String>,
}
