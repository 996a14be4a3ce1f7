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

//! OpenMHz API client.
//!
//! Every fetch comes in two forms. The `try_*` form returns a typed
//! [`IngestError`]; the plain form logs that error and degrades to an empty
//! result, because a failed upstream request means "nothing new", never a
//! failed run.

mod filter;

pub use filter::CallFilter;

use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{IngestError, IngestResult};
use crate::model::{CallRecord, ChannelDescriptor, SystemInfo};

/// Public OpenMHz API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openmhz.com";

/// User agent sent with every request unless configured otherwise.
pub const DEFAULT_USER_AGENT: &str = concat!("openmhz-ingest/", env!("CARGO_PKG_VERSION"));

/// Configuration for the API client.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL without trailing slash.
    pub base_url: String,
    /// User-Agent header value.
    pub user_agent: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// How far back to look for calls when no start time is given.
    pub since_secs: i64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(10),
            since_secs: 300,
        }
    }
}

/// Client for channel, call and system endpoints.
///
/// Requests are issued one at a time from a single connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> IngestResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .build()
            .map_err(|source| IngestError::Http {
                url: config.base_url.clone(),
                source,
            })?;

        Ok(Self { http, config })
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn endpoint(&self, system_id: &str, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            system_id,
            path
        )
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&'static str, String)],
    ) -> IngestResult<T> {
        debug!("GET {url} {query:?}");

        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|source| IngestError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        debug!("{url} answered {status}");
        if !status.is_success() {
            return Err(IngestError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.json().await.map_err(|source| IngestError::Decode {
            url: url.to_string(),
            source,
        })
    }

    /// Fetch the channel (talkgroup) descriptors of a system.
    pub async fn try_fetch_channels(&self, system_id: &str) -> IngestResult<Vec<ChannelDescriptor>> {
        let url = self.endpoint(system_id, "talkgroups");
        let body: Value = self.get_json(&url, &[]).await?;
        channels_from_value(body)
    }

    /// Like [`Self::try_fetch_channels`], but any failure yields no channels.
    pub async fn fetch_channels(&self, system_id: &str) -> Vec<ChannelDescriptor> {
        self.try_fetch_channels(system_id).await.unwrap_or_else(|e| {
            warn!("Could not fetch channels for {system_id}: {e}");
            Vec::new()
        })
    }

    /// Fetch calls newer than `since` (default: now minus the configured
    /// window), dropping calls with no duration.
    ///
    /// `since` is sent with millisecond resolution.
    pub async fn try_fetch_recent_calls(
        &self,
        system_id: &str,
        filter: &CallFilter,
        since: Option<DateTime<Utc>>,
    ) -> IngestResult<Vec<CallRecord>> {
        let since =
            since.unwrap_or_else(|| Utc::now() - chrono::Duration::seconds(self.config.since_secs));

        let mut query = vec![("time", since.timestamp_millis().to_string())];
        query.extend(filter.query_pairs());

        let url = self.endpoint(system_id, "calls/newer");
        let body: Value = self.get_json(&url, &query).await?;
        calls_from_value(body)
    }

    /// Like [`Self::try_fetch_recent_calls`], but any failure yields no calls.
    pub async fn fetch_recent_calls(
        &self,
        system_id: &str,
        filter: &CallFilter,
        since: Option<DateTime<Utc>>,
    ) -> Vec<CallRecord> {
        self.try_fetch_recent_calls(system_id, filter, since)
            .await
            .unwrap_or_else(|e| {
                warn!("Could not fetch calls for {system_id}: {e}");
                Vec::new()
            })
    }

    /// Fetch system-level information.
    pub async fn try_fetch_system_info(&self, system_id: &str) -> IngestResult<SystemInfo> {
        let url = self.endpoint(system_id, "system");
        self.get_json(&url, &[]).await
    }

    /// Like [`Self::try_fetch_system_info`], but any failure yields `None`.
    pub async fn fetch_system_info(&self, system_id: &str) -> Option<SystemInfo> {
        match self.try_fetch_system_info(system_id).await {
            Ok(info) => Some(info),
            Err(e) => {
                warn!("Could not fetch system info for {system_id}: {e}");
                None
            }
        }
    }
}

/// Accept a bare list, `{"talkgroups": [...]}`, or a single descriptor
/// object. Non-object entries are dropped.
pub fn channels_from_value(body: Value) -> IngestResult<Vec<ChannelDescriptor>> {
    match body {
        Value::Array(items) => Ok(objects_only(items)),
        Value::Object(mut fields) => match fields.remove("talkgroups") {
            Some(Value::Array(items)) => Ok(objects_only(items)),
            Some(other) => Err(IngestError::Shape(format!(
                "talkgroups field is not a list: {other}"
            ))),
            None => Ok(vec![ChannelDescriptor::from_map(fields)]),
        },
        other => Err(IngestError::Shape(format!(
            "expected talkgroup list or object, got {other}"
        ))),
    }
}

fn objects_only(items: Vec<Value>) -> Vec<ChannelDescriptor> {
    items
        .into_iter()
        .filter_map(ChannelDescriptor::from_value)
        .collect()
}

/// Extract the ingestible calls from a `{"calls": [...]}` body.
///
/// Malformed call records are skipped; a missing `calls` field means no calls.
pub fn calls_from_value(body: Value) -> IngestResult<Vec<CallRecord>> {
    let items = match body {
        Value::Object(mut fields) => match fields.remove("calls") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                return Err(IngestError::Shape(format!(
                    "calls field is not a list: {other}"
                )))
            }
        },
        other => {
            return Err(IngestError::Shape(format!(
                "expected object with calls, got {other}"
            )))
        }
    };

    let received = items.len();
    let calls: Vec<CallRecord> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<CallRecord>(item) {
            Ok(call) => Some(call),
            Err(e) => {
                debug!("Skipping malformed call record: {e}");
                None
            }
        })
        .filter(CallRecord::is_ingestible)
        .collect();

    debug!("Received {received} calls, kept {}", calls.len());
    Ok(calls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_channels_bare_list() {
        let channels =
            channels_from_value(json!([{"num": 1}, "junk", 42, {"num": 2}])).unwrap();
        assert_eq!(channels.len(), 2);
    }

    #[test]
    fn test_channels_wrapped_list() {
        let channels =
            channels_from_value(json!({"talkgroups": [{"num": 1}, null, {"num": 2}]})).unwrap();
        assert_eq!(channels.len(), 2);
    }

    #[test]
    fn test_channels_single_record() {
        let channels = channels_from_value(json!({"num": 7, "alpha": "SEVEN"})).unwrap();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].short_tag(), Some("SEVEN"));
    }

    #[test]
    fn test_channels_unexpected_shape() {
        let err = channels_from_value(json!("nope")).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_calls_filtered_and_malformed_skipped() {
        let calls = calls_from_value(json!({"calls": [
            {"_id": "a", "talkgroupNum": 1, "time": "2025-10-23T19:50:45.000Z", "len": 3},
            {"_id": "b", "talkgroupNum": 1, "time": "2025-10-23T19:50:46.000Z", "len": 0},
            {"_id": "c", "talkgroupNum": 1, "time": "2025-10-23T19:50:47.000Z", "len": -1},
            {"talkgroupNum": 1, "len": 9},
        ]}))
        .unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "a");
    }

    #[test]
    fn test_calls_with_null_optionals_kept() {
        let calls = calls_from_value(json!({"calls": [{
            "_id": "a",
            "talkgroupNum": 3344,
            "time": "2025-10-23T19:50:45.000Z",
            "len": 15,
            "url": null,
            "star": null,
            "filename": null
        }]}))
        .unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].url, "");
        assert_eq!(calls[0].star_count, 0);
    }

    #[test]
    fn test_calls_missing_field_is_empty() {
        assert!(calls_from_value(json!({})).unwrap().is_empty());
        assert!(calls_from_value(json!([])).is_err());
    }
}
