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

use crate::error::{IngestError, IngestResult};

/// Which calls to ask the upstream for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CallFilter {
    /// Every channel.
    #[default]
    All,
    /// Only these channel ids.
    Channels(Vec<i64>),
    /// Only channels in this upstream group.
    Group(String),
}

impl CallFilter {
    /// Build a filter from the two optional user inputs.
    ///
    /// Supplying both is a validation error.
    pub fn from_parts(channels: Option<Vec<i64>>, group: Option<String>) -> IngestResult<Self> {
        match (channels, group) {
            (Some(_), Some(_)) => Err(IngestError::Validation(
                "cannot filter by both channel ids and group".to_string(),
            )),
            (Some(channels), None) => Ok(Self::Channels(channels)),
            (None, Some(group)) => Ok(Self::Group(group)),
            (None, None) => Ok(Self::All),
        }
    }

    /// Parse a comma-separated list of integer channel ids.
    pub fn parse_channel_list(list: &str) -> IngestResult<Vec<i64>> {
        list.split(',')
            .map(str::trim)
            .map(|id| {
                id.parse::<i64>().map_err(|e| {
                    IngestError::Validation(format!("channel id '{id}' is not an integer: {e}"))
                })
            })
            .collect()
    }

    /// `filter-type` / `filter-code` query parameters, if any.
    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Channels(ids) if !ids.is_empty() => {
                let code = ids
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                vec![("filter-type", "talkgroup".to_string()), ("filter-code", code)]
            }
            Self::Group(group) if !group.is_empty() => vec![
                ("filter-type", "group".to_string()),
                ("filter-code", group.clone()),
            ],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_filters_rejected() {
        let err = CallFilter::from_parts(Some(vec![1]), Some("fire".into())).unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));
    }

    #[test]
    fn test_parse_channel_list() {
        assert_eq!(
            CallFilter::parse_channel_list("3344, 3408,44912").unwrap(),
            vec![3344, 3408, 44912]
        );
        assert!(CallFilter::parse_channel_list("3344,fire").is_err());
    }

    #[test]
    fn test_query_pairs() {
        assert_eq!(
            CallFilter::Channels(vec![3344, 3408]).query_pairs(),
            vec![
                ("filter-type", "talkgroup".to_string()),
                ("filter-code", "3344,3408".to_string())
            ]
        );
        assert_eq!(
            CallFilter::Group("fire-dispatch".into()).query_pairs(),
            vec![
                ("filter-type", "group".to_string()),
                ("filter-code", "fire-dispatch".to_string())
            ]
        );
        assert!(CallFilter::All.query_pairs().is_empty());
        assert!(CallFilter::Channels(Vec::new()).query_pairs().is_empty());
    }
}
