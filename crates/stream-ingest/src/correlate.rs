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

//! Channel correlation.
//!
//! Upstream systems disagree on which field carries a channel's numeric id.
//! The correlator holds an ordered list of candidate fields and resolves each
//! descriptor with the first one present; adding a new upstream spelling means
//! adding an entry to the list.

use std::collections::HashMap;

use log::debug;
use serde_json::Value;

use crate::model::ChannelDescriptor;

/// Candidate id fields, in priority order.
pub const DEFAULT_ID_FIELDS: &[&str] = &["num", "decimal", "id", "talkgroupNum"];

/// Lookup from numeric channel id to descriptor.
pub type ChannelLookup = HashMap<i64, ChannelDescriptor>;

/// A single accessor rule: read the channel id from one named field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdRule {
    field: String,
}

impl IdRule {
    #[must_use]
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The raw value this rule selects, if present and not null.
    fn select<'a>(&self, descriptor: &'a ChannelDescriptor) -> Option<&'a Value> {
        descriptor.get(&self.field).filter(|v| !v.is_null())
    }
}

/// Builds channel lookups from an ordered list of [`IdRule`]s.
#[derive(Debug, Clone)]
pub struct ChannelCorrelator {
    rules: Vec<IdRule>,
}

impl Default for ChannelCorrelator {
    fn default() -> Self {
        Self::with_fields(DEFAULT_ID_FIELDS.iter().copied())
    }
}

impl ChannelCorrelator {
    /// Create a correlator that tries `fields` in the given order.
    pub fn with_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rules: fields.into_iter().map(IdRule::new).collect(),
        }
    }

    #[must_use]
    pub fn rules(&self) -> &[IdRule] {
        &self.rules
    }

    /// Resolve a descriptor's numeric id.
    ///
    /// The first rule with a present, non-null value wins. If that value is
    /// not an integer (or an integer string) the descriptor has no id.
    #[must_use]
    pub fn resolve_id(&self, descriptor: &ChannelDescriptor) -> Option<i64> {
        let value = self.rules.iter().find_map(|rule| rule.select(descriptor))?;
        as_channel_id(value)
    }

    /// Build the id lookup. Descriptors without a usable id are dropped;
    /// on duplicate ids the later descriptor wins.
    #[must_use]
    pub fn build_lookup(&self, descriptors: &[ChannelDescriptor]) -> ChannelLookup {
        let mut lookup = HashMap::with_capacity(descriptors.len());

        for descriptor in descriptors {
            match self.resolve_id(descriptor) {
                Some(id) => {
                    lookup.insert(id, descriptor.clone());
                }
                None => debug!("Dropping uncorrelatable channel descriptor: {descriptor:?}"),
            }
        }

        lookup
    }
}

/// Build a lookup with the default candidate fields.
#[must_use]
pub fn build_lookup(descriptors: &[ChannelDescriptor]) -> ChannelLookup {
    ChannelCorrelator::default().build_lookup(descriptors)
}

/// Integers, whole-valued floats (`3344.0`) and integer strings are ids.
fn as_channel_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole_number)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// -2^63 is exact as f64; 2^63 is one past i64::MAX
const I64_LOWER: f64 = -9_223_372_036_854_775_808.0;
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;

fn whole_number(f: f64) -> Option<i64> {
    if f.fract() != 0.0 || !(I64_LOWER..I64_UPPER).contains(&f) {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, reason = "checked whole and in range")]
    Some(f as i64)
}
