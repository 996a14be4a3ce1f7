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

//! Wallet assignment layer.
//!
//! Wallets are issued by an external collaborator. The pipeline only sees the
//! [`WalletProvider`] trait: production binds it to [`ProcessWalletAssigner`],
//! which runs the collaborator executable, and tests bind it to canned
//! responses. Wallet enrichment is best-effort; [`WalletPool`] turns every
//! failure into "no wallet" after logging it.

mod pool;
mod process;

pub use pool::WalletPool;
pub use process::{ProcessConfig, ProcessWalletAssigner};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::model::WalletAssignment;

/// Marker printed by the collaborator before its JSON payload.
pub const OUTPUT_START_MARKER: &str = "JSON_OUTPUT_START";
/// Marker printed by the collaborator after its JSON payload.
pub const OUTPUT_END_MARKER: &str = "JSON_OUTPUT_END";

/// Failures of a single wallet assignment.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("could not start collaborator '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("collaborator i/o failed: {0}")]
    Io(#[source] std::io::Error),

    #[error("collaborator exited with {}: {stderr}", describe_exit(.code))]
    Exit { code: Option<i32>, stderr: String },

    #[error("collaborator timed out after {0}s")]
    Timeout(u64),

    #[error("collaborator output has no JSON_OUTPUT_START/JSON_OUTPUT_END block")]
    MissingSentinel,

    #[error("collaborator payload is not valid: {0}")]
    Payload(#[source] serde_json::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "signal".to_string(),
    }
}

/// Capability to assign, or retrieve, the wallet bound to a stream.
///
/// Implementations must return the same wallet for the same `stream_id`
/// across calls.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn assign_wallet(
        &self,
        stream_id: &str,
        stream_name: &str,
    ) -> Result<WalletAssignment, WalletError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CollaboratorPayload {
    wallet_address: String,
    #[serde(default)]
    contract_address: Option<String>,
    mode: String,
    created_at: String,
}

/// Extract the wallet from collaborator output.
///
/// Only the text between the first start marker and the next end marker is
/// decoded; anything else on stdout is log noise.
pub fn parse_collaborator_output(stdout: &str) -> Result<WalletAssignment, WalletError> {
    let start = stdout
        .find(OUTPUT_START_MARKER)
        .ok_or(WalletError::MissingSentinel)?
        + OUTPUT_START_MARKER.len();
    let rest = &stdout[start..];
    let end = rest
        .find(OUTPUT_END_MARKER)
        .ok_or(WalletError::MissingSentinel)?;

    let payload: CollaboratorPayload =
        serde_json::from_str(rest[..end].trim()).map_err(WalletError::Payload)?;

    Ok(WalletAssignment {
        address: payload.wallet_address,
        contract_address: payload.contract_address,
        mode: payload.mode,
        created_at: payload.created_at,
    })
}
