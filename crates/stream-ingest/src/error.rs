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

//! Error types shared by every layer of the ingestion pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::wallet::WalletError;

/// Errors raised while ingesting a radio system.
///
/// Upstream and collaborator failures are recoverable: the pipeline logs them
/// and carries on with an empty result or without a wallet. Validation,
/// registry, output and interrupt errors abort the run.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("upstream returned status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected response shape: {0}")]
    Shape(String),

    #[error("wallet collaborator failed: {0}")]
    Collaborator(#[from] WalletError),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("registry {path} is not valid: {source}")]
    Registry {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not encode output: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ingestion interrupted")]
    Interrupted,
}

impl IngestError {
    /// Whether the run may continue after this error.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Http { .. }
                | Self::Status { .. }
                | Self::Decode { .. }
                | Self::Shape(_)
                | Self::Collaborator(_)
        )
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type IngestResult<T> = Result<T, IngestError>;
