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

//! Stream ingestion library for OpenMHz radio systems.
//!
//! Fetches channel descriptors and recent calls from the OpenMHz API,
//! correlates each call with its channel, turns calls into stream profiles,
//! optionally binds a wallet to every stream, and merges the result into a
//! JSON stream registry. The layers can be used on their own:
//!
//! - **API layer** ([`api`]): channel, call and system fetches
//! - **Correlation layer** ([`correlate`]): channel id lookup over
//!   heterogeneous upstream schemas
//! - **Profile layer** ([`profile`]): stream and system profile generation
//! - **Wallet layer** ([`wallet`]): best-effort wallet assignment through an
//!   external collaborator
//! - **Registry layer** ([`registry`]): merge-on-write persistence
//!
//! # Quick Start
//!
//! ```no_run
//! use stream_ingest::{ApiClient, ApiConfig, CallFilter, Ingestor, RegistryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), stream_ingest::IngestError> {
//!     let ingestor = Ingestor::new(ApiClient::new(ApiConfig::default())?);
//!     let profile = ingestor.ingest("rhode-island", &CallFilter::All, None).await;
//!
//!     RegistryStore::new("streams.json").merge_and_save("rhode-island", &profile)?;
//!     println!("{} streams", profile.total_streams);
//!     Ok(())
//! }
//! ```
//!
//! # Profile Layer Only
//!
//! ```
//! use stream_ingest::model::CallRecord;
//! use stream_ingest::profile::generate_profile;
//!
//! let call: CallRecord = serde_json::from_str(
//!     r#"{"_id":"abc","talkgroupNum":3344,"time":"2025-10-23T19:50:45.000Z","len":15}"#,
//! ).unwrap();
//! let stream = generate_profile(&call, "rhode-island", None, None);
//! assert_eq!(stream.stream_id, "rhode-island-3344-abc");
//! assert_eq!(stream.name, "Channel 3344");
//! ```

pub mod api;
pub mod correlate;
pub mod error;
pub mod ingest;
pub mod model;
pub mod profile;
pub mod registry;
pub mod wallet;

pub use api::{ApiClient, ApiConfig, CallFilter};
pub use correlate::{build_lookup, ChannelCorrelator, ChannelLookup, IdRule};
pub use error::{IngestError, IngestResult};
pub use ingest::Ingestor;
pub use model::{
    CallRecord, ChannelDescriptor, SourceRadio, StreamMetadata, StreamProfile, SystemInfo,
    SystemProfile, WalletAssignment,
};
pub use profile::{generate_profile, generate_system_profile};
pub use registry::RegistryStore;
pub use wallet::{ProcessConfig, ProcessWalletAssigner, WalletError, WalletPool, WalletProvider};
