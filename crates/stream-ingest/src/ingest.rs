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

//! Full-stack ingestion of one radio system.

use chrono::{DateTime, Utc};
use log::info;

use crate::api::{ApiClient, CallFilter};
use crate::model::SystemProfile;
use crate::profile::generate_system_profile;
use crate::wallet::WalletPool;

/// Wires the API client, correlator, profile generator and (optionally) the
/// wallet pool together.
#[derive(Debug, Clone)]
pub struct Ingestor {
    api: ApiClient,
    wallets: Option<WalletPool>,
}

impl Ingestor {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api, wallets: None }
    }

    /// Request a wallet for every generated stream.
    #[must_use]
    pub fn with_wallets(mut self, pool: WalletPool) -> Self {
        self.wallets = Some(pool);
        self
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Fetch channels and recent calls for `system_id` and build its profile.
    ///
    /// Upstream failures only shrink the result; this never fails.
    pub async fn ingest(
        &self,
        system_id: &str,
        filter: &CallFilter,
        since: Option<DateTime<Utc>>,
    ) -> SystemProfile {
        info!("Ingesting OpenMHz system: {system_id}");

        if let Some(system) = self.api.fetch_system_info(system_id).await {
            info!(
                "System info retrieved: {}",
                system.name.as_deref().unwrap_or(system_id)
            );
        }

        info!("Fetching talkgroups...");
        let channels = self.api.fetch_channels(system_id).await;
        info!("Found {} talkgroups", channels.len());

        info!("Fetching recent calls...");
        let calls = self.api.fetch_recent_calls(system_id, filter, since).await;
        info!("Found {} recent calls", calls.len());

        generate_system_profile(system_id, &channels, &calls, self.wallets.as_ref()).await
    }
}
