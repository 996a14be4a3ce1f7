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

//! Bounded, best-effort wallet assignment across many streams.

use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::WalletProvider;
use crate::model::{StreamProfile, WalletAssignment};

/// Runs a [`WalletProvider`] over a batch of streams with at most
/// `max_concurrent` assignments in flight.
#[derive(Clone)]
pub struct WalletPool {
    provider: Arc<dyn WalletProvider>,
    max_concurrent: usize,
}

impl std::fmt::Debug for WalletPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletPool")
            .field("max_concurrent", &self.max_concurrent)
            .finish_non_exhaustive()
    }
}

impl WalletPool {
    /// Create a pool. A `max_concurrent` of zero is treated as one.
    #[must_use]
    pub fn new(provider: Arc<dyn WalletProvider>, max_concurrent: usize) -> Self {
        Self {
            provider,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// One-at-a-time pool, matching a plain sequential run.
    #[must_use]
    pub fn sequential(provider: Arc<dyn WalletProvider>) -> Self {
        Self::new(provider, 1)
    }

    #[must_use]
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Assign a wallet to one stream, degrading any failure to `None`.
    pub async fn assign_wallet(
        &self,
        stream_id: &str,
        stream_name: &str,
    ) -> Option<WalletAssignment> {
        match self.provider.assign_wallet(stream_id, stream_name).await {
            Ok(wallet) => Some(wallet),
            Err(e) => {
                warn!("No wallet for stream {stream_id}: {e}");
                None
            }
        }
    }

    /// Assign wallets to every stream that has none yet.
    ///
    /// Completion order does not matter: results are written back by index.
    /// Returns the number of wallets attached.
    pub async fn assign_all(&self, streams: &mut [StreamProfile]) -> usize {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = JoinSet::new();

        for (index, stream) in streams.iter().enumerate() {
            if stream.wallet.is_some() {
                continue;
            }

            let pool = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let stream_id = stream.stream_id.clone();
            let stream_name = stream.name.clone();

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                (index, pool.assign_wallet(&stream_id, &stream_name).await)
            });
        }

        let mut assigned = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Some(wallet))) => {
                    debug!(
                        "Wallet {} assigned to {}",
                        wallet.address, streams[index].stream_id
                    );
                    if streams[index].attach_wallet(wallet) {
                        assigned += 1;
                    }
                }
                Ok((_, None)) => {}
                Err(e) => warn!("Wallet assignment task failed: {e}"),
            }
        }

        assigned
    }
}
