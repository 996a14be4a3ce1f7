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

//! Application configuration management.
//!
//! Persistent settings live in a TOML file managed by confy. They cover the
//! upstream API, the wallet collaborator and the default registry location.
//! The API base URL can be overridden with `OPENMHZ_API_URL`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};
use stream_ingest::api::{DEFAULT_BASE_URL, DEFAULT_USER_AGENT};
use stream_ingest::{ApiConfig, ProcessConfig};

const APP_NAME: &str = "openmhz-ingest";
const CONFIG_NAME: &str = "config";

/// Environment variable that overrides the configured API base URL.
pub const API_URL_ENV: &str = "OPENMHZ_API_URL";

/// Registry file name used when no path is configured.
pub const DEFAULT_REGISTRY_FILE: &str = "streams.json";

/// Upstream API settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiSettings {
    /// Base URL of the OpenMHz API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// How far back to fetch calls, in seconds
    #[serde(default = "default_since_secs")]
    pub since_secs: i64,
}

/// Wallet collaborator settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WalletSettings {
    /// Executable to run
    #[serde(default = "default_wallet_program")]
    pub program: String,

    /// Arguments placed before `--streamId ...`
    #[serde(default = "default_wallet_args")]
    pub args: Vec<String>,

    /// Working directory for the collaborator (defaults to the current one)
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Hard limit per invocation, in seconds
    #[serde(default = "default_wallet_timeout_secs")]
    pub timeout_secs: u64,

    /// Wallet mode passed to `--mode`
    #[serde(default = "default_wallet_mode")]
    pub mode: String,

    /// Maximum collaborators running at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    /// Configuration schema version
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub wallet: WalletSettings,

    /// Stream registry location (defaults to the user data directory)
    #[serde(default)]
    pub registry_path: Option<PathBuf>,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_since_secs() -> i64 {
    300
}

fn default_wallet_program() -> String {
    ProcessConfig::default().program
}

fn default_wallet_args() -> Vec<String> {
    ProcessConfig::default().args
}

fn default_wallet_timeout_secs() -> u64 {
    30
}

fn default_wallet_mode() -> String {
    "simple".to_string()
}

fn default_max_concurrent() -> usize {
    1 // the stock collaborator rewrites its own registry file per call
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout_secs(),
            since_secs: default_since_secs(),
        }
    }
}

impl Default for WalletSettings {
    fn default() -> Self {
        Self {
            program: default_wallet_program(),
            args: default_wallet_args(),
            working_dir: None,
            timeout_secs: default_wallet_timeout_secs(),
            mode: default_wallet_mode(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            api: ApiSettings::default(),
            wallet: WalletSettings::default(),
            registry_path: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from disk
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, CONFIG_NAME)
    }

    /// Load configuration, falling back to defaults if the file is unusable
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            warn!("Could not load configuration, using defaults: {e}");
            Self::default()
        })
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Resolve the API base URL from environment variable or config
    pub fn resolve_base_url(&self) -> String {
        Self::base_url_from(std::env::var(API_URL_ENV).ok(), &self.api.base_url)
    }

    fn base_url_from(env_value: Option<String>, configured: &str) -> String {
        // Check environment variable first
        if let Some(url) = env_value.filter(|u| !u.is_empty()) {
            return url;
        }

        // Fall back to config
        if configured.is_empty() {
            default_base_url()
        } else {
            configured.to_string()
        }
    }

    /// Settings for the API client
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.resolve_base_url(),
            user_agent: self.api.user_agent.clone(),
            request_timeout: Duration::from_secs(self.api.request_timeout_secs),
            since_secs: self.api.since_secs,
        }
    }

    /// Settings for the wallet collaborator
    pub fn process_config(&self) -> ProcessConfig {
        ProcessConfig {
            program: self.wallet.program.clone(),
            args: self.wallet.args.clone(),
            working_dir: self.wallet.working_dir.clone(),
            timeout: Duration::from_secs(self.wallet.timeout_secs),
            mode: self.wallet.mode.clone(),
        }
    }

    /// Registry path: command line, then config, then the data directory
    pub fn registry_path(&self, cli_override: Option<&Path>) -> PathBuf {
        if let Some(path) = cli_override {
            return path.to_path_buf();
        }
        if let Some(path) = &self.registry_path {
            return path.clone();
        }
        dirs::data_dir().map_or_else(
            || PathBuf::from(DEFAULT_REGISTRY_FILE),
            |dir| dir.join(APP_NAME).join(DEFAULT_REGISTRY_FILE),
        )
    }
}
