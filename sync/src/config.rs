//! Engine configuration with TOML file support.

use chainvote_ledger::PollAbi;
use chainvote_networks::NetworkRegistry;
use chainvote_types::{ChainId, NetworkDescriptor};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::logging::LogFormat;
use crate::SyncError;

/// How the poll list is read from the ledger on each reload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStrategy {
    /// `getActivePolls()` in one call.
    #[default]
    Active,
    /// `getPolls(offset, limit)` page by page until a short page.
    Paged,
}

/// Configuration for the sync engine.
///
/// Can be loaded from a TOML file via [`SyncConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Longest wait for a transaction receipt before the action fails.
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,

    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,

    #[serde(default)]
    pub load_strategy: LoadStrategy,

    /// Page size for [`LoadStrategy::Paged`].
    #[serde(default = "default_page_size")]
    pub page_size: u64,

    /// Log output format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter (e.g. "info", "debug", "chainvote_sync=trace").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Network the engine switches to when the wallet is elsewhere.
    /// Defaults to the registry's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_network: Option<ChainId>,

    /// JSON-RPC endpoint of the wallet node. Defaults to the default
    /// network's `rpc_url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_url: Option<String>,

    /// Per-request timeout for JSON-RPC calls.
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,

    /// How often the wallet node is polled for account and chain changes.
    #[serde(default = "default_change_poll_interval_ms")]
    pub change_poll_interval_ms: u64,

    /// Contract signatures, for deployments that differ from the default.
    #[serde(default)]
    pub abi: PollAbi,

    /// Descriptor overrides, typically to set `poll_contract` per chain.
    #[serde(default)]
    pub networks: Vec<NetworkDescriptor>,
}

fn default_confirmation_timeout_secs() -> u64 {
    120
}

fn default_receipt_poll_interval_ms() -> u64 {
    1000
}

fn default_rpc_timeout_secs() -> u64 {
    30
}

fn default_change_poll_interval_ms() -> u64 {
    2000
}

fn default_page_size() -> u64 {
    chainvote_ledger::paging::DEFAULT_PAGE_SIZE
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl SyncConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, SyncError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SyncError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, SyncError> {
        toml::from_str(s).map_err(|e| SyncError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, SyncError> {
        toml::to_string_pretty(self).map_err(|e| SyncError::Config(e.to_string()))
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn change_poll_interval(&self) -> Duration {
        Duration::from_millis(self.change_poll_interval_ms)
    }

    pub fn log_format(&self) -> Result<LogFormat, SyncError> {
        self.log_format.parse()
    }

    /// The built-in networks with this configuration's overrides applied.
    pub fn network_registry(&self) -> Result<NetworkRegistry, SyncError> {
        Ok(NetworkRegistry::builtin().with_overrides(&self.networks, self.default_network)?)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
            receipt_poll_interval_ms: default_receipt_poll_interval_ms(),
            load_strategy: LoadStrategy::default(),
            page_size: default_page_size(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            default_network: None,
            provider_url: None,
            rpc_timeout_secs: default_rpc_timeout_secs(),
            change_poll_interval_ms: default_change_poll_interval_ms(),
            abi: PollAbi::default(),
            networks: Vec::new(),
        }
    }
}
