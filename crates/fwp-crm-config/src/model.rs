//! Configuration schema for the FWP CRM store.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Well-known key addressing the secondary tier's single blob.
pub const DEFAULT_STORAGE_KEY: &str = "fwp_crm_backup_data";
/// Default bound on the primary tier's connection attempt.
pub const DEFAULT_OPEN_TIMEOUT_MS: u64 = 3_000;
/// Default secondary tier capacity, matching common browser storage quotas.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;
/// Default SQLite filename inside the data directory.
pub const DEFAULT_PRIMARY_FILE: &str = "customers.sqlite3";
/// Default directory name for the secondary tier blobs.
pub const DEFAULT_SECONDARY_DIR: &str = "backup";

/// Root config for the customer record store.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub primary: PrimaryConfig,
    #[serde(default)]
    pub secondary: SecondaryConfig,
}

impl StoreConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::new()
    }
}

/// Builder for assembling a `StoreConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct StoreConfigBuilder {
    config: StoreConfig,
}

impl StoreConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: StoreConfig::default(),
        }
    }

    /// Replace the primary tier configuration.
    pub fn primary(mut self, primary: PrimaryConfig) -> Self {
        self.config.primary = primary;
        self
    }

    /// Replace the secondary tier configuration.
    pub fn secondary(mut self, secondary: SecondaryConfig) -> Self {
        self.config.secondary = secondary;
        self
    }

    /// Point both tiers below a single data directory.
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.config.primary.path = Some(
            dir.join(DEFAULT_PRIMARY_FILE)
                .to_string_lossy()
                .to_string(),
        );
        self.config.secondary.path = Some(
            dir.join(DEFAULT_SECONDARY_DIR)
                .to_string_lossy()
                .to_string(),
        );
        self
    }

    /// Finalize and return the built `StoreConfig`.
    pub fn build(self) -> StoreConfig {
        self.config
    }
}

/// Primary (SQLite) tier settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PrimaryConfig {
    /// Disable to run on the secondary tier only.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_open_timeout_ms")]
    pub open_timeout_ms: u64,
}

impl Default for PrimaryConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            path: None,
            open_timeout_ms: default_open_timeout_ms(),
        }
    }
}

impl PrimaryConfig {
    /// Database file path, falling back to the platform data directory.
    pub fn resolved_path(&self) -> PathBuf {
        match &self.path {
            Some(path) => PathBuf::from(path),
            None => default_data_dir().join(DEFAULT_PRIMARY_FILE),
        }
    }
}

/// Secondary (quota-bounded blob) tier settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SecondaryConfig {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: usize,
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
}

impl Default for SecondaryConfig {
    fn default() -> Self {
        Self {
            path: None,
            quota_bytes: default_quota_bytes(),
            storage_key: default_storage_key(),
        }
    }
}

impl SecondaryConfig {
    /// Blob directory, falling back to the platform data directory.
    pub fn resolved_root(&self) -> PathBuf {
        match &self.path {
            Some(path) => PathBuf::from(path),
            None => default_data_dir().join(DEFAULT_SECONDARY_DIR),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_open_timeout_ms() -> u64 {
    DEFAULT_OPEN_TIMEOUT_MS
}

fn default_quota_bytes() -> usize {
    DEFAULT_QUOTA_BYTES
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

/// Platform data directory for store files, or `./.fwp-crm` when unknown.
pub fn default_data_dir() -> PathBuf {
    ProjectDirs::from("com", "fwp", "fwp-crm")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".fwp-crm"))
}
