//! Config loading with an optional user layer and runtime overrides.
//!
//! Layer precedence (low -> high): built-in defaults, the user config file,
//! then each runtime override path in order.

mod layer_io;
mod merge;

#[cfg(test)]
mod tests;

use crate::{ConfigError, StoreConfig};
use log::{debug, info};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Default config filename in the user config directory.
const DEFAULT_CONFIG_FILE: &str = "config.json5";
/// Default config directory under the home directory.
const DEFAULT_CONFIG_DIR: &str = ".fwp-crm";

/// Options controlling which config layers are read.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    /// Optional user config path (defaults to `~/.fwp-crm/config.json5`).
    pub user_config_path: Option<PathBuf>,
    /// Runtime override config paths applied last; each must exist.
    pub runtime_paths: Vec<PathBuf>,
}

impl Default for LayeredConfigOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl LayeredConfigOptions {
    /// Create options with the default user layer and no overrides.
    pub fn new() -> Self {
        Self {
            user_config_path: layer_io::default_user_config_path(),
            runtime_paths: Vec::new(),
        }
    }

    /// Append a runtime override layer.
    pub fn with_runtime_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.runtime_paths.push(path.into());
        self
    }
}

impl StoreConfig {
    /// Load a single config from a JSON5 file (no layering).
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        info!("loading config from path: {}", path.as_ref().display());
        let contents = fs::read_to_string(path)?;
        let value: Value = json5::from_str(&contents)?;
        config_from_value(value)
    }

    /// Load a single config from JSON5 contents (no layering).
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value = json5::from_str(contents)?;
        config_from_value(value)
    }

    /// Load the user layer and runtime overrides on top of defaults.
    pub fn load_layered(options: LayeredConfigOptions) -> Result<Self, ConfigError> {
        let mut merged = Value::Object(serde_json::Map::new());
        let mut layer_count = 0usize;
        if let Some(user) = layer_io::load_optional_layer(options.user_config_path.as_deref())? {
            merge::merge_json_values(&mut merged, &user);
            layer_count += 1;
        }
        for path in &options.runtime_paths {
            let layer = layer_io::load_required_layer(path)?;
            merge::merge_json_values(&mut merged, &layer);
            layer_count += 1;
        }
        info!("loaded layered config (layers={layer_count})");
        config_from_value(merged)
    }

    /// Validate config values that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.primary.open_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "primary.open_timeout_ms",
                "must be greater than zero",
            ));
        }
        if matches!(&self.primary.path, Some(path) if path.trim().is_empty()) {
            return Err(ConfigError::invalid("primary.path", "must not be empty"));
        }
        if matches!(&self.secondary.path, Some(path) if path.trim().is_empty()) {
            return Err(ConfigError::invalid("secondary.path", "must not be empty"));
        }
        if self.secondary.quota_bytes == 0 {
            return Err(ConfigError::invalid(
                "secondary.quota_bytes",
                "must be greater than zero",
            ));
        }
        let key = &self.secondary.storage_key;
        if key.is_empty() {
            return Err(ConfigError::invalid(
                "secondary.storage_key",
                "must not be empty",
            ));
        }
        if !key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'))
        {
            return Err(ConfigError::invalid(
                "secondary.storage_key",
                format!("`{key}` may only contain ASCII letters, digits, '_', '-' or '.'"),
            ));
        }
        Ok(())
    }
}

fn config_from_value(value: Value) -> Result<StoreConfig, ConfigError> {
    let config: StoreConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}
