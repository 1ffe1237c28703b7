//! IO helpers for reading config layers from disk.

use super::{DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILE};
use crate::ConfigError;
use directories::UserDirs;
use log::debug;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Load an optional layer if the provided path exists.
pub(super) fn load_optional_layer(path: Option<&Path>) -> Result<Option<Value>, ConfigError> {
    let Some(path) = path else {
        return Ok(None);
    };
    if !path.exists() {
        debug!("optional config layer missing (path={})", path.display());
        return Ok(None);
    }
    Ok(Some(load_required_layer(path)?))
}

/// Read and parse a JSON5 layer from disk.
pub(super) fn load_required_layer(path: &Path) -> Result<Value, ConfigError> {
    debug!("loading config layer (path={})", path.display());
    let contents = fs::read_to_string(path)?;
    Ok(json5::from_str(&contents)?)
}

/// Default user config path under the home directory.
pub(super) fn default_user_config_path() -> Option<PathBuf> {
    UserDirs::new().map(|dirs| {
        dirs.home_dir()
            .join(DEFAULT_CONFIG_DIR)
            .join(DEFAULT_CONFIG_FILE)
    })
}
