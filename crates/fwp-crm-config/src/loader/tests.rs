//! Tests for configuration loading.

use super::*;
use crate::{DEFAULT_OPEN_TIMEOUT_MS, DEFAULT_QUOTA_BYTES, DEFAULT_STORAGE_KEY};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

/// Write JSON5 contents to a path, creating parent directories if needed.
fn write_json5(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("dir");
    }
    fs::write(path, contents).expect("write");
}

#[test]
fn parse_minimal_config() {
    let config = StoreConfig::load_from_str("{}").expect("config");
    assert!(config.primary.enabled);
    assert_eq!(config.primary.open_timeout_ms, DEFAULT_OPEN_TIMEOUT_MS);
    assert_eq!(config.secondary.quota_bytes, DEFAULT_QUOTA_BYTES);
    assert_eq!(config.secondary.storage_key, DEFAULT_STORAGE_KEY);
}

#[test]
fn rejects_unknown_key() {
    let err = StoreConfig::load_from_str(r#"{ primary: { unexpected: true } }"#).unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("unknown field"), "{msg}");
}

#[test]
fn rejects_zero_quota() {
    let err = StoreConfig::load_from_str(r#"{ secondary: { quota_bytes: 0 } }"#).unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("secondary.quota_bytes"), "{msg}");
}

#[test]
fn rejects_storage_key_with_path_separator() {
    let err =
        StoreConfig::load_from_str(r#"{ secondary: { storage_key: "../escape" } }"#).unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("secondary.storage_key"), "{msg}");
}

#[test]
fn runtime_layer_overrides_user_layer() {
    let temp = TempDir::new().expect("tmp");
    let user = temp.path().join("user.json5");
    write_json5(
        &user,
        "{ primary: { open_timeout_ms: 500 }, secondary: { quota_bytes: 1024 } }",
    );
    let runtime = temp.path().join("runtime.json5");
    write_json5(&runtime, "{ secondary: { quota_bytes: 2048 } }");

    let options = LayeredConfigOptions {
        user_config_path: Some(user),
        runtime_paths: Vec::new(),
    }
    .with_runtime_path(runtime);
    let config = StoreConfig::load_layered(options).expect("layered");

    assert_eq!(config.primary.open_timeout_ms, 500);
    assert_eq!(config.secondary.quota_bytes, 2048);
}

#[test]
fn missing_user_layer_falls_back_to_defaults() {
    let temp = TempDir::new().expect("tmp");
    let options = LayeredConfigOptions {
        user_config_path: Some(temp.path().join("absent.json5")),
        runtime_paths: Vec::new(),
    };
    let config = StoreConfig::load_layered(options).expect("layered");
    assert_eq!(config, StoreConfig::default());
}

#[test]
fn missing_runtime_layer_is_an_error() {
    let temp = TempDir::new().expect("tmp");
    let options = LayeredConfigOptions {
        user_config_path: None,
        runtime_paths: vec![temp.path().join("absent.json5")],
    };
    let err = StoreConfig::load_layered(options).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFailed(_)));
}

#[test]
fn builder_data_dir_places_both_tiers() {
    let config = StoreConfig::builder().data_dir("/var/lib/fwp").build();
    assert_eq!(
        config.primary.resolved_path(),
        PathBuf::from("/var/lib/fwp/customers.sqlite3")
    );
    assert_eq!(
        config.secondary.resolved_root(),
        PathBuf::from("/var/lib/fwp/backup")
    );
}
