//! Configuration models and loading for the FWP CRM store.
//!
//! This crate owns the store config schema, its defaults and validation, and
//! the layering of the user config file with explicit overrides.

mod error;
mod loader;
mod model;

/// Public error type returned by config loading and validation APIs.
pub use error::ConfigError;
/// Layered config options.
pub use loader::LayeredConfigOptions;
/// Configuration schema models.
pub use model::*;
