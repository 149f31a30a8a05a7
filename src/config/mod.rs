//! Settings
//!
//! Loads the session time limit and per-cue-level timeouts from a YAML
//! settings file, applies `GAZECUE_*` environment overrides, and serves the
//! result to sessions through an async provider.

pub mod loader;
pub mod provider;
pub mod schema;
pub mod validation;

pub use loader::{LoadResult, LoaderOptions, SettingsLoader, SettingsSource};
pub use provider::{FileConfigProvider, StaticConfigProvider, TimeoutConfigProvider};
pub use schema::{
    DEFAULT_CUE_TIMEOUT, DEFAULT_SESSION_TIME_LIMIT, SettingsFile, TimeoutConfig,
};
pub use validation::{ValidationResult, Validator};
