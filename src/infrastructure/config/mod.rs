//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - Programmatic defaults
//! - YAML file loading (`.vaspera/config.yaml`, `.vaspera/local.yaml`)
//! - Environment variable overrides (`VASPERA_*`)
//! - Configuration validation

pub mod loader;

pub use loader::{ConfigError, ConfigLoader, CONFIG_DIR};
