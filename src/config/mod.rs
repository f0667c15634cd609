//! Configuration model for cck-cli.
//!
//! Two layers of YAML configuration live under a single directory:
//! - `_global.yaml`, loaded once per process and required,
//! - `<command>[-<profile>].yaml`, resolved per invoked command.
//!
//! Both layers are hierarchical key-value mappings ([`ConfigData`]); the
//! global layer is additionally exposed through the typed [`GlobalConfig`]
//! view.

mod data;
mod global;
mod loader;


// Re-export public API
pub use data::ConfigData;
pub use global::{Credentials, DEFAULT_MEMORY_LIMIT, DEFAULT_TIME_LIMIT_SECS, GlobalConfig};
pub use loader::{CONFIG_EXTENSION, ConfigLoader, GLOBAL_CONFIG_NAME, command_config_key};

/// Per-command configuration. Empty when the command has no config file.
pub type CommandConfig = ConfigData;
