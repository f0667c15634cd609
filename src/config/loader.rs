//! Resolution of the global and per-command config files.

use super::data::ConfigData;
use super::global::GlobalConfig;
use crate::error::{CliError, Result};
use std::path::{Path, PathBuf};

/// File stem of the global config.
pub const GLOBAL_CONFIG_NAME: &str = "_global";

/// Extension of every config file.
pub const CONFIG_EXTENSION: &str = "yaml";

/// Loads configuration from a fixed directory layout.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_dir: PathBuf,
    global_path: PathBuf,
}

impl ConfigLoader {
    /// Create a loader rooted at `config_dir`. The global path is fixed here.
    pub fn new<P: AsRef<Path>>(config_dir: P) -> Self {
        let config_dir = config_dir.as_ref().to_path_buf();
        let global_path = config_path(&config_dir, GLOBAL_CONFIG_NAME);
        Self {
            config_dir,
            global_path,
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn global_path(&self) -> &Path {
        &self.global_path
    }

    /// Load the global config. Absence is always fatal.
    pub fn load_global(&self) -> Result<GlobalConfig> {
        if !self.global_path.is_file() {
            return Err(CliError::ConfigMissing(self.global_path.clone()));
        }

        let data = ConfigData::load(&self.global_path)?;
        Ok(GlobalConfig::new(data, self.global_path.clone()))
    }

    /// Load the config for `command`, optionally narrowed to `profile`.
    ///
    /// A missing file yields an empty mapping unless a profile was requested,
    /// in which case the file must exist.
    pub fn load_command(&self, command: &str, profile: Option<&str>) -> Result<ConfigData> {
        if let Some(profile) = profile {
            validate_profile(profile)?;
        }

        let key = command_config_key(command, profile);
        let path = config_path(&self.config_dir, &key);

        if path.is_file() {
            let data = ConfigData::load(&path)?;
            tracing::debug!(path = %path.display(), keys = data.len(), "loaded command config");
            return Ok(data);
        }

        if profile.is_some() {
            return Err(CliError::ConfigMissing(path));
        }

        tracing::debug!(path = %path.display(), "no command config, using empty mapping");
        Ok(ConfigData::default())
    }
}

/// Lookup key for a command: lowercased, `:` replaced by `-`, then `-<profile>`.
pub fn command_config_key(command: &str, profile: Option<&str>) -> String {
    let key = command.to_lowercase().replace(':', "-");
    match profile {
        Some(profile) => format!("{}-{}", key, profile),
        None => key,
    }
}

fn config_path(config_dir: &Path, key: &str) -> PathBuf {
    config_dir.join(format!("{}.{}", key, CONFIG_EXTENSION))
}

fn validate_profile(profile: &str) -> Result<()> {
    if profile.trim().is_empty() {
        return Err(CliError::UserError(
            "--profile requires a non-empty profile name".to_string(),
        ));
    }
    if profile.contains(['/', '\\']) || profile.contains("..") {
        return Err(CliError::UserError(format!(
            "invalid profile name '{}': path separators are not allowed",
            profile
        )));
    }
    Ok(())
}
