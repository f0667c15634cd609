//! Typed view over the global configuration file.

use super::data::ConfigData;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Memory ceiling applied when `memory` is unset.
pub const DEFAULT_MEMORY_LIMIT: &str = "512M";

/// Execution-time ceiling (seconds) applied when `time` is unset.
pub const DEFAULT_TIME_LIMIT_SECS: u64 = 1800;

/// Global configuration, loaded once per process and immutable afterwards.
///
/// Recognized keys: `host`, `memory`, `time`, `root`, `bridge` and the
/// `auth` sub-map (`login`, `pass`, `secretkey`).
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    data: ConfigData,
    path: PathBuf,
}

impl GlobalConfig {
    pub fn new(data: ConfigData, path: impl Into<PathBuf>) -> Self {
        Self {
            data,
            path: path.into(),
        }
    }

    /// The raw mapping.
    pub fn data(&self) -> &ConfigData {
        &self.data
    }

    /// Path of the file this config was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Emulated virtual host name. `None` when absent or blank.
    pub fn host(&self) -> Option<String> {
        self.data
            .find_str("host")
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
    }

    /// Memory ceiling string, e.g. `512M`.
    pub fn memory(&self) -> String {
        self.data
            .find_str("memory")
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MEMORY_LIMIT.to_string())
    }

    /// Execution-time ceiling in seconds. `0` disables the ceiling.
    pub fn time(&self) -> u64 {
        if self.data.find("time").is_none() {
            return DEFAULT_TIME_LIMIT_SECS;
        }
        match self.data.find_u64("time") {
            Some(secs) => secs,
            None => {
                tracing::warn!(
                    default = DEFAULT_TIME_LIMIT_SECS,
                    "global config `time` is not a non-negative integer, using default"
                );
                DEFAULT_TIME_LIMIT_SECS
            }
        }
    }

    /// Command line used to reach the host runtime, if configured.
    pub fn bridge(&self) -> Option<String> {
        self.data
            .find_str("bridge")
            .filter(|b| !b.trim().is_empty())
    }

    /// Directory the tool is installed in: the parent of the config directory.
    pub fn cli_root(&self) -> PathBuf {
        let config_dir = self.path.parent().unwrap_or_else(|| Path::new(""));
        match config_dir.parent() {
            Some(root) if !root.as_os_str().is_empty() => root.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Filesystem root of the deployed host.
    ///
    /// Relative `root` values resolve against [`cli_root`](Self::cli_root);
    /// without `root`, the host is assumed to contain the tool's directory.
    pub fn host_root(&self) -> PathBuf {
        let cli_root = self.cli_root();
        match self.data.find_str("root").filter(|r| !r.trim().is_empty()) {
            Some(root) => {
                let root = PathBuf::from(root.trim());
                if root.is_absolute() {
                    root
                } else {
                    normalize(&cli_root.join(root))
                }
            }
            None => normalize(&cli_root.join("..")),
        }
    }

    /// Credentials from the `auth` sub-map. Missing values are empty.
    pub fn credentials(&self) -> Credentials {
        Credentials {
            login: self.data.find_str("auth.login").unwrap_or_default(),
            password: self.data.find_str("auth.pass").unwrap_or_default(),
            secret_key: self.data.find_str("auth.secretkey").unwrap_or_default(),
        }
    }
}

/// Lexically fold `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    out.pop();
                } else if !matches!(
                    out.components().next_back(),
                    Some(Component::RootDir | Component::Prefix(_))
                ) {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        out
    }
}

/// Login credentials for the host's authentication service.
///
/// Only ever handed to the login primitive; `Debug` never prints secrets.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub password: String,
    pub secret_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"***")
            .field("secret_key", &"***")
            .finish()
    }
}
