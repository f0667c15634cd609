//! Adapter for a host deployed on the local filesystem.
//!
//! Each bootstrap phase checks that the host's own entry points exist under
//! the configured root. The login primitive is reached through the `bridge`
//! command configured in the global config.

use super::{
    AppContext, COMPONENT_APP, ComponentApp, HostApplication, HostFramework,
    RequestEmulationConfig, RuntimeConstants,
};
use crate::config::{Credentials, GlobalConfig};
use crate::error::{CliError, Result};
use anyhow::{Context, bail};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Core definitions and runtime loaders, relative to the host root.
const CORE_ENTRY_POINTS: &[&str] = &[
    "includes/defines.php",
    "libraries/import.legacy.php",
    "libraries/cms.php",
];

/// Front-end application entry point.
const SITE_ENTRY_POINT: &str = "index.php";

/// Environment variables carrying credentials to the bridge.
pub const LOGIN_ENV: &str = "CCK_AUTH_LOGIN";
pub const PASSWORD_ENV: &str = "CCK_AUTH_PASS";
pub const SECRET_KEY_ENV: &str = "CCK_AUTH_SECRETKEY";

fn component_entry_points(group: &str) -> Vec<PathBuf> {
    vec![
        PathBuf::from(format!("administrator/components/com_{}/config.php", COMPONENT_APP)),
        PathBuf::from(format!(
            "media/{}/applications/{}/framework/jbzoo.php",
            COMPONENT_APP, group
        )),
    ]
}

/// Host installed on disk and reached through a bridge command.
#[derive(Debug, Default)]
pub struct DeployedHost {
    bridge: Option<Vec<String>>,
    root: Option<PathBuf>,
    request: Option<RequestEmulationConfig>,
    child_env: BTreeMap<String, String>,
}

impl DeployedHost {
    pub fn new(bridge: Option<Vec<String>>) -> Self {
        Self {
            bridge,
            ..Self::default()
        }
    }

    /// Extra variables for the bridge process, such as execution limits.
    pub fn with_child_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.child_env = env;
        self
    }

    /// Build the adapter from the global config's `bridge` value.
    pub fn from_config(global: &GlobalConfig) -> Result<Self> {
        let bridge = match global.bridge() {
            Some(line) => {
                let args = shell_words::split(&line).map_err(|e| {
                    CliError::ConfigInvalid(format!(
                        "failed to parse `bridge` command '{}': {}",
                        line, e
                    ))
                })?;
                if args.is_empty() {
                    None
                } else {
                    Some(args)
                }
            }
            None => None,
        };
        Ok(Self::new(bridge))
    }

    fn root(&self) -> anyhow::Result<&Path> {
        self.root
            .as_deref()
            .context("runtime constants have not been defined")
    }
}

fn require_files<P: AsRef<Path>>(root: &Path, entries: &[P]) -> anyhow::Result<()> {
    let missing: Vec<String> = entries
        .iter()
        .map(AsRef::<Path>::as_ref)
        .filter(|p| !root.join(p).is_file())
        .map(|p| p.display().to_string())
        .collect();

    if !missing.is_empty() {
        bail!(
            "missing host entry points under {}: {}",
            root.display(),
            missing.join(", ")
        );
    }
    Ok(())
}

impl HostFramework for DeployedHost {
    fn define_constants(&mut self, constants: &RuntimeConstants) -> anyhow::Result<()> {
        if !constants.base_path.is_dir() {
            bail!(
                "host root {} is not a directory",
                constants.base_path.display()
            );
        }
        self.root = Some(constants.base_path.clone());
        Ok(())
    }

    fn emulate_request(&mut self, request: &RequestEmulationConfig) -> anyhow::Result<()> {
        self.request = Some(request.clone());
        Ok(())
    }

    fn load_core(&mut self) -> anyhow::Result<()> {
        require_files(self.root()?, CORE_ENTRY_POINTS)
    }

    fn create_application(&mut self, context: AppContext) -> anyhow::Result<HostApplication> {
        let root = self.root()?;
        require_files(root, &[SITE_ENTRY_POINT])?;
        Ok(HostApplication {
            context,
            base_path: root.to_path_buf(),
        })
    }

    fn init_components(&mut self, group: &str) -> anyhow::Result<ComponentApp> {
        require_files(self.root()?, &component_entry_points(group))?;
        Ok(ComponentApp {
            group: group.to_string(),
            name: COMPONENT_APP.to_string(),
        })
    }

    fn login(&mut self, credentials: &Credentials) -> anyhow::Result<bool> {
        let Some((program, args)) = self.bridge.as_ref().and_then(|b| b.split_first()) else {
            bail!("no `bridge` command configured to reach the host login service");
        };
        let root = self.root()?;
        let request = self
            .request
            .as_ref()
            .context("request emulation has not been configured")?;

        // Credentials travel through the environment, never argv.
        let output = Command::new(program)
            .args(args)
            .arg("login")
            .current_dir(root)
            .envs(request.env_vars())
            .envs(&self.child_env)
            .env(LOGIN_ENV, &credentials.login)
            .env(PASSWORD_ENV, &credentials.password)
            .env(SECRET_KEY_ENV, &credentials.secret_key)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to run bridge '{}'", program))?;

        if !output.status.success() {
            tracing::debug!(
                status = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "bridge rejected login"
            );
        }
        Ok(output.status.success())
    }
}
