//! Host framework integration.
//!
//! The deployed CMS and its component framework are reached through the
//! [`HostFramework`] trait. [`HostBootstrapper`] drives the adapter through
//! the ordered, non-reentrant initialization phases and yields a
//! [`HostHandle`]; [`AuthenticationGate`] then exchanges credentials for a
//! [`Session`].

mod auth;
mod bootstrap;
mod deployed;


use crate::config::Credentials;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

pub use auth::{AuthenticationGate, Session};
pub use bootstrap::{BootGuard, BootToken, HostBootstrapper, HostHandle};
pub use deployed::DeployedHost;

/// Application group of the component framework.
pub const COMPONENT_GROUP: &str = "jbuniversal";

/// Name of the component framework's application singleton.
pub const COMPONENT_APP: &str = "zoo";

/// Locale requested from the host; fixed so output is predictable.
pub const REQUEST_LOCALE: &str = "ru";

/// Template that makes the host render nothing.
pub const RAW_TEMPLATE: &str = "raw";

/// Ordered bootstrap phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HostPhase {
    Constants,
    RequestEmulation,
    CoreDefinitions,
    Application,
    ComponentFramework,
}

impl fmt::Display for HostPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostPhase::Constants => write!(f, "runtime constants"),
            HostPhase::RequestEmulation => write!(f, "request emulation"),
            HostPhase::CoreDefinitions => write!(f, "core definitions"),
            HostPhase::Application => write!(f, "application"),
            HostPhase::ComponentFramework => write!(f, "component framework"),
        }
    }
}

/// Baseline runtime constants handed to the host before anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConstants {
    pub path_separator: char,
    /// Marks execution as coming through a legitimate entry point.
    pub exec_marker: bool,
    /// Host debug mode; always off for command-line runs.
    pub debug: bool,
    pub base_path: PathBuf,
}

impl RuntimeConstants {
    pub fn for_root(base_path: impl Into<PathBuf>) -> Self {
        Self {
            path_separator: std::path::MAIN_SEPARATOR,
            exec_marker: true,
            debug: false,
            base_path: base_path.into(),
        }
    }
}

/// The emulated inbound HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEmulationConfig {
    pub http_host: String,
    pub method: String,
    pub script_name: PathBuf,
    pub template: String,
    pub lang: String,
}

impl RequestEmulationConfig {
    /// A raw-template `GET` for `http_host` against the host rooted at `root`.
    pub fn new(http_host: impl Into<String>, root: &Path) -> Self {
        Self {
            http_host: http_host.into(),
            method: "GET".to_string(),
            script_name: root.join("administrator").join("index.php"),
            template: RAW_TEMPLATE.to_string(),
            lang: REQUEST_LOCALE.to_string(),
        }
    }

    /// CGI-style variables describing this request, for child processes.
    pub fn env_vars(&self) -> BTreeMap<String, String> {
        let query = format!("tmpl={}&lang={}", self.template, self.lang);
        BTreeMap::from([
            ("HTTP_HOST".to_string(), self.http_host.clone()),
            ("SERVER_NAME".to_string(), self.http_host.clone()),
            ("REQUEST_METHOD".to_string(), self.method.clone()),
            (
                "SCRIPT_NAME".to_string(),
                self.script_name.display().to_string(),
            ),
            ("QUERY_STRING".to_string(), query),
        ])
    }
}

/// Which application context the host should instantiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppContext {
    Site,
}

impl fmt::Display for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppContext::Site => write!(f, "site"),
        }
    }
}

/// The host's front-end application object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostApplication {
    pub context: AppContext,
    pub base_path: PathBuf,
}

/// The component framework's application singleton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentApp {
    pub group: String,
    pub name: String,
}

/// Entry points of a deployed host framework.
///
/// Methods are called at most once each, in declaration order, by
/// [`HostBootstrapper`]; `login` only after a successful bootstrap.
pub trait HostFramework {
    fn define_constants(&mut self, constants: &RuntimeConstants) -> anyhow::Result<()>;
    fn emulate_request(&mut self, request: &RequestEmulationConfig) -> anyhow::Result<()>;
    fn load_core(&mut self) -> anyhow::Result<()>;
    fn create_application(&mut self, context: AppContext) -> anyhow::Result<HostApplication>;
    fn init_components(&mut self, group: &str) -> anyhow::Result<ComponentApp>;
    /// `Ok(false)` means the host rejected the credentials.
    fn login(&mut self, credentials: &Credentials) -> anyhow::Result<bool>;
}
