//! Ordered host bootstrap.
//!
//! Host frameworks perform global, non-reentrant initialization, so the
//! phases run strictly in order, each gating the next, and never more than
//! once per process (see [`BootGuard`]).

use super::{
    AppContext, COMPONENT_GROUP, ComponentApp, HostApplication, HostFramework, HostPhase,
    RequestEmulationConfig, RuntimeConstants,
};
use crate::config::GlobalConfig;
use crate::error::{CliError, Result};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// Set once the host framework has been initialized in this process.
static PROCESS_BOOTED: AtomicBool = AtomicBool::new(false);

/// One-shot permission to construct a [`HostHandle`].
///
/// [`BootGuard::process`] is shared by the whole process; a
/// [`BootGuard::scoped`] guard only covers the bootstrapper that owns it.
#[derive(Debug)]
pub struct BootGuard {
    flag: GuardFlag,
}

#[derive(Debug)]
enum GuardFlag {
    Process,
    Scoped(AtomicBool),
}

/// Proof that the guard was claimed. Only [`BootGuard::claim`] creates one.
#[derive(Debug)]
pub struct BootToken {
    _private: (),
}

impl BootGuard {
    /// The process-wide guard.
    pub fn process() -> Self {
        Self {
            flag: GuardFlag::Process,
        }
    }

    /// A guard private to one bootstrapper.
    pub fn scoped() -> Self {
        Self {
            flag: GuardFlag::Scoped(AtomicBool::new(false)),
        }
    }

    fn flag(&self) -> &AtomicBool {
        match &self.flag {
            GuardFlag::Process => &PROCESS_BOOTED,
            GuardFlag::Scoped(flag) => flag,
        }
    }

    /// The first call returns a token; every later call returns `None`.
    pub fn claim(&self) -> Option<BootToken> {
        if self.flag().swap(true, Ordering::SeqCst) {
            None
        } else {
            Some(BootToken { _private: () })
        }
    }

    pub fn is_claimed(&self) -> bool {
        self.flag().load(Ordering::SeqCst)
    }
}

/// A fully initialized host runtime.
pub struct HostHandle {
    framework: Box<dyn HostFramework>,
    constants: RuntimeConstants,
    request: RequestEmulationConfig,
    application: HostApplication,
    components: ComponentApp,
}

impl HostHandle {
    fn new(
        _token: BootToken,
        framework: Box<dyn HostFramework>,
        constants: RuntimeConstants,
        request: RequestEmulationConfig,
        application: HostApplication,
        components: ComponentApp,
    ) -> Self {
        Self {
            framework,
            constants,
            request,
            application,
            components,
        }
    }

    /// Filesystem root of the host.
    pub fn root(&self) -> &Path {
        &self.constants.base_path
    }

    pub fn constants(&self) -> &RuntimeConstants {
        &self.constants
    }

    pub fn request(&self) -> &RequestEmulationConfig {
        &self.request
    }

    pub fn application(&self) -> &HostApplication {
        &self.application
    }

    pub fn components(&self) -> &ComponentApp {
        &self.components
    }

    pub(crate) fn framework_mut(&mut self) -> &mut dyn HostFramework {
        self.framework.as_mut()
    }
}

impl fmt::Debug for HostHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostHandle")
            .field("constants", &self.constants)
            .field("request", &self.request)
            .field("application", &self.application)
            .field("components", &self.components)
            .finish_non_exhaustive()
    }
}

/// Runs the host initialization phases.
#[derive(Debug)]
pub struct HostBootstrapper {
    guard: BootGuard,
}

impl Default for HostBootstrapper {
    fn default() -> Self {
        Self::new()
    }
}

impl HostBootstrapper {
    /// Bootstrapper bound to the process-wide guard.
    pub fn new() -> Self {
        Self::with_guard(BootGuard::process())
    }

    pub fn with_guard(guard: BootGuard) -> Self {
        Self { guard }
    }

    /// Bootstrap `framework` using `global`.
    ///
    /// Phases, in order:
    /// 1. runtime constants,
    /// 2. request emulation (fails with "Host is undefined" when `host` is blank),
    /// 3. core definitions,
    /// 4. site application,
    /// 5. component framework.
    ///
    /// The first failure aborts the remaining phases. A guard can be claimed
    /// once, whether or not that attempt succeeds.
    pub fn bootstrap(
        &self,
        global: &GlobalConfig,
        framework: Box<dyn HostFramework>,
    ) -> Result<HostHandle> {
        self.bootstrap_with(global, framework, |_| {})
    }

    /// Same as [`bootstrap`](Self::bootstrap), calling `on_phase` after each
    /// phase completes.
    pub fn bootstrap_with<F>(
        &self,
        global: &GlobalConfig,
        mut framework: Box<dyn HostFramework>,
        mut on_phase: F,
    ) -> Result<HostHandle>
    where
        F: FnMut(HostPhase),
    {
        let token = self.guard.claim().ok_or_else(|| {
            CliError::HostInit("host framework is already initialized in this process".to_string())
        })?;

        let constants = RuntimeConstants::for_root(global.host_root());
        framework
            .define_constants(&constants)
            .map_err(|e| phase_error(HostPhase::Constants, e))?;
        tracing::debug!(root = %constants.base_path.display(), "runtime constants defined");
        on_phase(HostPhase::Constants);

        let host = global.host().ok_or_else(|| {
            CliError::HostInit(format!(
                "Host is undefined. Check global config \"{}\"",
                global.path().display()
            ))
        })?;
        let request = RequestEmulationConfig::new(host, &constants.base_path);
        framework
            .emulate_request(&request)
            .map_err(|e| phase_error(HostPhase::RequestEmulation, e))?;
        tracing::debug!(host = %request.http_host, "request emulation ready");
        on_phase(HostPhase::RequestEmulation);

        framework
            .load_core()
            .map_err(|e| phase_error(HostPhase::CoreDefinitions, e))?;
        on_phase(HostPhase::CoreDefinitions);

        let application = framework
            .create_application(AppContext::Site)
            .map_err(|e| phase_error(HostPhase::Application, e))?;
        tracing::debug!(context = %application.context, "host application created");
        on_phase(HostPhase::Application);

        let components = framework
            .init_components(COMPONENT_GROUP)
            .map_err(|e| phase_error(HostPhase::ComponentFramework, e))?;
        tracing::debug!(
            group = %components.group,
            app = %components.name,
            "component framework ready"
        );
        on_phase(HostPhase::ComponentFramework);

        Ok(HostHandle::new(
            token,
            framework,
            constants,
            request,
            application,
            components,
        ))
    }
}

fn phase_error(phase: HostPhase, err: anyhow::Error) -> CliError {
    CliError::HostInit(format!("{} phase failed: {:#}", phase, err))
}
