use crate::config::{ConfigLoader, Credentials};
use crate::console::{Console, Verbosity};
use crate::environment::{ErrorReporting, LimitSink, MemoryLimit};
use crate::host::{
    AppContext, BootGuard, COMPONENT_APP, ComponentApp, HostApplication, HostBootstrapper,
    HostFramework, HostPhase, RequestEmulationConfig, RuntimeConstants,
};
use crate::lifecycle::{BootDeps, CommandContext, Orchestrator};
use crate::profiler::MemorySource;
use crate::progress::ProgressIndicator;
use std::cell::RefCell;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Cloneable in-memory writer for capturing console output.
#[derive(Clone, Default)]
pub(crate) struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub(crate) fn captured_console(verbosity: Verbosity) -> (Console, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let console = Console::with_writer(Box::new(buffer.clone()), verbosity);
    (console, buffer)
}

/// Write `<dir>/<name>.yaml`.
pub(crate) fn write_config(dir: &Path, name: &str, yaml: &str) -> PathBuf {
    let path = dir.join(format!("{}.yaml", name));
    std::fs::write(&path, yaml).unwrap();
    path
}

/// Lay out the entry points a deployed host is expected to have.
pub(crate) fn create_host_tree(root: &Path) {
    let files = [
        "index.php".to_string(),
        "administrator/index.php".to_string(),
        "includes/defines.php".to_string(),
        "libraries/import.legacy.php".to_string(),
        "libraries/cms.php".to_string(),
        format!("administrator/components/com_{}/config.php", COMPONENT_APP),
        format!(
            "media/{}/applications/jbuniversal/framework/jbzoo.php",
            COMPONENT_APP
        ),
    ];
    for file in files {
        let path = root.join(file);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "<?php\n").unwrap();
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    pub(crate) reporting: Option<ErrorReporting>,
    pub(crate) memory: Option<MemoryLimit>,
    pub(crate) time: Option<Option<Duration>>,
    pub(crate) fail: bool,
}

impl RecordingSink {
    fn outcome(&self) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("limit rejected");
        }
        Ok(())
    }
}

impl LimitSink for RecordingSink {
    fn set_error_reporting(&mut self, reporting: ErrorReporting) -> anyhow::Result<()> {
        self.reporting = Some(reporting);
        self.outcome()
    }

    fn set_memory_limit(&mut self, limit: &MemoryLimit) -> anyhow::Result<()> {
        self.memory = Some(limit.clone());
        self.outcome()
    }

    fn set_time_limit(&mut self, limit: Option<Duration>) -> anyhow::Result<()> {
        self.time = Some(limit);
        self.outcome()
    }
}

/// Returns the given readings in order, then repeats the last one.
pub(crate) struct FixedMemory {
    readings: Vec<u64>,
    next: usize,
    peak: Option<u64>,
}

impl FixedMemory {
    pub(crate) fn new(readings: &[u64]) -> Self {
        Self {
            readings: readings.to_vec(),
            next: 0,
            peak: None,
        }
    }

    /// Report `peak` as the process peak.
    pub(crate) fn with_peak(mut self, peak: u64) -> Self {
        self.peak = Some(peak);
        self
    }
}

impl MemorySource for FixedMemory {
    fn resident_bytes(&mut self) -> Option<u64> {
        let value = self
            .readings
            .get(self.next)
            .or_else(|| self.readings.last())
            .copied();
        self.next += 1;
        value
    }

    fn peak_bytes(&mut self) -> Option<u64> {
        self.peak
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingIndicator {
    pub(crate) total: Option<u64>,
    pub(crate) redraw_frequency: Option<u64>,
    pub(crate) positions: Vec<u64>,
    pub(crate) finished: u32,
}

impl ProgressIndicator for RecordingIndicator {
    fn display(&mut self, total: u64) {
        self.total = Some(total);
    }

    fn set_redraw_frequency(&mut self, updates: u64) {
        self.redraw_frequency = Some(updates);
    }

    fn set_progress(&mut self, position: u64) {
        self.positions.push(position);
    }

    fn finish(&mut self) {
        self.finished += 1;
    }
}

pub(crate) type CallLog = Rc<RefCell<Vec<String>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoginOutcome {
    Accept,
    Reject,
    Fail,
}

/// In-memory host that records every call it receives.
pub(crate) struct FakeHost {
    calls: CallLog,
    fail_at: Option<HostPhase>,
    login: LoginOutcome,
}

impl FakeHost {
    pub(crate) fn new() -> (Self, CallLog) {
        let calls = CallLog::default();
        let host = Self {
            calls: calls.clone(),
            fail_at: None,
            login: LoginOutcome::Accept,
        };
        (host, calls)
    }

    pub(crate) fn failing_at(mut self, phase: HostPhase) -> Self {
        self.fail_at = Some(phase);
        self
    }

    pub(crate) fn with_login(mut self, outcome: LoginOutcome) -> Self {
        self.login = outcome;
        self
    }

    fn record(&self, phase: HostPhase, call: String) -> anyhow::Result<()> {
        self.calls.borrow_mut().push(call);
        if self.fail_at == Some(phase) {
            anyhow::bail!("simulated {} failure", phase);
        }
        Ok(())
    }
}

impl HostFramework for FakeHost {
    fn define_constants(&mut self, constants: &RuntimeConstants) -> anyhow::Result<()> {
        self.record(
            HostPhase::Constants,
            format!("define_constants:{}", constants.base_path.display()),
        )
    }

    fn emulate_request(&mut self, request: &RequestEmulationConfig) -> anyhow::Result<()> {
        self.record(
            HostPhase::RequestEmulation,
            format!("emulate_request:{}", request.http_host),
        )
    }

    fn load_core(&mut self) -> anyhow::Result<()> {
        self.record(HostPhase::CoreDefinitions, "load_core".to_string())
    }

    fn create_application(&mut self, context: AppContext) -> anyhow::Result<HostApplication> {
        self.record(HostPhase::Application, format!("create_application:{}", context))?;
        Ok(HostApplication {
            context,
            base_path: PathBuf::from("/srv/site"),
        })
    }

    fn init_components(&mut self, group: &str) -> anyhow::Result<ComponentApp> {
        self.record(
            HostPhase::ComponentFramework,
            format!("init_components:{}", group),
        )?;
        Ok(ComponentApp {
            group: group.to_string(),
            name: COMPONENT_APP.to_string(),
        })
    }

    fn login(&mut self, credentials: &Credentials) -> anyhow::Result<bool> {
        self.calls
            .borrow_mut()
            .push(format!("login:{}", credentials.login));
        match self.login {
            LoginOutcome::Accept => Ok(true),
            LoginOutcome::Reject => Ok(false),
            LoginOutcome::Fail => anyhow::bail!("login service unreachable"),
        }
    }
}

/// Names of the recorded calls, without their arguments.
pub(crate) fn call_names(calls: &CallLog) -> Vec<String> {
    calls
        .borrow()
        .iter()
        .map(|c| c.split(':').next().unwrap_or_default().to_string())
        .collect()
}

/// Orchestrator whose boot guard is private to it.
pub(crate) fn scoped_orchestrator(config_dir: &Path) -> Orchestrator {
    Orchestrator::new(ConfigLoader::new(config_dir), Instant::now())
        .with_bootstrapper(HostBootstrapper::with_guard(BootGuard::scoped()))
}

/// Boot `command` against a fake host with configs from `config_dir`.
pub(crate) fn boot_fake(
    config_dir: &Path,
    command: &str,
    profile: Option<&str>,
) -> crate::error::Result<(CommandContext, SharedBuffer)> {
    let (console, buffer) = captured_console(Verbosity::Normal);
    let mut sink = RecordingSink::default();
    let orchestrator = scoped_orchestrator(config_dir);
    let deps = BootDeps {
        console,
        limits: &mut sink,
        memory: Box::new(FixedMemory::new(&[0])),
    };
    let ctx = orchestrator.boot(command, profile, deps, |_, _| {
        let (host, _calls) = FakeHost::new();
        Ok(Box::new(host) as Box<dyn HostFramework>)
    })?;
    Ok((ctx, buffer))
}
