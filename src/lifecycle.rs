//! Command lifecycle: bootstrap orchestration and the per-command hooks.
//!
//! Every command runs behind the same fail-fast sequence:
//! global config, environment limits, host bootstrap, command config,
//! authentication. Only when all of them succeed does the command's own
//! `before_run`/`run`/`after_run` execute.

use crate::config::{CommandConfig, ConfigLoader, GlobalConfig};
use crate::console::{Console, MessageKind};
use crate::environment::{EnvironmentConfigurator, ExecutionLimits, LimitSink};
use crate::error::Result;
use crate::host::{
    AuthenticationGate, HostBootstrapper, HostFramework, HostHandle, HostPhase, Session,
};
use crate::profiler::{MemorySource, Profiler};
use crate::progress::{ProgressIndicator, ProgressRunner, ProgressState, TerminalProgress};
use std::time::Instant;

/// Everything a command needs once the host is ready.
pub struct CommandContext {
    pub console: Console,
    pub global: GlobalConfig,
    pub config: CommandConfig,
    pub limits: ExecutionLimits,
    pub host: HostHandle,
    pub session: Session,
    pub loader: ConfigLoader,
    pub profile: Option<String>,
    profiler: Profiler,
}

impl CommandContext {
    pub fn say(&mut self, message: &str, kind: MessageKind) {
        self.console.say(message, kind);
    }

    /// Emit a profiler checkpoint (diagnostic mode only).
    pub fn checkpoint(&mut self, label: &str) {
        checkpoint(&mut self.profiler, &mut self.console, label);
    }

    /// Run a step-wise loop with a terminal progress bar.
    pub fn progress<F>(
        &mut self,
        name: &str,
        total: u64,
        step: u64,
        callback: F,
    ) -> Result<ProgressState>
    where
        F: FnMut(u64) -> bool,
    {
        let indicator = TerminalProgress::new(self.console.verbosity());
        self.progress_with(indicator, name, total, step, callback)
    }

    /// Same as [`progress`](Self::progress) with a caller-provided indicator.
    pub fn progress_with<I, F>(
        &mut self,
        indicator: I,
        name: &str,
        total: u64,
        step: u64,
        callback: F,
    ) -> Result<ProgressState>
    where
        I: ProgressIndicator,
        F: FnMut(u64) -> bool,
    {
        ProgressRunner::new(indicator).run(&mut self.console, name, total, step, callback)
    }
}

fn checkpoint(profiler: &mut Profiler, console: &mut Console, label: &str) {
    if let Some(sample) = profiler.sample(label) {
        console.say(&sample.to_string(), MessageKind::Info);
    }
}

/// A command driven through the lifecycle hooks.
pub trait CliCommand {
    /// Invocation name, e.g. `batch:run`. Selects the command config file.
    fn name(&self) -> &'static str;

    fn before_run(&mut self, _ctx: &mut CommandContext) -> Result<()> {
        Ok(())
    }

    fn run(&mut self, ctx: &mut CommandContext) -> Result<()>;

    fn after_run(&mut self, _ctx: &mut CommandContext) -> Result<()> {
        Ok(())
    }
}

/// Injected collaborators for one boot.
pub struct BootDeps<'a> {
    pub console: Console,
    pub limits: &'a mut dyn LimitSink,
    pub memory: Box<dyn MemorySource>,
}

/// Owns the ordered bootstrap for one process.
pub struct Orchestrator {
    loader: ConfigLoader,
    bootstrapper: HostBootstrapper,
    started: Instant,
}

impl Orchestrator {
    /// `started` is the process start used for elapsed-time checkpoints.
    pub fn new(loader: ConfigLoader, started: Instant) -> Self {
        Self {
            loader,
            bootstrapper: HostBootstrapper::new(),
            started,
        }
    }

    /// Replace the process-wide bootstrapper.
    pub fn with_bootstrapper(mut self, bootstrapper: HostBootstrapper) -> Self {
        self.bootstrapper = bootstrapper;
        self
    }

    /// Run the bootstrap sequence for `command`.
    ///
    /// `host_factory` builds the host adapter once the global config and the
    /// execution limits are known.
    /// Any failure aborts the sequence; nothing after it runs.
    pub fn boot<F>(
        &self,
        command: &str,
        profile: Option<&str>,
        deps: BootDeps<'_>,
        host_factory: F,
    ) -> Result<CommandContext>
    where
        F: FnOnce(&GlobalConfig, &ExecutionLimits) -> Result<Box<dyn HostFramework>>,
    {
        let BootDeps {
            mut console,
            limits,
            memory,
        } = deps;
        let verbosity = console.verbosity();
        let mut profiler = Profiler::new(self.started, verbosity.is_diagnostic(), memory);
        checkpoint(&mut profiler, &mut console, "Start");

        let global = self.loader.load_global()?;

        let limits = EnvironmentConfigurator::new(limits).apply(&global, verbosity);
        tracing::debug!(
            path = %global.path().display(),
            keys = global.data().len(),
            "loaded global config"
        );

        let framework = host_factory(&global, &limits)?;
        let mut host = self
            .bootstrapper
            .bootstrap_with(&global, framework, |phase| match phase {
                HostPhase::Application => checkpoint(&mut profiler, &mut console, "Host loaded"),
                HostPhase::ComponentFramework => {
                    checkpoint(&mut profiler, &mut console, "Components loaded")
                }
                _ => {}
            })?;

        let config = self.loader.load_command(command, profile)?;

        let session = AuthenticationGate::authenticate(&mut host, &global.credentials())?;
        checkpoint(&mut profiler, &mut console, "Tool is ready");

        tracing::debug!(command, ?profile, login = %session.login, "bootstrap complete");

        Ok(CommandContext {
            console,
            global,
            config,
            limits,
            host,
            session,
            loader: self.loader.clone(),
            profile: profile.map(str::to_string),
            profiler,
        })
    }

    /// Boot, then drive `command` through its hooks.
    pub fn execute<F>(
        &self,
        command: &mut dyn CliCommand,
        profile: Option<&str>,
        deps: BootDeps<'_>,
        host_factory: F,
    ) -> Result<()>
    where
        F: FnOnce(&GlobalConfig, &ExecutionLimits) -> Result<Box<dyn HostFramework>>,
    {
        let mut ctx = self.boot(command.name(), profile, deps, host_factory)?;
        run_hooks(command, &mut ctx)
    }
}

/// `before_run`, `run`, `after_run`; the first failure stops the chain.
pub fn run_hooks(command: &mut dyn CliCommand, ctx: &mut CommandContext) -> Result<()> {
    command.before_run(ctx)?;
    command.run(ctx)?;
    command.after_run(ctx)?;
    ctx.checkpoint("Done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::Verbosity;
    use crate::environment::{ErrorReporting, MemoryLimit};
    use crate::error::CliError;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use crate::test_support::{
        CallLog, FakeHost, FixedMemory, LoginOutcome, RecordingIndicator, RecordingSink,
        SharedBuffer, call_names, captured_console, scoped_orchestrator, write_config,
    };
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        sink: RecordingSink,
    }

    impl Fixture {
        fn new(global: &str) -> Self {
            let dir = TempDir::new().unwrap();
            write_config(dir.path(), "_global", global);
            Self {
                dir,
                sink: RecordingSink::default(),
            }
        }

        fn orchestrator(&self) -> Orchestrator {
            scoped_orchestrator(self.dir.path())
        }

        fn boot(
            &mut self,
            command: &str,
            profile: Option<&str>,
            verbosity: Verbosity,
            host: FakeHost,
        ) -> (Result<CommandContext>, SharedBuffer) {
            let orchestrator = self.orchestrator();
            let (console, buffer) = captured_console(verbosity);
            let deps = BootDeps {
                console,
                limits: &mut self.sink,
                memory: Box::new(FixedMemory::new(&[2 * 1024 * 1024])),
            };
            let result = orchestrator.boot(command, profile, deps, |_, _| {
                Ok(Box::new(host) as Box<dyn HostFramework>)
            });
            (result, buffer)
        }
    }

    fn fake() -> (FakeHost, CallLog) {
        FakeHost::new()
    }

    #[test]
    fn full_sequence_builds_context() {
        let mut fx = Fixture::new("host: shop.local\nmemory: 1G\nauth:\n  login: admin\n");
        write_config(fx.dir.path(), "batch-run", "total: 10\n");
        let (host, calls) = fake();

        let (ctx, _buffer) = fx.boot("batch:run", None, Verbosity::Normal, host);
        let ctx = ctx.unwrap();

        assert_eq!(ctx.config.find_u64("total"), Some(10));
        assert_eq!(ctx.session.login, "admin");
        assert_eq!(ctx.limits.memory.to_string(), "1G");
        assert_eq!(
            call_names(&calls),
            vec![
                "define_constants",
                "emulate_request",
                "load_core",
                "create_application",
                "init_components",
                "login",
            ]
        );
        assert!(fx.sink.memory.is_some());
    }

    #[test]
    fn missing_global_config_stops_before_environment() {
        let dir = TempDir::new().unwrap();
        let mut sink = RecordingSink::default();
        let (console, _buffer) = captured_console(Verbosity::Normal);
        let (host, calls) = fake();

        let orchestrator = scoped_orchestrator(dir.path());
        let err = orchestrator
            .boot(
                "host:check",
                None,
                BootDeps {
                    console,
                    limits: &mut sink,
                    memory: Box::new(FixedMemory::new(&[0])),
                },
                |_, _| Ok(Box::new(host) as Box<dyn HostFramework>),
            )
            .err()
            .unwrap();

        assert!(matches!(err, CliError::ConfigMissing(_)));
        assert!(sink.reporting.is_none());
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn undefined_host_stops_before_login() {
        let mut fx = Fixture::new("memory: 1G\n");
        let (host, calls) = fake();

        let (ctx, _buffer) = fx.boot("host:check", None, Verbosity::Normal, host);
        assert!(matches!(ctx.err().unwrap(), CliError::HostInit(_)));
        assert_eq!(call_names(&calls), vec!["define_constants"]);
        // Environment is applied before the host is touched.
        assert!(fx.sink.memory.is_some());
    }

    #[test]
    fn missing_profile_stops_before_login() {
        let mut fx = Fixture::new("host: shop.local\n");
        let (host, calls) = fake();

        let (ctx, _buffer) = fx.boot("batch:run", Some("nightly"), Verbosity::Normal, host);
        assert!(matches!(ctx.err().unwrap(), CliError::ConfigMissing(_)));
        assert!(!call_names(&calls).contains(&"login".to_string()));
    }

    #[test]
    fn rejected_login_aborts_boot() {
        let mut fx = Fixture::new("host: shop.local\n");
        let (host, _calls) = fake();
        let host = host.with_login(LoginOutcome::Reject);

        let (ctx, _buffer) = fx.boot("host:check", None, Verbosity::Normal, host);
        assert!(matches!(ctx.err().unwrap(), CliError::Auth(_)));
    }

    #[test]
    fn diagnostic_mode_prints_checkpoints() {
        let mut fx = Fixture::new("host: shop.local\n");
        let (host, _calls) = fake();

        let (ctx, buffer) = fx.boot("host:check", None, Verbosity::Verbose, host);
        ctx.unwrap();

        let output = buffer.contents();
        assert!(output.contains("(Start)"));
        assert!(output.contains("(Host loaded)"));
        assert!(output.contains("(Components loaded)"));
        let host_at = output.find("(Host loaded)").unwrap();
        let components_at = output.find("(Components loaded)").unwrap();
        assert!(host_at < components_at);
        assert!(output.contains("(Tool is ready)"));
        assert!(output.contains("Memory: 2.00MB"));
    }

    #[test]
    fn normal_mode_prints_no_checkpoints() {
        let mut fx = Fixture::new("host: shop.local\n");
        let (host, _calls) = fake();

        let (ctx, buffer) = fx.boot("host:check", None, Verbosity::Normal, host);
        ctx.unwrap();
        assert!(buffer.contents().is_empty());
    }

    #[test]
    fn host_factory_error_aborts_boot() {
        let mut fx = Fixture::new("host: shop.local\n");
        let (console, _buffer) = captured_console(Verbosity::Normal);
        let orchestrator = fx.orchestrator();

        let err = orchestrator
            .boot(
                "host:check",
                None,
                BootDeps {
                    console,
                    limits: &mut fx.sink,
                    memory: Box::new(FixedMemory::new(&[0])),
                },
                |_, _| Err(CliError::ConfigInvalid("bad bridge".to_string())),
            )
            .err()
            .unwrap();
        assert!(matches!(err, CliError::ConfigInvalid(_)));
    }

    /// Installs a thread-local subscriber when error reporting is applied,
    /// like the process sink installs the global one.
    #[derive(Default)]
    struct TracingSink {
        log: Arc<Mutex<Vec<u8>>>,
        guard: Option<tracing::subscriber::DefaultGuard>,
    }

    struct LogWriter(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LimitSink for TracingSink {
        fn set_error_reporting(&mut self, _reporting: ErrorReporting) -> anyhow::Result<()> {
            let log = self.log.clone();
            let subscriber = tracing_subscriber::fmt()
                .with_max_level(tracing::Level::DEBUG)
                .with_ansi(false)
                .with_writer(move || LogWriter(log.clone()))
                .finish();
            self.guard = Some(tracing::subscriber::set_default(subscriber));
            Ok(())
        }

        fn set_memory_limit(&mut self, _limit: &MemoryLimit) -> anyhow::Result<()> {
            Ok(())
        }

        fn set_time_limit(&mut self, _limit: Option<Duration>) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn config_events_follow_logging_setup() {
        let fx = Fixture::new("host: shop.local\n");
        let mut sink = TracingSink::default();
        let (console, _buffer) = captured_console(Verbosity::Verbose);
        let (host, _calls) = fake();

        fx.orchestrator()
            .boot(
                "host:check",
                None,
                BootDeps {
                    console,
                    limits: &mut sink,
                    memory: Box::new(FixedMemory::new(&[0])),
                },
                |_, _| Ok(Box::new(host) as Box<dyn HostFramework>),
            )
            .unwrap();
        drop(sink.guard.take());

        let log = String::from_utf8(sink.log.lock().unwrap().clone()).unwrap();
        assert!(log.contains("loaded global config"));
        assert!(log.contains("bootstrap complete"));
    }

    #[test]
    fn host_factory_sees_execution_limits() {
        let mut fx = Fixture::new("host: shop.local\nmemory: 2G\n");
        let (console, _buffer) = captured_console(Verbosity::Normal);
        let (host, _calls) = fake();
        let orchestrator = fx.orchestrator();

        let mut seen = None;
        orchestrator
            .boot(
                "host:check",
                None,
                BootDeps {
                    console,
                    limits: &mut fx.sink,
                    memory: Box::new(FixedMemory::new(&[0])),
                },
                |_, limits| {
                    seen = Some(limits.memory.to_string());
                    Ok(Box::new(host) as Box<dyn HostFramework>)
                },
            )
            .unwrap();
        assert_eq!(seen.as_deref(), Some("2G"));
    }

    struct Recorder {
        events: Vec<&'static str>,
        fail_run: bool,
    }

    impl CliCommand for Recorder {
        fn name(&self) -> &'static str {
            "test:record"
        }

        fn before_run(&mut self, _ctx: &mut CommandContext) -> Result<()> {
            self.events.push("before");
            Ok(())
        }

        fn run(&mut self, ctx: &mut CommandContext) -> Result<()> {
            self.events.push("run");
            let state = ctx.progress_with(RecordingIndicator::default(), "rows", 3, 1, |_| true)?;
            assert_eq!(state.calls, 4);
            if self.fail_run {
                return Err(CliError::CommandFailed("boom".to_string()));
            }
            Ok(())
        }

        fn after_run(&mut self, _ctx: &mut CommandContext) -> Result<()> {
            self.events.push("after");
            Ok(())
        }
    }

    #[test]
    fn hooks_run_in_order() {
        let mut fx = Fixture::new("host: shop.local\n");
        let (host, _calls) = fake();
        let (ctx, _buffer) = fx.boot("test:record", None, Verbosity::Normal, host);
        let mut ctx = ctx.unwrap();

        let mut command = Recorder {
            events: Vec::new(),
            fail_run: false,
        };
        run_hooks(&mut command, &mut ctx).unwrap();
        assert_eq!(command.events, vec!["before", "run", "after"]);
    }

    #[test]
    fn failing_run_skips_after_run() {
        let mut fx = Fixture::new("host: shop.local\n");
        let (host, _calls) = fake();
        let (ctx, _buffer) = fx.boot("test:record", None, Verbosity::Normal, host);
        let mut ctx = ctx.unwrap();

        let mut command = Recorder {
            events: Vec::new(),
            fail_run: true,
        };
        let err = run_hooks(&mut command, &mut ctx).unwrap_err();
        assert!(matches!(err, CliError::CommandFailed(_)));
        assert_eq!(command.events, vec!["before", "run"]);
    }
}
