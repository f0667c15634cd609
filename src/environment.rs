//! Process-wide execution limits and diagnostic verbosity.
//!
//! Limits are applied once at process start and never reverted. Applying a
//! limit is best-effort: failures are logged and swallowed.

use crate::config::{DEFAULT_MEMORY_LIMIT, GlobalConfig};
use crate::console::Verbosity;
use crate::logging;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

/// Memory ceiling exported to child processes, e.g. `512M`.
pub const MEMORY_LIMIT_ENV: &str = "CCK_MEMORY_LIMIT";

/// Time ceiling in seconds exported to child processes.
pub const TIME_LIMIT_ENV: &str = "CCK_TIME_LIMIT";

static MEMORY_LIMIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-1|\d+)([kKmMgG])?$").expect("static regex"));

/// Which error classes are surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorReporting {
    /// Everything, including debug diagnostics.
    All,
    /// Fatal errors and warnings only.
    FatalAndWarning,
}

impl ErrorReporting {
    pub fn for_verbosity(verbosity: Verbosity) -> Self {
        if verbosity.is_diagnostic() {
            ErrorReporting::All
        } else {
            ErrorReporting::FatalAndWarning
        }
    }

    /// Default `tracing` filter directive for this level.
    pub fn log_directive(self) -> &'static str {
        match self {
            ErrorReporting::All => "debug",
            ErrorReporting::FatalAndWarning => "warn",
        }
    }
}

/// A memory ceiling such as `512M`, `1G`, `65536` or `-1` (unlimited).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryLimit {
    raw: String,
    bytes: Option<u64>,
}

impl MemoryLimit {
    /// Parse a ceiling string. Suffixes `K`, `M`, `G` are case-insensitive.
    pub fn parse(value: &str) -> Option<Self> {
        let raw = value.trim();
        let caps = MEMORY_LIMIT_RE.captures(raw)?;

        let amount = &caps[1];
        if amount == "-1" {
            return Some(Self {
                raw: raw.to_string(),
                bytes: None,
            });
        }

        let amount: u64 = amount.parse().ok()?;
        let multiplier: u64 = match caps.get(2).map(|m| m.as_str().to_ascii_uppercase()) {
            Some(unit) if unit == "K" => 1024,
            Some(unit) if unit == "M" => 1024 * 1024,
            Some(unit) if unit == "G" => 1024 * 1024 * 1024,
            _ => 1,
        };

        Some(Self {
            raw: raw.to_string(),
            bytes: Some(amount.checked_mul(multiplier)?),
        })
    }

    /// Ceiling in bytes; `None` means unlimited.
    pub fn bytes(&self) -> Option<u64> {
        self.bytes
    }

    pub fn is_unlimited(&self) -> bool {
        self.bytes.is_none()
    }
}

impl Default for MemoryLimit {
    fn default() -> Self {
        Self {
            raw: DEFAULT_MEMORY_LIMIT.to_string(),
            bytes: Some(512 * 1024 * 1024),
        }
    }
}

impl fmt::Display for MemoryLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Destination for process-wide limits.
pub trait LimitSink {
    fn set_error_reporting(&mut self, reporting: ErrorReporting) -> anyhow::Result<()>;
    fn set_memory_limit(&mut self, limit: &MemoryLimit) -> anyhow::Result<()>;
    /// `None` removes the ceiling.
    fn set_time_limit(&mut self, limit: Option<Duration>) -> anyhow::Result<()>;
}

/// Applies limits to the running process.
///
/// Error reporting installs the tracing subscriber. The memory and time
/// ceilings are not imposed as rlimits, since spawned children would inherit
/// them; they reach the host runtime through [`ExecutionLimits::child_env`]
/// and the time ceiling doubles as the cooperative deadline.
#[derive(Debug, Default)]
pub struct ProcessLimits;

impl LimitSink for ProcessLimits {
    fn set_error_reporting(&mut self, reporting: ErrorReporting) -> anyhow::Result<()> {
        logging::init_tracing(reporting.log_directive());
        Ok(())
    }

    fn set_memory_limit(&mut self, limit: &MemoryLimit) -> anyhow::Result<()> {
        tracing::debug!(
            %limit,
            env = MEMORY_LIMIT_ENV,
            "memory ceiling exported to host processes"
        );
        Ok(())
    }

    fn set_time_limit(&mut self, limit: Option<Duration>) -> anyhow::Result<()> {
        tracing::debug!(
            ?limit,
            env = TIME_LIMIT_ENV,
            "time ceiling exported to host processes"
        );
        Ok(())
    }
}

/// The limits in force after [`EnvironmentConfigurator::apply`].
#[derive(Debug, Clone)]
pub struct ExecutionLimits {
    pub reporting: ErrorReporting,
    pub memory: MemoryLimit,
    /// `None` when the time ceiling is disabled.
    pub time_limit: Option<Duration>,
    applied_at: Instant,
}

impl ExecutionLimits {
    /// Wall-clock instant after which long-running work should stop.
    pub fn deadline(&self) -> Option<Instant> {
        self.time_limit.map(|limit| self.applied_at + limit)
    }

    /// Whether the cooperative deadline has passed at `now`.
    pub fn is_exceeded_at(&self, now: Instant) -> bool {
        self.deadline().is_some_and(|deadline| now >= deadline)
    }

    pub fn is_time_exceeded(&self) -> bool {
        self.is_exceeded_at(Instant::now())
    }

    /// Variables handing the ceilings to host runtime processes.
    ///
    /// The time limit is in seconds, `0` meaning unlimited.
    pub fn child_env(&self) -> BTreeMap<String, String> {
        let secs = self.time_limit.map_or(0, |limit| limit.as_secs());
        BTreeMap::from([
            (MEMORY_LIMIT_ENV.to_string(), self.memory.to_string()),
            (TIME_LIMIT_ENV.to_string(), secs.to_string()),
        ])
    }
}

/// Derives limits from configuration and verbosity and applies them.
pub struct EnvironmentConfigurator<'a> {
    sink: &'a mut dyn LimitSink,
}

impl<'a> EnvironmentConfigurator<'a> {
    pub fn new(sink: &'a mut dyn LimitSink) -> Self {
        Self { sink }
    }

    /// Apply error reporting, memory and time ceilings. Never fails.
    pub fn apply(&mut self, global: &GlobalConfig, verbosity: Verbosity) -> ExecutionLimits {
        let reporting = ErrorReporting::for_verbosity(verbosity);
        if let Err(e) = self.sink.set_error_reporting(reporting) {
            tracing::warn!(error = %e, "could not apply error reporting level");
        }

        let configured = global.memory();
        let memory = MemoryLimit::parse(&configured).unwrap_or_else(|| {
            tracing::warn!(
                value = %configured,
                default = DEFAULT_MEMORY_LIMIT,
                "unrecognized memory limit, using default"
            );
            MemoryLimit::default()
        });
        if let Err(e) = self.sink.set_memory_limit(&memory) {
            tracing::warn!(limit = %memory, error = %e, "could not apply memory limit");
        }

        let time_limit = match global.time() {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        if let Err(e) = self.sink.set_time_limit(time_limit) {
            tracing::warn!(?time_limit, error = %e, "could not apply time limit");
        }

        tracing::debug!(?reporting, memory = %memory, ?time_limit, "execution limits applied");

        ExecutionLimits {
            reporting,
            memory,
            time_limit,
            applied_at: Instant::now(),
        }
    }
}
