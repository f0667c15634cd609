//! Memory and elapsed-time checkpoints, shown only in diagnostic mode.

use std::fmt;
use std::time::Instant;
use sysinfo::{Pid, System};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Source of the current process's resident memory.
pub trait MemorySource {
    /// Resident set size in bytes, if it can be determined.
    fn resident_bytes(&mut self) -> Option<u64>;

    /// Peak resident set size of the process so far, in bytes.
    fn peak_bytes(&mut self) -> Option<u64>;
}

/// Reads the current process's resident memory through `sysinfo`.
pub struct ProcessMemory {
    system: System,
    pid: Option<Pid>,
}

impl ProcessMemory {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            pid: sysinfo::get_current_pid().ok(),
        }
    }
}

impl Default for ProcessMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySource for ProcessMemory {
    fn resident_bytes(&mut self) -> Option<u64> {
        let pid = self.pid?;
        if !self.system.refresh_process(pid) {
            return None;
        }
        self.system.process(pid).map(|p| p.memory())
    }

    #[cfg(unix)]
    fn peak_bytes(&mut self) -> Option<u64> {
        use nix::sys::resource::{UsageWho, getrusage};

        let usage = getrusage(UsageWho::RUSAGE_SELF).ok()?;
        let max_rss = u64::try_from(usage.max_rss()).ok()?;
        // macOS reports bytes, other Unixes kilobytes.
        if cfg!(target_os = "macos") {
            Some(max_rss)
        } else {
            Some(max_rss * 1024)
        }
    }

    #[cfg(not(unix))]
    fn peak_bytes(&mut self) -> Option<u64> {
        None
    }
}

/// A point-in-time snapshot. Emitted immediately, never retained.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfilerSample {
    pub memory_mb: f64,
    pub peak_mb: f64,
    pub elapsed_secs: f64,
    pub label: String,
}

impl fmt::Display for ProfilerSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Memory: {:.2}MB  Mem.Peak: {:.2}MB  Time: {:.2}s  ({})",
            self.memory_mb, self.peak_mb, self.elapsed_secs, self.label
        )
    }
}

/// Samples memory and elapsed time at named checkpoints.
pub struct Profiler {
    started: Instant,
    enabled: bool,
    memory: Box<dyn MemorySource>,
    peak_bytes: u64,
}

impl Profiler {
    /// `started` is the process start; `enabled` is diagnostic mode.
    pub fn new(started: Instant, enabled: bool, memory: Box<dyn MemorySource>) -> Self {
        Self {
            started,
            enabled,
            memory,
            peak_bytes: 0,
        }
    }

    /// Take a sample, or `None` when diagnostics are disabled.
    ///
    /// Peak memory is the process peak reported by the memory source, never below
    /// any value sampled so far.
    pub fn sample(&mut self, label: &str) -> Option<ProfilerSample> {
        if !self.enabled {
            return None;
        }

        let current = self.memory.resident_bytes().unwrap_or(0);
        let reported_peak = self.memory.peak_bytes().unwrap_or(0);
        self.peak_bytes = self.peak_bytes.max(current).max(reported_peak);

        let sample = ProfilerSample {
            memory_mb: round2(current as f64 / BYTES_PER_MB),
            peak_mb: round2(self.peak_bytes as f64 / BYTES_PER_MB),
            elapsed_secs: round2(self.started.elapsed().as_secs_f64()),
            label: label.to_string(),
        };
        tracing::debug!(
            label,
            memory_mb = sample.memory_mb,
            peak_mb = sample.peak_mb,
            elapsed_secs = sample.elapsed_secs,
            "profiler checkpoint"
        );
        Some(sample)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
