//! Step-wise execution loop with visual progress feedback.

use crate::console::{Console, MessageKind, Verbosity};
use crate::error::{CliError, Result};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// A visual progress indicator.
pub trait ProgressIndicator {
    /// Show the indicator scaled to `total`.
    fn display(&mut self, total: u64);
    /// Render every `updates` progress updates.
    fn set_redraw_frequency(&mut self, updates: u64);
    fn set_progress(&mut self, position: u64);
    /// Mark the indicator complete.
    fn finish(&mut self);
}

/// `indicatif` bar drawn to stderr. Hidden in quiet mode.
pub struct TerminalProgress {
    bar: ProgressBar,
    redraw_every: u64,
    updates: u64,
    last_position: u64,
}

impl TerminalProgress {
    pub fn new(verbosity: Verbosity) -> Self {
        let target = if verbosity.is_quiet() {
            ProgressDrawTarget::hidden()
        } else {
            ProgressDrawTarget::stderr()
        };
        let bar = ProgressBar::with_draw_target(Some(0), target);
        bar.set_style(
            ProgressStyle::with_template("{pos:>7}/{len:7} [{bar:40.cyan/blue}] {percent:>3}%")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        Self {
            bar,
            redraw_every: 1,
            updates: 0,
            last_position: 0,
        }
    }
}

impl ProgressIndicator for TerminalProgress {
    fn display(&mut self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.last_position = 0;
    }

    fn set_redraw_frequency(&mut self, updates: u64) {
        self.redraw_every = updates.max(1);
    }

    fn set_progress(&mut self, position: u64) {
        self.updates += 1;
        self.last_position = position;
        if self.updates % self.redraw_every == 0 {
            self.bar.set_position(position);
        }
    }

    fn finish(&mut self) {
        self.bar.set_position(self.last_position);
        self.bar.finish();
    }
}

/// Loop state. `current` never exceeds `total` and never decreases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressState {
    pub current: u64,
    pub step: u64,
    pub total: u64,
    /// Number of callback invocations.
    pub calls: u64,
    /// Whether the callback asked to stop.
    pub cancelled: bool,
}

/// Drives a bounded callback loop with a progress indicator.
///
/// Each iteration reports `current_step * step` as progress. For `step > 1`
/// this grows faster than the step index, so the loop ends after roughly
/// `total / step^2` calls rather than `total / step`. Callers needing exact
/// iteration counts should use `step = 1`.
pub struct ProgressRunner<I: ProgressIndicator> {
    indicator: I,
}

impl<I: ProgressIndicator> ProgressRunner<I> {
    pub fn new(indicator: I) -> Self {
        Self { indicator }
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    /// Run `callback(current_step)` for `current_step = 0, step, 2*step, ...`.
    ///
    /// The loop stops as soon as the callback returns `false` or the
    /// reported progress reaches `total`. The indicator is finished exactly
    /// once on every exit path.
    pub fn run<F>(
        &mut self,
        console: &mut Console,
        name: &str,
        total: u64,
        step: u64,
        mut callback: F,
    ) -> Result<ProgressState>
    where
        F: FnMut(u64) -> bool,
    {
        if step == 0 {
            return Err(CliError::UserError(format!(
                "progress step for '{}' must be greater than 0",
                name
            )));
        }

        console.say(
            &format!(
                "Current progress of {} (Wait! or `Ctrl+C` to cancel):",
                name
            ),
            MessageKind::Plain,
        );

        self.indicator.display(total);
        self.indicator.set_redraw_frequency(1);

        let mut state = ProgressState {
            current: 0,
            step,
            total,
            calls: 0,
            cancelled: false,
        };

        let mut current_step = 0u64;
        while current_step <= total {
            state.current = current_step;
            let current_progress = current_step.saturating_mul(step);

            state.calls += 1;
            if !callback(current_step) {
                state.cancelled = true;
                break;
            }
            if current_progress >= total {
                break;
            }

            self.indicator.set_progress(current_progress);

            current_step = match current_step.checked_add(step) {
                Some(next) => next,
                None => break,
            };
        }

        self.indicator.finish();
        console.say("", MessageKind::Plain);

        tracing::debug!(
            name,
            calls = state.calls,
            last_step = state.current,
            cancelled = state.cancelled,
            "progress loop finished"
        );
        Ok(state)
    }
}
