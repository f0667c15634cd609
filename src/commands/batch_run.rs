//! Implementation of the `batch:run` command.
//!
//! Runs a configured shell command once per progress step inside the host
//! root, with the emulated request environment exported.

use crate::cli::BatchRunArgs;
use crate::console::MessageKind;
use crate::error::{CliError, Result};
use crate::exit_codes;
use crate::lifecycle::{CliCommand, CommandContext};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::{Command, Stdio};

/// Placeholder replaced by the current step index.
const STEP_PLACEHOLDER: &str = "{step}";

/// Resolved from the command config in `before_run`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BatchPlan {
    command: String,
    total: u64,
    step: u64,
    stop_on_error: bool,
}

pub struct BatchRun {
    args: BatchRunArgs,
    plan: Option<BatchPlan>,
}

impl BatchRun {
    pub const NAME: &'static str = "batch:run";

    pub fn new(args: BatchRunArgs) -> Self {
        Self { args, plan: None }
    }
}

#[derive(Debug, Default)]
struct BatchOutcome {
    processed: u64,
    failed: u64,
    deadline_hit: bool,
}

impl CliCommand for BatchRun {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn before_run(&mut self, ctx: &mut CommandContext) -> Result<()> {
        let config = &ctx.config;
        let command = config
            .find_str("command")
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| CliError::ConfigInvalid("batch:run requires `command`".to_string()))?;
        let total = match self.args.total {
            Some(total) => total,
            None => config.find_u64("total").ok_or_else(|| {
                CliError::ConfigInvalid(
                    "batch:run requires `total` (or pass --total)".to_string(),
                )
            })?,
        };
        let step = self.args.step.or_else(|| config.find_u64("step")).unwrap_or(1);
        let stop_on_error = config.find_bool("stop_on_error").unwrap_or(true);

        tracing::debug!(%command, total, step, stop_on_error, "batch plan resolved");
        self.plan = Some(BatchPlan {
            command,
            total,
            step,
            stop_on_error,
        });
        Ok(())
    }

    fn run(&mut self, ctx: &mut CommandContext) -> Result<()> {
        let plan = self
            .plan
            .clone()
            .ok_or_else(|| CliError::CommandFailed("batch plan was not resolved".to_string()))?;
        let mut env = ctx.host.request().env_vars();
        env.extend(ctx.limits.child_env());
        let root = ctx.host.root().to_path_buf();
        let limits = ctx.limits.clone();

        let mut outcome = BatchOutcome::default();
        let mut failures = Vec::new();
        ctx.progress("batch", plan.total, plan.step, |step| {
            if limits.is_time_exceeded() {
                outcome.deadline_hit = true;
                return false;
            }
            outcome.processed += 1;
            match run_step(&plan.command, step, &root, &env) {
                Ok(()) => true,
                Err(e) => {
                    outcome.failed += 1;
                    failures.push(format!("Step {} failed: {}", step, e));
                    !plan.stop_on_error
                }
            }
        })?;

        for failure in &failures {
            ctx.say(failure, MessageKind::Error);
        }
        ctx.say(
            &format!(
                "Processed {} step(s), {} failed",
                outcome.processed, outcome.failed
            ),
            MessageKind::Info,
        );

        let exit_code = exit_codes::COMMAND_FAILURE as u8;
        if outcome.deadline_hit {
            return ctx.console.say_and_exit(
                "Time limit reached before the batch completed",
                MessageKind::Error,
                exit_code,
            );
        }
        if outcome.failed > 0 {
            let summary = format!("{} of {} step(s) failed", outcome.failed, outcome.processed);
            return ctx
                .console
                .say_and_exit(&summary, MessageKind::Error, exit_code);
        }
        Ok(())
    }
}

fn run_step(template: &str, step: u64, root: &Path, env: &BTreeMap<String, String>) -> Result<()> {
    let command_str = template.replace(STEP_PLACEHOLDER, &step.to_string());
    let args = shell_words::split(&command_str).map_err(|e| {
        CliError::ConfigInvalid(format!(
            "failed to parse batch command '{}': {}",
            command_str, e
        ))
    })?;
    let Some((program, rest)) = args.split_first() else {
        return Err(CliError::ConfigInvalid(format!(
            "batch command is empty after parsing: '{}'",
            command_str
        )));
    };

    let output = Command::new(program)
        .args(rest)
        .current_dir(root)
        .envs(env)
        .env("CCK_STEP", step.to_string())
        .stdin(Stdio::null())
        .output()
        .map_err(|e| {
            CliError::CommandFailed(format!("failed to execute '{}': {}", program, e))
        })?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    tracing::warn!(
        step,
        command = %command_str,
        status = ?output.status.code(),
        stderr = %stderr.trim(),
        "batch step failed"
    );
    Err(CliError::CommandFailed(match output.status.code() {
        Some(code) => format!("'{}' exited with status {}", command_str, code),
        None => format!("'{}' was terminated by a signal", command_str),
    }))
}
