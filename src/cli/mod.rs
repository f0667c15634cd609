//! CLI argument parsing for cck-cli.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use crate::console::Verbosity;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Run administrative commands inside a deployed CMS host.
///
/// Every command bootstraps the host first: configuration is loaded,
/// execution limits are applied, the host framework is initialized as if
/// serving a request, and the configured admin account is logged in.
#[derive(Parser, Debug)]
#[command(name = "cck-cli")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options accepted by every command.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Directory holding `_global.yaml` and per-command config files.
    #[arg(long, global = true, default_value = "configs")]
    pub config_dir: PathBuf,

    /// Config profile: loads `<command>-<profile>.yaml`, which must exist.
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// Increase verbosity (-v shows profiler checkpoints and debug logs).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only print errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl GlobalArgs {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bootstrap the host and report its state.
    ///
    /// Verifies configuration, host entry points and admin login.
    #[command(name = "host:check")]
    HostCheck,

    /// Show configuration.
    ///
    /// Without TARGET prints the global config with credentials masked;
    /// with TARGET prints that command's config (honouring --target-profile,
    /// or --profile when it is absent).
    #[command(name = "config:show")]
    ConfigShow(ConfigShowArgs),

    /// Run a configured batch step by step with a progress bar.
    ///
    /// Reads `command`, `total`, `step` and `stop_on_error` from the
    /// command config (`batch-run.yaml` or `batch-run-<profile>.yaml`).
    #[command(name = "batch:run")]
    BatchRun(BatchRunArgs),
}

/// Arguments for the `config:show` command.
#[derive(Parser, Debug)]
pub struct ConfigShowArgs {
    /// Command whose config should be shown (e.g. `batch:run`).
    pub target: Option<String>,

    /// Profile of TARGET's config. Defaults to --profile.
    #[arg(long, requires = "target")]
    pub target_profile: Option<String>,

    /// Print JSON instead of YAML.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `batch:run` command.
#[derive(Parser, Debug)]
pub struct BatchRunArgs {
    /// Override the configured total.
    #[arg(long)]
    pub total: Option<u64>,

    /// Override the configured step.
    #[arg(long)]
    pub step: Option<u64>,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
