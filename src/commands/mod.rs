//! Command implementations for cck-cli.
//!
//! Every command is a [`CliCommand`] driven through the shared bootstrap
//! by [`Orchestrator::execute`].

mod batch_run;
mod config_show;
mod host_check;

pub use batch_run::BatchRun;
pub use config_show::ConfigShow;
pub use host_check::HostCheck;

use crate::cli::{Cli, Command};
use crate::config::ConfigLoader;
use crate::console::Console;
use crate::environment::ProcessLimits;
use crate::error::Result;
use crate::host::{DeployedHost, HostFramework};
use crate::lifecycle::{BootDeps, CliCommand, Orchestrator};
use crate::profiler::ProcessMemory;
use std::time::Instant;

fn command_for(command: Command) -> Box<dyn CliCommand> {
    match command {
        Command::HostCheck => Box::new(HostCheck),
        Command::ConfigShow(args) => Box::new(ConfigShow::new(args)),
        Command::BatchRun(args) => Box::new(BatchRun::new(args)),
    }
}

/// Bootstrap the deployed host and run the selected command.
///
/// `started` is the process start, used for profiler checkpoints.
pub fn dispatch(cli: Cli, started: Instant) -> Result<()> {
    let verbosity = cli.global.verbosity();
    let orchestrator = Orchestrator::new(ConfigLoader::new(&cli.global.config_dir), started);
    let mut limits = ProcessLimits;
    let deps = BootDeps {
        console: Console::stdout(verbosity),
        limits: &mut limits,
        memory: Box::new(ProcessMemory::new()),
    };

    let mut command = command_for(cli.command);
    orchestrator.execute(
        command.as_mut(),
        cli.global.profile.as_deref(),
        deps,
        |global, limits| {
            let host = DeployedHost::from_config(global)?.with_child_env(limits.child_env());
            Ok(Box::new(host) as Box<dyn HostFramework>)
        },
    )
}
