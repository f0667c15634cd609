//! cck-cli: run administrative commands inside a deployed CMS host.
//!
//! This is the main entry point for the `cck-cli` binary. It parses
//! arguments, dispatches to the selected command and maps errors to
//! process exit codes.

mod cli;
mod commands;
pub mod config;
pub mod console;
pub mod environment;
pub mod error;
pub mod exit_codes;
pub mod host;
pub mod lifecycle;
pub mod logging;
pub mod profiler;
pub mod progress;

#[cfg(test)]
mod test_support;

use cli::Cli;
use error::CliError;
use std::process::ExitCode;
use std::time::Instant;

fn main() -> ExitCode {
    let started = Instant::now();
    let cli = Cli::parse_args();

    match commands::dispatch(cli, started) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Exit carries its own status and has already reported.
            if !matches!(err, CliError::Exit(_)) {
                eprintln!("{} {}", ::console::style("ERROR:").red().bold(), err);
            }
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
