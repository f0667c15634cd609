//! Error types for the cck-cli tool.
//!
//! Uses thiserror for derive macros. Every bootstrap failure is fatal and
//! carries a user-actionable message.

use crate::exit_codes;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for cck-cli operations.
///
/// Each variant maps to a specific process exit code.
#[derive(Error, Debug)]
pub enum CliError {
    /// A required configuration file is absent.
    #[error("Config file \"{}\" not found", .0.display())]
    ConfigMissing(PathBuf),

    /// A configuration file exists but cannot be used.
    #[error("Invalid config: {0}")]
    ConfigInvalid(String),

    /// A host bootstrap phase failed.
    #[error("Host initialization failed: {0}")]
    HostInit(String),

    /// The host rejected the configured credentials.
    #[error("{0}")]
    Auth(String),

    /// User provided invalid arguments.
    #[error("{0}")]
    UserError(String),

    /// A command ran after a successful bootstrap but could not finish.
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// Explicit termination requested with an exact exit status.
    #[error("terminated with exit code {0}")]
    Exit(u8),
}

impl CliError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::ConfigMissing(_) => exit_codes::CONFIG_FAILURE,
            CliError::ConfigInvalid(_) => exit_codes::CONFIG_FAILURE,
            CliError::HostInit(_) => exit_codes::HOST_FAILURE,
            CliError::Auth(_) => exit_codes::AUTH_FAILURE,
            CliError::UserError(_) => exit_codes::USER_ERROR,
            CliError::CommandFailed(_) => exit_codes::COMMAND_FAILURE,
            CliError::Exit(code) => i32::from(*code),
        }
    }
}

/// Result type alias for cck-cli operations.
pub type Result<T> = std::result::Result<T, CliError>;
