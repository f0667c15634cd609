//! Exit code constants for the cck-cli tool.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid option values)
//! - 2: Configuration failure (missing or unreadable config file)
//! - 3: Host initialization failure
//! - 4: Authentication failure
//! - 5: Command failure after a successful bootstrap

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid option values.
pub const USER_ERROR: i32 = 1;

/// Configuration failure: a required config file is missing or invalid.
pub const CONFIG_FAILURE: i32 = 2;

/// Host initialization failure: a bootstrap phase could not complete.
pub const HOST_FAILURE: i32 = 3;

/// Authentication failure: the host rejected the configured credentials.
pub const AUTH_FAILURE: i32 = 4;

/// Command failure: the command ran but could not finish its work.
pub const COMMAND_FAILURE: i32 = 5;
