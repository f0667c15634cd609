//! Console output for command messages.
//!
//! Messages carry a minimal markup kind (info, error, comment). Styling is
//! applied with the `console` crate when the output is a colour terminal.

use crate::error::{CliError, Result};
use console::style;
use std::io::{self, Write};

/// Output verbosity, ordered from least to most output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
    VeryVerbose,
    Debug,
}

impl Verbosity {
    /// Derive the level from the `-q` flag and the number of `-v` flags.
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Verbosity::Quiet;
        }
        match verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            2 => Verbosity::VeryVerbose,
            _ => Verbosity::Debug,
        }
    }

    /// Diagnostic mode: verbose or above.
    pub fn is_diagnostic(self) -> bool {
        self >= Verbosity::Verbose
    }

    pub fn is_quiet(self) -> bool {
        self == Verbosity::Quiet
    }
}

/// Markup kind of a console message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Plain,
    Info,
    Error,
    Comment,
}

/// Line-oriented message sink.
pub struct Console {
    out: Box<dyn Write>,
    verbosity: Verbosity,
    styled: bool,
}

impl Console {
    /// Console writing to stdout, styled when stdout supports colours.
    pub fn stdout(verbosity: Verbosity) -> Self {
        Self {
            out: Box::new(io::stdout()),
            verbosity,
            styled: console::colors_enabled(),
        }
    }

    /// Console writing unstyled lines to an arbitrary sink.
    pub fn with_writer(out: Box<dyn Write>, verbosity: Verbosity) -> Self {
        Self {
            out,
            verbosity,
            styled: false,
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn is_diagnostic(&self) -> bool {
        self.verbosity.is_diagnostic()
    }

    /// Write a single message line. Quiet mode keeps errors only.
    pub fn say(&mut self, message: &str, kind: MessageKind) {
        if self.verbosity.is_quiet() && kind != MessageKind::Error {
            return;
        }

        let line = self.format(message, kind);
        // A closed stdout must not abort the command.
        let _ = writeln!(self.out, "{}", line);
        let _ = self.out.flush();
    }

    /// Write a message, then request termination when `exit_code > 0`.
    ///
    /// The returned [`CliError::Exit`] makes the process exit with exactly
    /// `exit_code`.
    pub fn say_and_exit(&mut self, message: &str, kind: MessageKind, exit_code: u8) -> Result<()> {
        self.say(message, kind);
        if exit_code > 0 {
            return Err(CliError::Exit(exit_code));
        }
        Ok(())
    }

    fn format(&self, message: &str, kind: MessageKind) -> String {
        match kind {
            MessageKind::Plain => message.to_string(),
            MessageKind::Info if self.styled => format!("{} {}", style("INFO:").green(), message),
            MessageKind::Info => format!("INFO: {}", message),
            MessageKind::Error if self.styled => {
                format!("{} {}", style("ERROR:").white().on_red(), message)
            }
            MessageKind::Error => format!("ERROR: {}", message),
            MessageKind::Comment if self.styled => format!(" - {}", style(message).yellow()),
            MessageKind::Comment => format!(" - {}", message),
        }
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("verbosity", &self.verbosity)
            .field("styled", &self.styled)
            .finish()
    }
}
