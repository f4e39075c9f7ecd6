//! # Output
//!
//! User-facing messages. Diagnostics go through `log`; everything a user is
//! meant to read goes through a [`Reporter`], which applies quiet mode and
//! colors the message prefixes.

use colored::Colorize;
use std::cell::{Cell, RefCell};
use std::fmt::Display;

/// How much the reporter prints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// Only errors. Command output written through [`Reporter::line`] is
    /// dropped too, including `help`, `cli info` and `core version`.
    Quiet,
    #[default]
    Normal,
    /// Normal output plus debug notes on stderr.
    Debug,
}

impl Verbosity {
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if debug {
            Self::Debug
        } else {
            Self::Normal
        }
    }
}

/// Prints user-facing messages, or records them when built with
/// [`Reporter::capturing`].
#[derive(Debug, Default)]
pub struct Reporter {
    verbosity: Cell<Verbosity>,
    captured: Option<RefCell<Vec<String>>>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A reporter that keeps every message in memory instead of printing it.
    pub fn capturing() -> Self {
        Self {
            verbosity: Cell::new(Verbosity::Normal),
            captured: Some(RefCell::new(Vec::new())),
        }
    }

    pub fn set_verbosity(&self, verbosity: Verbosity) {
        self.verbosity.set(verbosity);
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity.get()
    }

    /// Messages recorded so far by a capturing reporter.
    pub fn captured(&self) -> Vec<String> {
        self.captured
            .as_ref()
            .map(|lines| lines.borrow().clone())
            .unwrap_or_default()
    }

    /// Plain output on stdout.
    pub fn line(&self, message: impl Display) {
        if self.verbosity() == Verbosity::Quiet {
            return;
        }
        if !self.capture(message.to_string()) {
            println!("{}", message);
        }
    }

    pub fn success(&self, message: impl Display) {
        if self.verbosity() == Verbosity::Quiet {
            return;
        }
        if !self.capture(format!("Success: {}", message)) {
            println!("{}: {}", "Success".green().bold(), message);
        }
    }

    pub fn warning(&self, message: impl Display) {
        if self.verbosity() == Verbosity::Quiet {
            return;
        }
        if !self.capture(format!("Warning: {}", message)) {
            eprintln!("{}: {}", "Warning".yellow().bold(), message);
        }
    }

    /// Errors are printed even in quiet mode.
    pub fn error(&self, message: impl Display) {
        if !self.capture(format!("Error: {}", message)) {
            eprintln!("\n{}: {}", "Error".red().bold(), message);
        }
    }

    pub fn debug(&self, message: impl Display) {
        if self.verbosity() != Verbosity::Debug {
            return;
        }
        if !self.capture(format!("Debug: {}", message)) {
            eprintln!("{} {}", "[debug]".dimmed(), message);
        }
    }

    fn capture(&self, line: String) -> bool {
        match &self.captured {
            Some(lines) => {
                lines.borrow_mut().push(line);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_keeps_only_errors() {
        let reporter = Reporter::capturing();
        reporter.set_verbosity(Verbosity::from_flags(true, true));
        reporter.line("hello");
        reporter.warning("careful");
        reporter.error("broken");
        assert_eq!(reporter.captured(), vec!["Error: broken"]);
    }

    #[test]
    fn test_debug_notes_need_debug_verbosity() {
        let reporter = Reporter::capturing();
        reporter.debug("hidden");
        reporter.set_verbosity(Verbosity::Debug);
        reporter.debug("shown");
        reporter.success("done");
        assert_eq!(reporter.captured(), vec!["Debug: shown", "Success: done"]);
    }
}
