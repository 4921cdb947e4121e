//! Terminal styling for the messages the dispatcher prints itself.
//!
//! Script output is never restyled; only the dispatcher's own warnings and
//! error labels go through here.

use colored::{ColoredString, Colorize};
use std::fmt::Display;

/// Label placed in front of a script's captured stderr.
pub const ERROR_LABEL: &str = "Error:";

pub fn error_label() -> ColoredString {
    ERROR_LABEL.red()
}

/// A recoverable problem: non-zero exits and the like.
pub fn warning(message: impl Display) -> ColoredString {
    format!("⚠️  {message}").yellow()
}

/// A failure that aborted the current command.
pub fn failure(message: impl Display) -> ColoredString {
    message.to_string().red()
}

/// Section headings in `help` output.
pub fn heading(message: impl Display) -> ColoredString {
    message.to_string().bold().cyan()
}

pub fn greeting(message: impl Display) -> ColoredString {
    message.to_string().green()
}
