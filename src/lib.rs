//! A small phrase-driven script dispatcher.
//!
//! A line of text typed by the user is matched against a table of command
//! phrases (see [`table`]), the longest matching phrase wins (see [`resolver`]),
//! and the script bound to it is launched under the right interpreter with the
//! rest of the line as arguments (see [`dispatcher`]).
//!
//! The main entry point is [`Session`], which wires a loaded
//! [`CommandTable`](table::CommandTable) to a [`Dispatcher`] and drives the
//! interactive prompt.

mod builtin;
pub mod command;
pub mod dispatcher;
pub mod env;
mod external;
mod interpreter;
pub mod io_adapters;
pub mod resolver;
pub mod style;
pub mod table;

pub use dispatcher::{DispatchError, DispatchOutcome, Dispatcher, Interpreters};
pub use external::{Invocation, Launcher, SystemLauncher};
pub use interpreter::{LineStatus, Session};
