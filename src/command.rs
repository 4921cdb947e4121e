use crate::env::Environment;
use crate::table::CommandTable;
use anyhow::Result;
use std::io::Write;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure,
/// the same convention the invoked scripts follow.
pub type ExitCode = i32;

/// Object-safe trait for a command that runs inside the dispatcher process.
///
/// Script commands are launched as child processes instead; see
/// [`Dispatcher`](crate::Dispatcher).
pub trait ExecutableCommand {
    /// Runs the command, writing anything user-visible to `stdout`.
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        env: &mut Environment,
        table: &CommandTable,
    ) -> Result<ExitCode>;
}

/// Factory that creates an in-process command from its name and arguments.
pub trait CommandFactory {
    /// The phrase this factory answers to.
    fn name(&self) -> &'static str;

    /// Attempt to create a command instance for the provided name and arguments.
    ///
    /// Returns `None` when `name` is not this factory's phrase.
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>>;
}
