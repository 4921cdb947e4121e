use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::env::Environment;
use crate::style;
use crate::table::{CommandTable, IoMode};
use anyhow::Result;
use argh::{EarlyExit, FromArgs};
use std::io::Write;
use std::marker::PhantomData;

/// Commands that live inside the dispatcher rather than in a script.
///
/// Builtins are parsed with [`argh`] (`FromArgs`) and executed in-process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// The phrase that selects the command, e.g. "help".
    fn name() -> &'static str;

    /// Return value follows the script convention: 0 for success.
    fn execute(
        self,
        stdout: &mut dyn Write,
        env: &mut Environment,
        table: &CommandTable,
    ) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        env: &mut Environment,
        table: &CommandTable,
    ) -> Result<ExitCode> {
        <T as BuiltinCommand>::execute(*self, stdout, env, table)
    }
}

/// Usage text or a parse error produced by `argh` instead of a command.
struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        _env: &mut Environment,
        _table: &CommandTable,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{}", self.output.trim_end())?;
        Ok(if self.is_error { 1 } else { 0 })
    }
}

/// Creates instances of the builtin `T`.
pub(crate) struct Factory<T> {
    _phantom: PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn name(&self) -> &'static str {
        T::name()
    }

    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        if name != T::name() {
            return None;
        }
        Some(match T::from_args(&[name], args) {
            Ok(cmd) => Box::new(cmd),
            Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                output,
                is_error: status.is_err(),
            }),
        })
    }
}

/// `help`, `exit` and `quit`.
pub(crate) fn default_factories() -> Vec<Box<dyn CommandFactory>> {
    vec![
        Box::new(Factory::<Help>::default()),
        Box::new(Factory::<Exit>::default()),
        Box::new(Factory::<Quit>::default()),
    ]
}

#[derive(FromArgs)]
/// List the commands this session understands.
pub struct Help {}

impl BuiltinCommand for Help {
    fn name() -> &'static str {
        "help"
    }

    fn execute(
        self,
        stdout: &mut dyn Write,
        _env: &mut Environment,
        table: &CommandTable,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{}", style::heading("Commands"))?;
        if table.is_empty() {
            writeln!(stdout, "  (none registered)")?;
        }
        let width = table.phrases().map(|p| p.len() + 7).max().unwrap_or(0);
        for (phrase, spec) in table.iter() {
            let usage = if spec.takes_args {
                format!("{phrase} <args>")
            } else {
                phrase.to_string()
            };
            let terminal = match spec.launch_mode() {
                IoMode::Inherit => " [interactive]",
                IoMode::Captured => "",
            };
            writeln!(
                stdout,
                "  {usage:<width$}  {}{terminal}",
                spec.script.display()
            )?;
        }

        let mut builtins: Vec<&str> = default_factories().iter().map(|f| f.name()).collect();
        builtins.sort_unstable();
        writeln!(stdout, "{}", style::heading("Built-ins"))?;
        writeln!(stdout, "  {}", builtins.join(", "))?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Leave the session.
pub struct Exit {}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(
        self,
        _stdout: &mut dyn Write,
        env: &mut Environment,
        _table: &CommandTable,
    ) -> Result<ExitCode> {
        env.request_exit();
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Leave the session.
pub struct Quit {}

impl BuiltinCommand for Quit {
    fn name() -> &'static str {
        "quit"
    }

    fn execute(
        self,
        _stdout: &mut dyn Write,
        env: &mut Environment,
        _table: &CommandTable,
    ) -> Result<ExitCode> {
        env.request_exit();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::CommandSpec;

    fn run(name: &str, args: &[&str], env: &mut Environment, table: &CommandTable) -> (ExitCode, String) {
        let factories = default_factories();
        let cmd = factories
            .iter()
            .find_map(|f| f.try_create(name, args))
            .expect("builtin should exist");
        let mut out = Vec::new();
        let code = cmd.execute(&mut out, env, table).unwrap();
        (code, String::from_utf8(out).unwrap())
    }

    #[test]
    fn help_lists_table_and_builtins() {
        let table = CommandTable::new()
            .with("ref", CommandSpec::new("scripts/ref.py").taking_args())
            .with("backup", CommandSpec::new("scripts/backup.sh"));
        let mut env = Environment::empty("/");

        let (code, out) = run("help", &[], &mut env, &table);

        assert_eq!(code, 0);
        assert!(out.contains("ref <args>"), "{out}");
        assert!(out.contains("scripts/ref.py"), "{out}");
        assert!(out.contains("scripts/backup.sh [interactive]"), "{out}");
        assert!(out.contains("exit, help, quit"), "{out}");
        assert!(out.find("backup").unwrap() < out.find("ref").unwrap());
    }

    #[test]
    fn help_on_empty_table() {
        let mut env = Environment::empty("/");
        let (_, out) = run("help", &[], &mut env, &CommandTable::new());
        assert!(out.contains("(none registered)"), "{out}");
    }

    #[test]
    fn help_rejects_arguments() {
        let mut env = Environment::empty("/");
        let (code, out) = run("help", &["everything"], &mut env, &CommandTable::new());
        assert_eq!(code, 1);
        assert!(!out.is_empty());
    }

    #[test]
    fn exit_and_quit_set_flag() {
        for name in ["exit", "quit"] {
            let mut env = Environment::empty("/");
            let (code, _) = run(name, &[], &mut env, &CommandTable::new());
            assert_eq!(code, 0);
            assert!(env.should_exit, "{name}");
        }
    }

    #[test]
    fn factories_ignore_other_names() {
        let factory = Factory::<Help>::default();
        assert!(factory.try_create("ref", &[]).is_none());
        assert_eq!(factory.name(), "help");
    }
}
