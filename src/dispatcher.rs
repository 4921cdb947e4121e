//! Turning a resolved phrase into a running command.
//!
//! For script commands the dispatcher builds the argument vector, picks the
//! interpreter from the script's suffix, launches the child in the command's
//! [`IoMode`] and reports what happened. Built-in commands run in-process
//! through the same entry point.

use crate::builtin;
use crate::command::{CommandFactory, ExitCode};
use crate::env::Environment;
use crate::external::{Invocation, Launcher, SystemLauncher};
use crate::resolver::{self, ResolvedCommand};
use crate::style;
use crate::table::{CommandSpec, CommandTable, IoMode, ScriptKind};
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

/// What a dispatched command left behind.
///
/// `stdout` and `stderr` are only filled for [`IoMode::Captured`] commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub exit_code: ExitCode,
    pub stdout: String,
    pub stderr: String,
}

impl DispatchOutcome {
    /// An outcome with an exit code and nothing captured.
    pub fn exited(exit_code: ExitCode) -> Self {
        Self {
            exit_code,
            ..Self::default()
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The key came from somewhere other than this dispatcher's table.
    #[error("no command is bound to {0:?}")]
    UnknownKey(String),
    #[error("Unsupported script type for command '{key}' ({})", .script.display())]
    UnsupportedScript { key: String, script: PathBuf },
    #[error("can't launch '{key}': interpreter {program} not found")]
    LauncherNotFound { key: String, program: String },
    #[error("can't launch '{key}' with {program}: {source}")]
    Spawn {
        key: String,
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("can't write command output: {0}")]
    Output(#[from] io::Error),
}

/// Interpreter programs per script family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreters {
    pub python: String,
    pub shell: String,
}

impl Interpreters {
    pub fn program_for(&self, kind: ScriptKind) -> &str {
        match kind {
            ScriptKind::Python => &self.python,
            ScriptKind::Shell => &self.shell,
        }
    }
}

impl Default for Interpreters {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            shell: "sh".to_string(),
        }
    }
}

/// Split the text after a phrase into argument tokens.
///
/// Words of a multi-word phrase after the first are passed as one leading
/// token, so `"ref list"` with `"cpp"` yields `["list", "cpp"]` and the script
/// can switch on its subcommand.
pub fn build_argv(key: &str, args_text: &str) -> Vec<String> {
    let subcommand = key.split_whitespace().skip(1).collect::<Vec<_>>().join(" ");
    let mut argv = Vec::new();
    if !subcommand.is_empty() {
        argv.push(subcommand);
    }
    argv.extend(args_text.split_whitespace().map(str::to_owned));
    argv
}

/// Runs commands bound in a [`CommandTable`], plus the built-ins.
pub struct Dispatcher {
    table: CommandTable,
    interpreters: Interpreters,
    builtins: Vec<Box<dyn CommandFactory>>,
    launcher: Box<dyn Launcher>,
}

impl Dispatcher {
    /// A dispatcher that launches real processes with the default interpreters.
    pub fn new(table: CommandTable) -> Self {
        Self {
            table,
            interpreters: Interpreters::default(),
            builtins: builtin::default_factories(),
            launcher: Box::new(SystemLauncher),
        }
    }

    pub fn with_interpreters(mut self, interpreters: Interpreters) -> Self {
        self.interpreters = interpreters;
        self
    }

    pub fn with_launcher(mut self, launcher: Box<dyn Launcher>) -> Self {
        self.launcher = launcher;
        self
    }

    /// Resolve a line against table phrases and built-in names together.
    pub fn resolve(&self, text: &str) -> Option<ResolvedCommand> {
        let builtin_names = self.builtins.iter().map(|f| f.name());
        resolver::resolve_among(text, self.table.phrases().chain(builtin_names))
    }

    /// Run the command bound to `key` with `args_text` as its arguments.
    ///
    /// Captured output and exit warnings are written to `out`. A table entry
    /// shadows a built-in of the same name.
    pub fn dispatch(
        &self,
        key: &str,
        args_text: &str,
        env: &mut Environment,
        out: &mut dyn Write,
    ) -> Result<DispatchOutcome, DispatchError> {
        let argv = build_argv(key, args_text);
        debug!(key, ?argv, "dispatching");

        if let Some(spec) = self.table.get(key) {
            return self.run_script(key, spec, argv, env, out);
        }

        let args: Vec<&str> = argv.iter().map(String::as_str).collect();
        let command = self
            .builtins
            .iter()
            .find_map(|factory| factory.try_create(key, &args))
            .ok_or_else(|| DispatchError::UnknownKey(key.to_string()))?;
        let exit_code = match command.execute(out, env, &self.table) {
            Ok(code) => code,
            Err(err) => {
                writeln!(out, "{}", style::failure(format!("{key}: {err:#}")))?;
                1
            }
        };
        out.flush()?;
        Ok(DispatchOutcome::exited(exit_code))
    }

    fn run_script(
        &self,
        key: &str,
        spec: &CommandSpec,
        argv: Vec<String>,
        env: &mut Environment,
        out: &mut dyn Write,
    ) -> Result<DispatchOutcome, DispatchError> {
        let kind = spec.kind().ok_or_else(|| DispatchError::UnsupportedScript {
            key: key.to_string(),
            script: spec.script.clone(),
        })?;
        let program = self.interpreters.program_for(kind).to_string();
        let script = self.table.script_path(spec, &env.current_dir);

        let mut args = Vec::with_capacity(argv.len() + 1);
        args.push(script.to_string_lossy().into_owned());
        args.extend(argv);
        let invocation = Invocation {
            program,
            args,
            io_mode: spec.launch_mode(),
        };

        // Flush our own output before a child takes over the terminal.
        out.flush()?;
        let outcome = self
            .launcher
            .launch(&invocation, env)
            .map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => DispatchError::LauncherNotFound {
                    key: key.to_string(),
                    program: invocation.program.clone(),
                },
                _ => DispatchError::Spawn {
                    key: key.to_string(),
                    program: invocation.program.clone(),
                    source,
                },
            })?;

        if !outcome.success() {
            info!(key, exit_code = outcome.exit_code, "script exited with non-zero status");
        }
        report(&outcome, invocation.io_mode, out)?;
        Ok(outcome)
    }
}

/// Print captured streams, then a warning for a failed exit.
fn report(outcome: &DispatchOutcome, io_mode: IoMode, out: &mut dyn Write) -> io::Result<()> {
    if io_mode == IoMode::Captured {
        let stdout = outcome.stdout.trim();
        if !stdout.is_empty() {
            writeln!(out, "{stdout}")?;
        }
        let stderr = outcome.stderr.trim();
        if !stderr.is_empty() {
            writeln!(out, "{} {stderr}", style::error_label())?;
        }
    }
    if !outcome.success() {
        let message = format!("Script exited with code {}", outcome.exit_code);
        writeln!(out, "{}", style::warning(message))?;
    }
    out.flush()
}
