use crate::command::ExitCode;
use crate::dispatcher::{DispatchError, DispatchOutcome, Dispatcher};
use crate::env::Environment;
use crate::style;
use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{debug, error, warn};

const PROMPT: &str = "Jarvis > ";
const GREETING: &str = "Welcome Sir! , What do we have for today";

/// Whether the prompt loop should keep reading after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStatus {
    Continue,
    Exit,
}

/// An interactive session: one [`Dispatcher`], one [`Environment`] and the
/// console they print to.
///
/// Example
/// ```
/// use jarvis::{Dispatcher, LineStatus, Session};
/// use jarvis::io_adapters::MemWriter;
/// use jarvis::table::CommandTable;
///
/// let (out, handle) = MemWriter::with_handle();
/// let mut session = Session::new(Dispatcher::new(CommandTable::new())).with_output(Box::new(out));
/// assert_eq!(session.handle_line("what is this"), LineStatus::Continue);
/// assert_eq!(session.handle_line("quit"), LineStatus::Exit);
/// assert!(MemWriter::contents(&handle).is_empty());
/// ```
pub struct Session {
    env: Environment,
    dispatcher: Dispatcher,
    out: Box<dyn Write>,
    history: Option<PathBuf>,
}

impl Session {
    /// A session printing to stdout with a snapshot of the process environment.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            env: Environment::new(),
            dispatcher,
            out: Box::new(io::stdout()),
            history: None,
        }
    }

    pub fn with_output(mut self, out: Box<dyn Write>) -> Self {
        self.out = out;
        self
    }

    pub fn with_environment(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    /// Persist line-editor history in `path` across sessions.
    pub fn with_history(mut self, path: impl Into<PathBuf>) -> Self {
        self.history = Some(path.into());
        self
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Resolve and dispatch one line without reporting failures.
    ///
    /// `Ok(None)` means the line matched no phrase and nothing ran.
    pub fn execute(&mut self, line: &str) -> Result<Option<DispatchOutcome>, DispatchError> {
        let Some(resolved) = self.dispatcher.resolve(line) else {
            debug!(line, "no command matched");
            return Ok(None);
        };
        debug!(key = %resolved.key, args = %resolved.args_text, "resolved");
        self.dispatcher
            .dispatch(&resolved.key, &resolved.args_text, &mut self.env, &mut self.out)
            .map(Some)
    }

    /// Handle one line typed at the prompt. Dispatch failures are printed,
    /// never returned; the session always survives them.
    pub fn handle_line(&mut self, line: &str) -> LineStatus {
        if let Err(err) = self.execute(line) {
            self.report_error(&err);
        }
        if self.env.should_exit {
            LineStatus::Exit
        } else {
            LineStatus::Continue
        }
    }

    /// Print a dispatch failure to the session's console.
    pub fn report_error(&mut self, err: &DispatchError) {
        let message = match err {
            DispatchError::UnknownKey(_) => {
                error!(%err, "resolved command is missing from the dispatcher");
                format!("internal error: {err}")
            }
            _ => {
                warn!(%err, "command failed");
                err.to_string()
            }
        };
        self.print_failure(message);
    }

    fn print_failure(&mut self, message: String) {
        if let Err(write_err) = writeln!(self.out, "{}", style::failure(message)) {
            warn!(%write_err, "can't write to console");
        }
    }

    /// Run a single line non-interactively and return the exit code to
    /// propagate: the child's code, 1 for a dispatch failure, 127 when the
    /// line matched nothing.
    pub fn run_once(&mut self, line: &str) -> ExitCode {
        match self.execute(line) {
            Ok(Some(outcome)) => outcome.exit_code,
            Ok(None) => {
                let message = format!("unrecognized command: {}", line.trim());
                self.print_failure(message);
                127
            }
            Err(err) => {
                self.report_error(&err);
                1
            }
        }
    }

    /// Read-eval-print loop on the controlling terminal.
    pub fn repl(&mut self) -> Result<()> {
        let mut rl = DefaultEditor::new()?;
        if let Some(path) = &self.history {
            if let Err(err) = rl.load_history(path) {
                debug!(path = %path.display(), %err, "no history loaded");
            }
        }

        writeln!(self.out, "{}", style::greeting(GREETING))?;
        while !self.env.should_exit {
            match rl.readline(PROMPT) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                    }
                    if self.handle_line(&line) == LineStatus::Exit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    writeln!(self.out, "Interrupted")?;
                    break;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err.into()),
            }
        }

        if let Some(path) = &self.history {
            if let Err(err) = rl.save_history(path) {
                warn!(path = %path.display(), %err, "can't save history");
            }
        }
        Ok(())
    }
}
