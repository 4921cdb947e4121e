use crate::command::ExitCode;
use crate::dispatcher::DispatchOutcome;
use crate::env::Environment;
use crate::table::IoMode;
use std::ffi::OsStr;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use tracing::debug;

/// A fully decided child process: `<program> <args...>` with its I/O wiring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Interpreter to run, either a bare name looked up in PATH or a path.
    pub program: String,
    /// Script path first, then the user's arguments.
    pub args: Vec<String>,
    pub io_mode: IoMode,
}

/// Something that can run an [`Invocation`] to completion.
///
/// The dispatcher only talks to this trait, which keeps the spawning side
/// replaceable in tests.
pub trait Launcher {
    /// Run the child and block until it exits.
    ///
    /// An `Err` means no child ran (interpreter missing, permission denied);
    /// a child that ran and failed is an `Ok` with a non-zero exit code.
    fn launch(&self, invocation: &Invocation, env: &Environment) -> io::Result<DispatchOutcome>;
}

/// Launches real child processes with [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn launch(&self, invocation: &Invocation, env: &Environment) -> io::Result<DispatchOutcome> {
        let search_paths = env.get_var("PATH").unwrap_or_default();
        let program = locate_program(
            OsStr::new(&search_paths),
            &env.current_dir,
            Path::new(&invocation.program),
        )
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found in PATH", invocation.program),
            )
        })?;
        debug!(program = %program.display(), args = ?invocation.args, io_mode = ?invocation.io_mode, "spawning");

        let mut cmd = Command::new(&program);
        cmd.args(&invocation.args)
            .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&env.current_dir)
            .stdin(Stdio::inherit());

        match invocation.io_mode {
            IoMode::Captured => {
                let output = cmd.stdout(Stdio::piped()).stderr(Stdio::piped()).output()?;
                Ok(DispatchOutcome {
                    exit_code: exit_code(output.status),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                })
            }
            IoMode::Inherit => {
                let status = cmd
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit())
                    .status()?;
                Ok(DispatchOutcome::exited(exit_code(status)))
            }
        }
    }
}

/// Children killed by a signal report `128 + signal`, like a shell's `$?`.
fn exit_code(status: ExitStatus) -> ExitCode {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

/// Where `program` lives, as seen by a child started in `cwd`.
///
/// A bare name is looked up in `search_paths`, skipping entries that are not
/// executable. Anything with more than one component is taken relative to
/// `cwd` (absolute paths stay as they are).
pub fn locate_program(search_paths: &OsStr, cwd: &Path, program: &Path) -> Option<PathBuf> {
    let mut components = program.components();
    match (components.next(), components.next()) {
        (None, _) => None,
        (Some(Component::Normal(name)), None) => std::env::split_paths(search_paths)
            .map(|dir| dir.join(name))
            .find(|candidate| is_executable(candidate)),
        _ => {
            let candidate = cwd.join(program);
            candidate.is_file().then_some(candidate)
        }
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
