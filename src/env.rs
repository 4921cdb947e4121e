use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Process state a session hands to the scripts it launches.
///
/// - `vars`: variables exported to every child process.
/// - `current_dir`: the working directory children start in.
/// - `should_exit`: set by `exit`/`quit`; the prompt loop stops once it is true.
#[derive(Debug, Clone)]
pub struct Environment {
    pub vars: HashMap<String, String>,
    pub current_dir: PathBuf,
    pub should_exit: bool,
}

impl Environment {
    /// Snapshot the current process: its variables and working directory.
    pub fn new() -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars: stdenv::vars().collect(),
            current_dir,
            should_exit: false,
        }
    }

    /// An environment with no variables, rooted at `current_dir`.
    pub fn empty(current_dir: impl Into<PathBuf>) -> Self {
        Self {
            vars: HashMap::new(),
            current_dir: current_dir.into(),
            should_exit: false,
        }
    }

    /// Look up a variable, falling back to the live process environment.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Ask the prompt loop to stop after the current line.
    pub fn request_exit(&mut self) {
        self.should_exit = true;
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
