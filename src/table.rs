//! The command table: phrases typed by the user, bound to scripts.
//!
//! The table is loaded once from a YAML document shaped like
//!
//! ```yaml
//! ref:
//!   script: scripts/python/ref.py
//!   args: true
//! ref list:
//!   script: scripts/python/ref.py
//!   io: inherit
//! backup:
//!   script: scripts/shell/backup.sh
//! ```
//!
//! and is never mutated while commands are being dispatched.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

/// How a child process's standard streams are wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IoMode {
    /// stdout and stderr are buffered and reported after the child exits.
    Captured,
    /// The child owns the terminal until it exits (pagers, prompts).
    Inherit,
}

/// Interpreter family of a script, derived from its file suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    Python,
    Shell,
}

impl ScriptKind {
    /// `.py` and `.sh` are the only recognised suffixes.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(OsStr::to_str) {
            Some("py") => Some(ScriptKind::Python),
            Some("sh") => Some(ScriptKind::Shell),
            _ => None,
        }
    }

    /// Shell scripts may prompt the user, so they always get the terminal.
    pub fn default_io_mode(self) -> IoMode {
        match self {
            ScriptKind::Python => IoMode::Captured,
            ScriptKind::Shell => IoMode::Inherit,
        }
    }
}

/// What a phrase is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub script: PathBuf,
    /// Whether the command documents itself as taking arguments.
    ///
    /// Residual text is forwarded either way; this only drives `help`.
    pub takes_args: bool,
    pub io_mode: IoMode,
}

impl CommandSpec {
    /// A spec whose I/O mode follows the script's suffix.
    pub fn new(script: impl Into<PathBuf>) -> Self {
        let script = script.into();
        let io_mode = ScriptKind::from_path(&script)
            .map(ScriptKind::default_io_mode)
            .unwrap_or(IoMode::Captured);
        Self {
            script,
            takes_args: false,
            io_mode,
        }
    }

    pub fn taking_args(mut self) -> Self {
        self.takes_args = true;
        self
    }

    pub fn with_io_mode(mut self, io_mode: IoMode) -> Self {
        self.io_mode = io_mode;
        self
    }

    pub fn kind(&self) -> Option<ScriptKind> {
        ScriptKind::from_path(&self.script)
    }

    /// The mode the child actually runs in. Shell scripts always get the
    /// terminal, whatever `io_mode` says.
    pub fn launch_mode(&self) -> IoMode {
        match self.kind() {
            Some(ScriptKind::Shell) => IoMode::Inherit,
            _ => self.io_mode,
        }
    }
}

/// On-disk shape of one table entry.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSpec {
    script: PathBuf,
    #[serde(default)]
    args: Option<serde_yaml::Value>,
    #[serde(default)]
    io: Option<IoMode>,
}

impl From<RawSpec> for CommandSpec {
    fn from(raw: RawSpec) -> Self {
        let mut spec = CommandSpec::new(raw.script);
        spec.takes_args = raw.args.as_ref().is_some_and(is_truthy);
        if let Some(io) = raw.io {
            spec.io_mode = io;
        }
        spec
    }
}

/// Any non-empty value counts as "yes".
fn is_truthy(value: &serde_yaml::Value) -> bool {
    use serde_yaml::Value;
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Sequence(seq) => !seq.is_empty(),
        Value::Mapping(map) => !map.is_empty(),
        Value::Tagged(tagged) => is_truthy(&tagged.value),
    }
}

/// Phrase to [`CommandSpec`] mapping, plus the directory relative script
/// paths are anchored to.
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    entries: BTreeMap<String, CommandSpec>,
    base_dir: Option<PathBuf>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, replacing any previous binding of `phrase`.
    pub fn with(mut self, phrase: impl Into<String>, spec: CommandSpec) -> Self {
        self.entries.insert(phrase.into(), spec);
        self
    }

    /// Anchor relative script paths to `dir` instead of the session's
    /// working directory.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Read and validate a table file. Relative script paths are resolved
    /// against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("can't read command table {}", path.display()))?;
        let table = Self::from_yaml_str(&text)
            .with_context(|| format!("invalid command table {}", path.display()))?;
        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        Ok(table.with_base_dir(base_dir))
    }

    /// Parse a table from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::new());
        }
        let raw: BTreeMap<String, RawSpec> = serde_yaml::from_str(text)?;
        let mut entries = BTreeMap::new();
        for (phrase, spec) in raw {
            if phrase.trim().is_empty() {
                bail!("command phrase must not be empty");
            }
            if phrase.trim() != phrase {
                bail!("command phrase {phrase:?} has surrounding whitespace");
            }
            if spec.script.as_os_str().is_empty() {
                bail!("command {phrase:?} has an empty script path");
            }
            if spec.io == Some(IoMode::Captured)
                && ScriptKind::from_path(&spec.script) == Some(ScriptKind::Shell)
            {
                bail!(
                    "command {phrase:?} runs shell script {}, which always uses the terminal; \
                     `io: captured` is not allowed",
                    spec.script.display()
                );
            }
            entries.insert(phrase, CommandSpec::from(spec));
        }
        Ok(Self {
            entries,
            base_dir: None,
        })
    }

    pub fn get(&self, phrase: &str) -> Option<&CommandSpec> {
        self.entries.get(phrase)
    }

    /// All phrases, in lexical order.
    pub fn phrases(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CommandSpec)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Where the script of `spec` lives. Absolute paths are returned as-is;
    /// relative ones are joined to the table's base directory, or to `cwd`
    /// when the table was not loaded from a file.
    pub fn script_path(&self, spec: &CommandSpec, cwd: &Path) -> PathBuf {
        if spec.script.is_absolute() {
            return spec.script.clone();
        }
        match &self.base_dir {
            Some(base) if base.is_absolute() => base.join(&spec.script),
            Some(base) => cwd.join(base).join(&spec.script),
            None => cwd.join(&spec.script),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
ref:
  script: scripts/python/ref.py
  args: true
ref list:
  script: scripts/python/ref.py
  io: inherit
makepdf:
  script: scripts/python/makepdf.py
  args: "file name"
backup:
  script: scripts/shell/backup.sh
"#;

    #[test]
    fn parses_entries_and_flags() {
        let table = CommandTable::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(table.len(), 4);

        let r = table.get("ref").unwrap();
        assert_eq!(r.script, PathBuf::from("scripts/python/ref.py"));
        assert!(r.takes_args);
        assert_eq!(r.io_mode, IoMode::Captured);

        let list = table.get("ref list").unwrap();
        assert!(!list.takes_args);
        assert_eq!(list.io_mode, IoMode::Inherit);

        assert!(table.get("makepdf").unwrap().takes_args);
    }

    #[test]
    fn shell_scripts_default_to_inherited_io() {
        let table = CommandTable::from_yaml_str(SAMPLE).unwrap();
        let backup = table.get("backup").unwrap();
        assert_eq!(backup.kind(), Some(ScriptKind::Shell));
        assert_eq!(backup.io_mode, IoMode::Inherit);
    }

    #[test]
    fn rejects_captured_shell_script() {
        let err = CommandTable::from_yaml_str("greet: { script: greet.sh, io: captured }")
            .unwrap_err();
        assert!(err.to_string().contains("always uses the terminal"), "{err}");

        let table = CommandTable::from_yaml_str("greet: { script: greet.sh, io: inherit }").unwrap();
        assert_eq!(table.get("greet").unwrap().io_mode, IoMode::Inherit);
    }

    #[test]
    fn shell_scripts_launch_inherited_even_when_built_captured() {
        let spec = CommandSpec::new("greet.sh").with_io_mode(IoMode::Captured);
        assert_eq!(spec.launch_mode(), IoMode::Inherit);

        let spec = CommandSpec::new("ref.py").with_io_mode(IoMode::Inherit);
        assert_eq!(spec.launch_mode(), IoMode::Inherit);
        assert_eq!(CommandSpec::new("ref.py").launch_mode(), IoMode::Captured);
    }

    #[test]
    fn args_truthiness() {
        let table = CommandTable::from_yaml_str(
            r#"
a: { script: a.py, args: "" }
b: { script: b.py, args: 0 }
c: { script: c.py, args: [x] }
d: { script: d.py, args: ~ }
e: { script: e.py, args: false }
"#,
        )
        .unwrap();
        let taking: Vec<&str> = table
            .iter()
            .filter(|(_, spec)| spec.takes_args)
            .map(|(phrase, _)| phrase)
            .collect();
        assert_eq!(taking, vec!["c"]);
    }

    #[test]
    fn rejects_padded_phrase() {
        let err = CommandTable::from_yaml_str("' ref': { script: ref.py }").unwrap_err();
        assert!(err.to_string().contains("whitespace"), "{err}");
    }

    #[test]
    fn rejects_empty_script() {
        assert!(CommandTable::from_yaml_str("ref: { script: '' }").is_err());
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(CommandTable::from_yaml_str("ref: { script: ref.py, pager: yes }").is_err());
    }

    #[test]
    fn empty_document_is_empty_table() {
        assert!(CommandTable::from_yaml_str("  \n").unwrap().is_empty());
    }

    #[test]
    fn unknown_suffix_has_no_kind() {
        assert_eq!(CommandSpec::new("tool.rb").kind(), None);
        assert_eq!(CommandSpec::new("tool").kind(), None);
        assert_eq!(CommandSpec::new("x.py").kind(), Some(ScriptKind::Python));
    }

    #[test]
    fn script_path_resolution() {
        let cwd = Path::new("/home/user");
        let spec = CommandSpec::new("scripts/ref.py");

        let table = CommandTable::new();
        assert_eq!(
            table.script_path(&spec, cwd),
            PathBuf::from("/home/user/scripts/ref.py")
        );

        let table = CommandTable::new().with_base_dir("/opt/jarvis");
        assert_eq!(
            table.script_path(&spec, cwd),
            PathBuf::from("/opt/jarvis/scripts/ref.py")
        );

        let absolute = CommandSpec::new("/usr/local/bin/x.sh");
        assert_eq!(
            table.script_path(&absolute, cwd),
            PathBuf::from("/usr/local/bin/x.sh")
        );
    }

    #[test]
    fn load_anchors_to_file_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("commands.yaml");
        fs::write(&file, "hello: { script: hello.sh }\n").unwrap();

        let table = CommandTable::load(&file).unwrap();
        let spec = table.get("hello").unwrap();
        assert_eq!(
            table.script_path(spec, Path::new("/elsewhere")),
            dir.path().join("hello.sh")
        );
    }

    #[test]
    fn demo_table_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/commands.yaml");
        let table = CommandTable::load(&path).unwrap();
        for (phrase, spec) in table.iter() {
            assert_eq!(spec.launch_mode(), IoMode::Inherit, "{phrase}");
        }
        assert!(table.get("greet").unwrap().takes_args);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = CommandTable::load(Path::new("/nonexistent/commands.yaml")).unwrap_err();
        assert!(err.to_string().contains("can't read command table"));
    }
}
