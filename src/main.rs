use anyhow::Result;
use argh::FromArgs;
use jarvis::table::CommandTable;
use jarvis::{Dispatcher, Interpreters, Session};
use std::path::PathBuf;
use tracing::{debug, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// Type a phrase, run the script bound to it.
struct Args {
    /// command table to load (YAML)
    #[argh(option, short = 'c', default = "PathBuf::from(\"commands.yaml\")")]
    commands: PathBuf,

    /// interpreter for .py scripts
    #[argh(option, default = "String::from(\"python3\")")]
    python: String,

    /// interpreter for .sh scripts
    #[argh(option, default = "String::from(\"sh\")")]
    shell: String,

    /// file to keep prompt history in
    #[argh(option)]
    history: Option<PathBuf>,

    /// log dispatch decisions to stderr
    #[argh(switch, short = 'v')]
    verbose: bool,

    /// run this phrase once instead of starting the prompt
    #[argh(positional, greedy)]
    line: Vec<String>,
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args: Args = argh::from_env();
    init_logging(args.verbose);

    let table = CommandTable::load(&args.commands)?;
    debug!(commands = table.len(), path = %args.commands.display(), "command table loaded");

    let dispatcher = Dispatcher::new(table).with_interpreters(Interpreters {
        python: args.python,
        shell: args.shell,
    });
    let mut session = Session::new(dispatcher);
    if let Some(history) = args.history {
        session = session.with_history(history);
    }

    if !args.line.is_empty() {
        let code = session.run_once(&args.line.join(" "));
        std::process::exit(code);
    }
    session.repl()
}
