mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::ask::AskArgs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "claude-query",
    about = "Drive Claude Code queries under a timeout and reduce their output to JSON records",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to the claude executable (default: `claude` on PATH)
    #[arg(long, global = true, env = "CLAUDE_QUERY_CLAUDE_BIN")]
    claude_bin: Option<PathBuf>,

    /// Emit an error record for a failed item and keep going
    #[arg(long, global = true)]
    continue_on_fail: bool,

    /// Print all records as one indented JSON array
    #[arg(long, global = true)]
    pretty: bool,

    /// Log debug events to stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single query
    Ask(AskArgs),

    /// Run every item of a YAML or JSON batch file, in order
    Batch {
        /// Batch file path
        file: PathBuf,
    },

    /// Show how an MCP `args` string is split into arguments
    Tokenize {
        /// Raw argument string
        raw: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    // Records go to stdout; keep logs off it.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let globals = cmd::Globals {
        claude_bin: cli.claude_bin,
        continue_on_fail: cli.continue_on_fail,
        pretty: cli.pretty,
        verbose: cli.verbose,
    };

    let result = match cli.command {
        Commands::Ask(args) => cmd::ask::run(&globals, args),
        Commands::Batch { file } => cmd::batch::run(&globals, &file),
        Commands::Tokenize { raw } => cmd::tokenize::run(&raw, globals.pretty),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
