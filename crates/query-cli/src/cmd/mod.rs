pub mod ask;
pub mod batch;
pub mod tokenize;

use anyhow::{Context, Result};
use query_core::{process_environment, ClaudeCli, Engine, QueryParams};
use std::path::{Path, PathBuf};

use crate::output::print_records;

/// Flags shared by every subcommand.
pub struct Globals {
    pub claude_bin: Option<PathBuf>,
    pub continue_on_fail: bool,
    pub pretty: bool,
    pub verbose: bool,
}

/// Run `items` through the engine on a single-threaded runtime and print the
/// records.
pub fn execute(globals: &Globals, items: &[QueryParams], continue_on_fail: bool) -> Result<()> {
    let executable = resolve_claude_bin(globals.claude_bin.as_deref())?;
    tracing::debug!(executable = %executable, items = items.len(), "running queries");

    let engine = Engine::new(ClaudeCli::new(Some(executable)), process_environment())
        .continue_on_fail(continue_on_fail);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    let records = rt.block_on(engine.run(items))?;

    print_records(&records, globals.pretty)
}

fn resolve_claude_bin(explicit: Option<&Path>) -> Result<String> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => which::which("claude")
            .context("claude CLI not found on PATH; install it or pass --claude-bin")?,
    };
    Ok(path.to_string_lossy().into_owned())
}
