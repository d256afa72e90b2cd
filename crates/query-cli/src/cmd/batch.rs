use anyhow::{Context, Result};
use query_core::BatchFile;
use std::path::Path;

use super::{execute, Globals};

pub fn run(globals: &Globals, file: &Path) -> Result<()> {
    let batch = BatchFile::load(file)
        .with_context(|| format!("failed to read batch file {}", file.display()))?;
    let items = batch
        .items()
        .with_context(|| format!("invalid batch file {}", file.display()))?;

    execute(globals, &items, globals.continue_on_fail || batch.continue_on_fail)
}
