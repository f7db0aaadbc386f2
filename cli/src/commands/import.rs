use std::{
    fs::File,
    io::BufReader,
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::Args;
use georange_core::{config::Config, import::import_ndjson};
use humantime::format_duration;

use super::open_index_for_writing;

/// Import points from a newline-delimited JSON file
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// The file to import. Every line must contain one point with the
    /// fields `_id', `cellId', `value' and optionally `loc'.
    pub file: PathBuf,
}

/// Run the `import` command
pub fn run_import(args: ImportArgs, config: &Config) -> Result<()> {
    let index = open_index_for_writing(config)?;

    let file = File::open(&args.file)
        .with_context(|| format!("Unable to open file `{}'", args.file.display()))?;

    let start = Instant::now();
    let count = import_ndjson(&index, BufReader::new(file))?;
    index.close()?;

    eprintln!(
        "Imported {} points in {}",
        count,
        format_duration(Duration::from_millis(start.elapsed().as_millis() as u64))
    );

    Ok(())
}
