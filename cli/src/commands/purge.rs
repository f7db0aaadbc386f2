use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Args;
use georange_core::config::Config;
use humantime::format_duration;

use super::open_index_for_writing;

/// Delete all points from the store
#[derive(Args, Debug)]
pub struct PurgeArgs {}

/// Run the `purge` command
pub fn run_purge(_args: PurgeArgs, config: &Config) -> Result<()> {
    let index = open_index_for_writing(config)?;

    let start = Instant::now();
    let deleted = index.purge()?;
    index.close()?;

    eprintln!(
        "Deleted {} points in {}",
        deleted,
        format_duration(Duration::from_millis(start.elapsed().as_millis() as u64))
    );

    Ok(())
}
