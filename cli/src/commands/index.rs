use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Args;
use georange_core::config::Config;

use super::open_index_for_writing;

/// Index a single point and add it to the store
#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Latitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// The point's id. A new ULID is generated if not given.
    #[arg(long)]
    pub id: Option<String>,

    /// The point's payload as JSON
    #[arg(long, default_value = "null")]
    pub value: String,
}

/// Run the `index` command
pub fn run_index(args: IndexArgs, config: &Config) -> Result<()> {
    let payload: serde_json::Value =
        serde_json::from_str(&args.value).context("Payload must be valid JSON")?;

    let index = open_index_for_writing(config)?;
    let point = match args.id {
        Some(id) => index.index_point_with_id(id, args.lat, args.lon, payload)?,
        None => index.index_point(args.lat, args.lon, payload)?,
    };
    index.close()?;

    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, &point)?;
    writeln!(stdout)?;

    Ok(())
}
