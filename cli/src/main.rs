use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use commands::{
    import::{run_import, ImportArgs},
    index::{run_index, IndexArgs},
    purge::{run_purge, PurgeArgs},
    search::{run_search, SearchArgs},
};
use georange_core::config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(author, version)]
struct Cli {
    /// Path to the configuration file. Defaults to
    /// `$HOME/.config/georange/config.toml` if it exists.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print debug output (can be overridden with `RUST_LOG`)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Import(ImportArgs),
    Index(IndexArgs),
    Search(SearchArgs),
    Purge(PurgeArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose > 0 { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Import(args) => run_import(args, &config),
        Commands::Index(args) => run_index(args, &config),
        Commands::Search(args) => run_search(args, &config),
        Commands::Purge(args) => run_purge(args, &config),
    }
}
