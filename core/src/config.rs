use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    index::ZoomLevel,
    query::Strategy,
    storage::{memory::MemoryStore, rocksdb::RocksDBStore, AnyStore},
};

/// location of the config file, relative to $HOME
const CONFIG_PATH: &str = ".config/georange/config.toml";

const STORE_ENV: &str = "GEORANGE_STORE";
const STORE_PATH_ENV: &str = "GEORANGE_STORE_PATH";
const ZOOM_ENV: &str = "GEORANGE_ZOOM";
const MAX_CELLS_ENV: &str = "GEORANGE_MAX_CELLS";
const STRATEGY_ENV: &str = "GEORANGE_STRATEGY";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Memory,
    #[default]
    RocksDB,
}

impl StoreKind {
    /// `false` if the store's contents are lost when it is closed
    pub fn is_persistent(&self) -> bool {
        matches!(self, StoreKind::RocksDB)
    }
}

impl FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreKind::Memory),
            "rocksdb" => Ok(StoreKind::RocksDB),
            _ => bail!("Unknown store `{s}'. Expected `memory' or `rocksdb'."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub kind: StoreKind,
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            path: PathBuf::from("store"),
        }
    }
}

impl StoreConfig {
    /// Open the configured store
    pub fn open(&self) -> Result<AnyStore> {
        Ok(match self.kind {
            StoreKind::Memory => AnyStore::Memory(MemoryStore::new()),
            StoreKind::RocksDB => AnyStore::RocksDB(RocksDBStore::new(&self.path)?),
        })
    }
}

/// Defaults for region queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    pub zoom_level: ZoomLevel,
    pub max_cells: usize,

    /// Forces a range query strategy. Chosen based on the store's
    /// capabilities if not set.
    pub strategy: Option<Strategy>,

    /// Remove false positives
    pub exact: bool,

    /// Maximum number of concurrent scans
    pub parallelism: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            zoom_level: ZoomLevel::default(),
            max_cells: 64,
            strategy: None,
            exact: true,
            parallelism: num_cpus::get(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub store: StoreConfig,
    pub query: QueryConfig,
}

impl Config {
    /// Load the configuration. Reads the file at `path` if given. Otherwise,
    /// reads `$HOME/.config/georange/config.toml` if it exists or falls back
    /// to the defaults. Environment variables override values from the file.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Config::default(),
            },
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Config> {
        let file = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read configuration file at {path:?}"))?;
        Self::from_toml_str(&file).with_context(|| format!("Configuration file {path:?} malformed"))
    }

    pub fn from_toml_str(s: &str) -> Result<Config> {
        Ok(toml::from_str(s)?)
    }

    /// Override values with the ones found by `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = lookup(STORE_ENV) {
            self.store.kind = v.parse().with_context(|| format!("Invalid {STORE_ENV}"))?;
        }
        if let Some(v) = lookup(STORE_PATH_ENV) {
            self.store.path = PathBuf::from(v);
        }
        if let Some(v) = lookup(ZOOM_ENV) {
            self.query.zoom_level = v.parse().with_context(|| format!("Invalid {ZOOM_ENV}"))?;
        }
        if let Some(v) = lookup(MAX_CELLS_ENV) {
            self.query.max_cells = v
                .parse()
                .with_context(|| format!("Invalid {MAX_CELLS_ENV} `{v}'"))?;
        }
        if let Some(v) = lookup(STRATEGY_ENV) {
            self.query.strategy =
                Some(v.parse().with_context(|| format!("Invalid {STRATEGY_ENV}"))?);
        }
        Ok(())
    }
}

fn default_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(CONFIG_PATH))
}
