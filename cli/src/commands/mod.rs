use georange_core::{config::Config, index::H3Engine, storage::AnyStore, SpatialIndex};
use tracing::{debug, warn};

pub mod coordinate_error;
pub mod import;
pub mod index;
pub mod purge;
pub mod search;

/// Open the configured store
fn open_index(config: &Config) -> anyhow::Result<SpatialIndex<AnyStore, H3Engine>> {
    debug!(kind = ?config.store.kind, path = %config.store.path.display(), "Opening store");
    let store = config.store.open()?;
    Ok(SpatialIndex::new(store, H3Engine, config.query.clone()))
}

/// Open the configured store for a command that modifies it
fn open_index_for_writing(config: &Config) -> anyhow::Result<SpatialIndex<AnyStore, H3Engine>> {
    if !config.store.kind.is_persistent() {
        warn!(
            kind = ?config.store.kind,
            "The store is not persistent. Changes are discarded when the command exits."
        );
    }
    open_index(config)
}

#[cfg(test)]
mod tests {
    use assertor::{assert_that, OptionAssertion};
    use georange_core::config::{Config, StoreKind};
    use serde_json::json;
    use tempdir::TempDir;

    use super::open_index_for_writing;

    #[test]
    fn default_store_keeps_writes() {
        let dir = TempDir::new("georange_commands").unwrap();
        let mut config = Config::default();
        config.store.path = dir.path().join("store");

        let index = open_index_for_writing(&config).unwrap();
        index
            .index_point_with_id("jfk".to_string(), 40.6413, -73.7781, json!({}))
            .unwrap();
        index.close().unwrap();

        let index = open_index_for_writing(&config).unwrap();
        assert_that!(index.get_point("jfk").unwrap()).is_some();
        index.close().unwrap();
    }

    #[test]
    fn memory_store_discards_writes() {
        let mut config = Config::default();
        config.store.kind = StoreKind::Memory;

        let index = open_index_for_writing(&config).unwrap();
        index
            .index_point_with_id("jfk".to_string(), 40.6413, -73.7781, json!({}))
            .unwrap();
        index.close().unwrap();

        let index = open_index_for_writing(&config).unwrap();
        assert_that!(index.get_point("jfk").unwrap()).is_none();
    }
}
