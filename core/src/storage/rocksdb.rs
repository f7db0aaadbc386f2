use std::path::Path;

use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use rocksdb::{
    ColumnFamily, DBCompressionType, Direction, IteratorMode, Options, WriteBatch, DB,
};

use crate::query::{Predicate, CELL_ID_FIELD};

use super::{point::Point, DocumentStore};

const CELLS_CF: &str = "cells";

/// An implementation of the [`DocumentStore`] trait backed by RocksDB.
/// Points are stored as JSON under their id. A second column family indexes
/// them by cell id. Queries can use this index for a single contiguous range
/// of cell ids only.
pub struct RocksDBStore {
    db: DB,

    /// Serializes writes so that existence checks and updates of the cell
    /// index are atomic
    write_lock: Mutex<()>,
}

impl RocksDBStore {
    /// Creates a new RocksDB store at the given location
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_compression_type(DBCompressionType::Lz4);

        let path = path.as_ref();
        let db = DB::open_cf(&opts, path, [CELLS_CF])
            .with_context(|| format!("Unable to open RocksDB store at `{}'", path.display()))?;

        Ok(Self {
            db,
            write_lock: Mutex::new(()),
        })
    }

    fn cells(&self) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(CELLS_CF)
            .context("Column family for cell index is missing")
    }

    fn read(&self, id: &[u8]) -> Result<Option<Point>> {
        match self.db.get_pinned(id)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write(&self, point: Point, replace: bool) -> Result<()> {
        let cells = self.cells()?;
        let _guard = self.write_lock.lock();

        let mut batch = WriteBatch::default();
        if let Some(old) = self.read(point.id.as_bytes())? {
            if !replace {
                bail!("A point with the id `{}' already exists", point.id);
            }
            batch.delete_cf(cells, cell_key(old.cell_id, &old.id));
        }

        batch.put(point.id.as_bytes(), serde_json::to_vec(&point)?);
        batch.put_cf(cells, cell_key(point.cell_id, &point.id), b"");
        self.db.write(batch)?;

        Ok(())
    }
}

/// Key in the cell index. Important! Use `to_be_bytes()` to maintain sort
/// order!
fn cell_key(cell_id: u64, id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + id.len());
    key.extend_from_slice(&cell_id.to_be_bytes());
    key.extend_from_slice(id.as_bytes());
    key
}

fn cell_of(key: &[u8]) -> Option<u64> {
    let bytes: [u8; 8] = key.get(..8)?.try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}

impl DocumentStore for RocksDBStore {
    fn insert(&self, point: Point) -> Result<()> {
        self.write(point, false)
    }

    fn insert_or_replace(&self, point: Point) -> Result<()> {
        self.write(point, true)
    }

    fn delete(&self, id: &str) -> Result<()> {
        let cells = self.cells()?;
        let _guard = self.write_lock.lock();

        if let Some(old) = self.read(id.as_bytes())? {
            let mut batch = WriteBatch::default();
            batch.delete(id.as_bytes());
            batch.delete_cf(cells, cell_key(old.cell_id, &old.id));
            self.db.write(batch)?;
        }

        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Point>> {
        self.read(id.as_bytes())
    }

    fn find(&self) -> Result<impl Iterator<Item = Result<Point>>> {
        Ok(self.db.iterator(IteratorMode::Start).map(|r| {
            let (_, value) = r?;
            Ok(serde_json::from_slice(&value)?)
        }))
    }

    fn find_query(&self, predicate: &Predicate) -> Result<impl Iterator<Item = Result<Point>>> {
        let predicate = predicate.clone();
        let ranges = predicate.ranges_on(CELL_ID_FIELD);

        let it: Box<dyn Iterator<Item = Result<Point>> + '_> = match ranges.as_deref() {
            // no constraint on the cell id, scan everything
            None => Box::new(self.find()?.filter(move |r| match r {
                Ok(p) => predicate.matches(p),
                Err(_) => true,
            })),

            Some([]) => Box::new(std::iter::empty()),

            Some(&[(min, max)]) => {
                let start = min.to_be_bytes();
                let scan = self
                    .db
                    .iterator_cf(self.cells()?, IteratorMode::From(&start, Direction::Forward))
                    .take_while(move |r| match r {
                        Ok((key, _)) => cell_of(key).is_some_and(|c| c <= max),
                        Err(_) => true,
                    })
                    .map(move |r| {
                        let (key, _) = r?;
                        self.read(&key[8..])
                    })
                    .filter_map(Result::transpose)
                    .filter(move |r| match r {
                        Ok(p) => predicate.matches(p),
                        Err(_) => true,
                    });
                Box::new(scan)
            }

            Some(ranges) => bail!(
                "RocksDB store cannot query {} disjoint cell id ranges at once",
                ranges.len()
            ),
        };

        Ok(it)
    }

    fn supports_disjunction(&self) -> bool {
        false
    }

    fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    fn close(self) -> Result<()> {
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use assertor::{assert_that, EqualityAssertion, OptionAssertion, ResultAssertion, VecAssertion};
    use serde_json::json;
    use tempdir::TempDir;

    use crate::{
        query::{and, eq, Predicate},
        storage::{
            point::{Location, Point},
            DocumentStore,
        },
    };

    use super::RocksDBStore;

    fn point(id: &str, cell_id: u64) -> Point {
        Point {
            id: id.to_string(),
            cell_id,
            payload: json!({ "name": id, "type": if cell_id > 100 { "International" } else { "Regional" } }),
            location: Some(Location {
                lat: 1.0,
                lon: 2.0,
            }),
        }
    }

    fn ids(store: &RocksDBStore, predicate: &Predicate) -> Vec<String> {
        store
            .find_query(predicate)
            .unwrap()
            .map(|p| p.unwrap().id)
            .collect()
    }

    fn open() -> (TempDir, RocksDBStore) {
        let dir = TempDir::new("georange_rocksdb").unwrap();
        let store = RocksDBStore::new(dir.path()).unwrap();
        for (id, cell_id) in [("a", 50), ("b", 120), ("c", 120), ("d", 300), ("e", 7)] {
            store.insert(point(id, cell_id)).unwrap();
        }
        (dir, store)
    }

    #[test]
    fn insert_and_find() {
        let (_dir, store) = open();
        let all = store.find().unwrap().collect::<anyhow::Result<Vec<_>>>().unwrap();
        assert_that!(all).has_length(5);
        assert_that!(all.iter().find(|p| p.id == "b").cloned()).has_value(point("b", 120));
        assert_that!(store.insert(point("a", 1))).is_err();
    }

    #[test]
    fn get_by_id() {
        let (_dir, store) = open();
        assert_that!(store.get("d").unwrap()).has_value(point("d", 300));
        assert_that!(store.get("z").unwrap()).is_none();

        store.insert_or_replace(point("d", 301)).unwrap();
        assert_that!(store.get("d").unwrap()).has_value(point("d", 301));
        store.delete("d").unwrap();
        assert_that!(store.get("d").unwrap()).is_none();
    }

    #[test]
    fn single_range() {
        let (_dir, store) = open();
        assert_that!(ids(&store, &Predicate::between("cellId", 50u64, 120u64))).contains_exactly_in_order(
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
        );
        assert_that!(ids(
            &store,
            &and![
                Predicate::between("cellId", 0u64, 1000u64),
                eq!("value.type", "International")
            ]
        ))
        .contains_exactly_in_order(vec!["b".to_string(), "c".to_string(), "d".to_string()]);
        assert_that!(ids(&store, &Predicate::between("cellId", 51u64, 119u64))).is_empty();
    }

    #[test]
    fn disjunction_is_rejected() {
        let (_dir, store) = open();
        assert_that!(store.supports_disjunction()).is_equal_to(false);
        let q = Predicate::or(vec![
            Predicate::between("cellId", 0u64, 10u64),
            Predicate::between("cellId", 200u64, 300u64),
        ]);
        assert!(store.find_query(&q).is_err());
    }

    #[test]
    fn full_scan_without_cell_constraint() {
        let (_dir, store) = open();
        assert_that!(ids(&store, &eq!("_id", "d"))).contains_exactly(vec!["d".to_string()]);
    }

    #[test]
    fn replace_and_delete() {
        let (_dir, store) = open();
        store.insert_or_replace(point("a", 400)).unwrap();
        assert_that!(ids(&store, &Predicate::between("cellId", 0u64, 60u64)))
            .contains_exactly(vec!["e".to_string()]);
        assert_that!(ids(&store, &Predicate::between("cellId", 400u64, 400u64)))
            .contains_exactly(vec!["a".to_string()]);

        store.delete("a").unwrap();
        store.delete("a").unwrap();
        store.flush().unwrap();
        assert_that!(ids(&store, &Predicate::between("cellId", 400u64, 400u64))).is_empty();
        assert_that!(store.find().unwrap().count()).is_equal_to(4);
    }

    #[test]
    fn reopen() {
        let dir = TempDir::new("georange_rocksdb").unwrap();
        let store = RocksDBStore::new(dir.path()).unwrap();
        store.insert(point("x", 99)).unwrap();
        store.close().unwrap();

        let store = RocksDBStore::new(dir.path()).unwrap();
        assert_that!(ids(&store, &Predicate::between("cellId", 99u64, 99u64)))
            .contains_exactly(vec!["x".to_string()]);
    }
}
