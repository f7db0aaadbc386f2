use anyhow::Result;
use itertools::Either;

use crate::query::Predicate;

use self::{memory::MemoryStore, point::Point, rocksdb::RocksDBStore};

pub mod memory;
pub mod point;
pub mod rocksdb;

/// A store for points that can evaluate predicates on their fields
pub trait DocumentStore: Send + Sync {
    /// Adds a point to the store. Fails if a point with the same id exists.
    fn insert(&self, point: Point) -> Result<()>;

    /// Adds a point to the store or replaces the point with the same id
    fn insert_or_replace(&self, point: Point) -> Result<()>;

    /// Deletes the point with the given `id`. Does nothing if there is no
    /// such point.
    fn delete(&self, id: &str) -> Result<()>;

    /// Looks up a single point by its id
    fn get(&self, id: &str) -> Result<Option<Point>>;

    /// Returns all points in the store
    fn find(&self) -> Result<impl Iterator<Item = Result<Point>>>;

    /// Returns all points matching the given predicate
    fn find_query(&self, predicate: &Predicate) -> Result<impl Iterator<Item = Result<Point>>>;

    /// `true` if [`find_query`](DocumentStore::find_query) can evaluate a
    /// disjunction of several ranges of the cell id in a single request
    fn supports_disjunction(&self) -> bool;

    /// Persists changes
    fn flush(&self) -> Result<()>;

    /// Flushes and releases the store
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// One of the available [`DocumentStore`] implementations
pub enum AnyStore {
    Memory(MemoryStore),
    RocksDB(RocksDBStore),
}

impl DocumentStore for AnyStore {
    fn insert(&self, point: Point) -> Result<()> {
        match self {
            AnyStore::Memory(s) => s.insert(point),
            AnyStore::RocksDB(s) => s.insert(point),
        }
    }

    fn insert_or_replace(&self, point: Point) -> Result<()> {
        match self {
            AnyStore::Memory(s) => s.insert_or_replace(point),
            AnyStore::RocksDB(s) => s.insert_or_replace(point),
        }
    }

    fn delete(&self, id: &str) -> Result<()> {
        match self {
            AnyStore::Memory(s) => s.delete(id),
            AnyStore::RocksDB(s) => s.delete(id),
        }
    }

    fn get(&self, id: &str) -> Result<Option<Point>> {
        match self {
            AnyStore::Memory(s) => s.get(id),
            AnyStore::RocksDB(s) => s.get(id),
        }
    }

    fn find(&self) -> Result<impl Iterator<Item = Result<Point>>> {
        Ok(match self {
            AnyStore::Memory(s) => Either::Left(s.find()?),
            AnyStore::RocksDB(s) => Either::Right(s.find()?),
        })
    }

    fn find_query(&self, predicate: &Predicate) -> Result<impl Iterator<Item = Result<Point>>> {
        Ok(match self {
            AnyStore::Memory(s) => Either::Left(s.find_query(predicate)?),
            AnyStore::RocksDB(s) => Either::Right(s.find_query(predicate)?),
        })
    }

    fn supports_disjunction(&self) -> bool {
        match self {
            AnyStore::Memory(s) => s.supports_disjunction(),
            AnyStore::RocksDB(s) => s.supports_disjunction(),
        }
    }

    fn flush(&self) -> Result<()> {
        match self {
            AnyStore::Memory(s) => s.flush(),
            AnyStore::RocksDB(s) => s.flush(),
        }
    }

    fn close(self) -> Result<()> {
        match self {
            AnyStore::Memory(s) => s.close(),
            AnyStore::RocksDB(s) => s.close(),
        }
    }
}
