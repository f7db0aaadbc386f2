use std::{
    collections::{BTreeMap, BTreeSet},
    ops::Bound,
};

use anyhow::{bail, Result};
use parking_lot::RwLock;

use crate::query::{Predicate, CELL_ID_FIELD};

use super::{point::Point, DocumentStore};

#[derive(Default)]
struct Inner {
    points: BTreeMap<String, Point>,

    /// Secondary index on the cell id
    by_cell: BTreeSet<(u64, String)>,
}

impl Inner {
    fn remove(&mut self, id: &str) -> Option<Point> {
        let old = self.points.remove(id)?;
        self.by_cell.remove(&(old.cell_id, old.id.clone()));
        Some(old)
    }

    fn add(&mut self, point: Point) {
        self.by_cell.insert((point.cell_id, point.id.clone()));
        self.points.insert(point.id.clone(), point);
    }
}

/// An in-memory [`DocumentStore`]. Evaluates arbitrary predicates and uses
/// its cell id index for every range the predicate constrains the cell id to.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DocumentStore for MemoryStore {
    fn insert(&self, point: Point) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.points.contains_key(&point.id) {
            bail!("A point with the id `{}' already exists", point.id);
        }
        inner.add(point);
        Ok(())
    }

    fn insert_or_replace(&self, point: Point) -> Result<()> {
        let mut inner = self.inner.write();
        inner.remove(&point.id);
        inner.add(point);
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.inner.write().remove(id);
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Point>> {
        Ok(self.inner.read().points.get(id).cloned())
    }

    fn find(&self) -> Result<impl Iterator<Item = Result<Point>>> {
        let inner = self.inner.read();
        let points = inner.points.values().cloned().collect::<Vec<_>>();
        Ok(points.into_iter().map(Ok))
    }

    fn find_query(&self, predicate: &Predicate) -> Result<impl Iterator<Item = Result<Point>>> {
        let inner = self.inner.read();

        let result = match predicate.ranges_on(CELL_ID_FIELD) {
            Some(ranges) => {
                let mut result = Vec::new();
                for (min, max) in ranges {
                    let candidates = inner
                        .by_cell
                        .range((Bound::Included((min, String::new())), Bound::Unbounded))
                        .take_while(|(cell_id, _)| *cell_id <= max)
                        .filter_map(|(_, id)| inner.points.get(id))
                        .filter(|p| predicate.matches(p))
                        .cloned();
                    result.extend(candidates);
                }
                result
            }

            None => inner
                .points
                .values()
                .filter(|p| predicate.matches(p))
                .cloned()
                .collect(),
        };

        Ok(result.into_iter().map(Ok))
    }

    fn supports_disjunction(&self) -> bool {
        true
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn close(self) -> Result<()> {
        Ok(())
    }
}
