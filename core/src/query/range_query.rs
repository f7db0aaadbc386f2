use std::{
    fmt::Display,
    str::FromStr,
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

use anyhow::bail;
use crossbeam_channel::unbounded;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{Error, Result},
    storage::{point::Point, DocumentStore},
};

use super::{Covering, Predicate};

/// Name of the document field holding the cell id
pub const CELL_ID_FIELD: &str = "cellId";

/// Specifies how the ranges of a covering are sent to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// A single query with a disjunction over all ranges
    CompoundOr,

    /// One query per range, executed concurrently and merged afterwards
    FanOutUnion,
}

impl Strategy {
    /// The strategy to use for the given store if the caller does not force
    /// one
    pub fn for_store<S: DocumentStore + ?Sized>(store: &S) -> Self {
        if store.supports_disjunction() {
            Strategy::CompoundOr
        } else {
            Strategy::FanOutUnion
        }
    }
}

impl Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::CompoundOr => write!(f, "compound_or"),
            Strategy::FanOutUnion => write!(f, "fan_out_union"),
        }
    }
}

impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.replace('-', "_").to_ascii_lowercase().as_str() {
            "compound_or" => Ok(Strategy::CompoundOr),
            "fan_out_union" => Ok(Strategy::FanOutUnion),
            _ => bail!("Unknown strategy `{s}'. Expected `compound_or' or `fan_out_union'."),
        }
    }
}

/// Translates a [`Covering`] into predicates on the cell id field and runs
/// them against a [`DocumentStore`]
pub struct RangeQueryBuilder<'a> {
    covering: &'a Covering,
    filter: Option<&'a Predicate>,
}

impl<'a> RangeQueryBuilder<'a> {
    pub fn new(covering: &'a Covering) -> Self {
        Self {
            covering,
            filter: None,
        }
    }

    /// AND-combine every generated predicate with the given one
    pub fn with_filter(mut self, filter: Option<&'a Predicate>) -> Self {
        self.filter = filter;
        self
    }

    fn restrict(&self, spatial: Predicate) -> Predicate {
        match self.filter {
            Some(f) => Predicate::and(vec![spatial, f.clone()]),
            None => spatial,
        }
    }

    /// A single predicate matching all ranges. `None` if the covering is
    /// empty.
    pub fn compound_predicate(&self) -> Option<Predicate> {
        if self.covering.is_empty() {
            return None;
        }
        let ranges = self
            .covering
            .ranges()
            .iter()
            .map(|r| Predicate::between(CELL_ID_FIELD, r.min, r.max))
            .collect();
        Some(self.restrict(Predicate::or(ranges)))
    }

    /// One predicate per range
    pub fn range_predicates(&self) -> Vec<Predicate> {
        self.covering
            .ranges()
            .iter()
            .map(|r| self.restrict(Predicate::between(CELL_ID_FIELD, r.min, r.max)))
            .collect()
    }

    /// Run the query. The result contains every point only once and is
    /// sorted by cell id and id. Store errors fail the whole query.
    pub fn execute<S>(&self, store: &S, strategy: Strategy, parallelism: usize) -> Result<Vec<Point>>
    where
        S: DocumentStore + ?Sized,
    {
        if self.covering.is_empty() {
            return Ok(Vec::new());
        }

        debug!(%strategy, ranges = self.covering.len(), "Executing range query");

        let points = match strategy {
            Strategy::CompoundOr => {
                let Some(predicate) = self.compound_predicate() else {
                    return Ok(Vec::new());
                };
                scan(store, &predicate).map_err(Error::store)?
            }
            Strategy::FanOutUnion => self.fan_out(store, parallelism)?,
        };

        let mut seen = FxHashSet::default();
        let mut points = points
            .into_iter()
            .filter(|p| seen.insert(p.id.clone()))
            .collect::<Vec<_>>();
        points.sort_by(|a, b| (a.cell_id, &a.id).cmp(&(b.cell_id, &b.id)));

        debug!(candidates = points.len(), "Range query finished");

        Ok(points)
    }

    fn fan_out<S>(&self, store: &S, parallelism: usize) -> Result<Vec<Point>>
    where
        S: DocumentStore + ?Sized,
    {
        let predicates = self.range_predicates();
        let workers = parallelism.clamp(1, predicates.len().max(1));

        let (work_send, work_recv) = unbounded::<&Predicate>();
        for p in &predicates {
            work_send
                .send(p)
                .map_err(|e| Error::store(anyhow::anyhow!("Unable to schedule scan: {e}")))?;
        }
        drop(work_send);

        let (result_send, result_recv) = unbounded::<anyhow::Result<Vec<Point>>>();
        let failed = AtomicBool::new(false);

        thread::scope(|s| {
            for _ in 0..workers {
                let work_recv = work_recv.clone();
                let result_send = result_send.clone();
                let failed = &failed;
                s.spawn(move || {
                    for predicate in work_recv {
                        if failed.load(Ordering::Relaxed) {
                            break;
                        }
                        let r = scan(store, predicate);
                        if r.is_err() {
                            failed.store(true, Ordering::Relaxed);
                        }
                        if result_send.send(r).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(result_send);

        let mut points = Vec::new();
        for r in result_recv {
            points.extend(r.map_err(Error::store)?);
        }
        Ok(points)
    }
}

fn scan<S>(store: &S, predicate: &Predicate) -> anyhow::Result<Vec<Point>>
where
    S: DocumentStore + ?Sized,
{
    store.find_query(predicate)?.collect()
}
