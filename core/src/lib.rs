//! Spatial queries on point stores that can only evaluate range predicates
//! on a single integer field.
//!
//! Every point gets the id of the leaf cell it lies in. Cell ids are
//! assigned so that all descendants of a cell form a contiguous range. A
//! region query is translated into a small set of such ranges (a
//! [`Covering`](query::Covering)), executed against the store and the
//! resulting candidates are filtered with exact geometric tests.

pub mod config;
pub mod error;
pub mod import;
pub mod index;
pub mod query;
pub mod region;
pub mod spatial_index;
pub mod storage;

pub use self::error::{Error, Result};
pub use self::spatial_index::{QueryPlan, SpatialIndex, SpatialQuery};
