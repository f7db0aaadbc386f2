use geo::Coord;

use crate::{error::Result, region::Region};

pub use self::cell_id::CellRange;
pub use self::cell_indexer::CellIndexer;
pub use self::h3_engine::H3Engine;
pub use self::zoom_level::ZoomLevel;

pub mod cell_id;
pub mod cell_indexer;
pub mod h3_engine;
pub mod zoom_level;

/// Computes cell ids, coverings and exact geometric predicates. All
/// coordinates are in degrees (`x` = longitude, `y` = latitude).
pub trait GeometryEngine: Send + Sync {
    /// Returns the id of the leaf cell containing the given coordinate
    fn cell_id_for_point(&self, lat: f64, lon: f64) -> Result<u64>;

    /// Returns the contiguous range of ids spanned by the cell with the given
    /// id and all its descendants
    fn cell_range(&self, cell_id: u64) -> CellRange;

    /// Computes a set of cells whose ranges together contain the leaf cell of
    /// every point inside `region`. The cells are at most as fine as `depth`.
    /// Implementations use coarser cells if `depth` would require more than
    /// `max_cells` cells.
    fn cover(&self, region: &Region, depth: u8, max_cells: usize) -> Result<Vec<u64>>;

    /// Boundary-inclusive containment test. The ring is implicitly closed.
    fn point_in_polygon(&self, point: Coord, ring: &[Coord]) -> bool;

    /// Great-circle distance between two coordinates in meters
    fn great_circle_distance_m(&self, a: Coord, b: Coord) -> f64;

    /// The center of the cell with the given id or `None` if the id does not
    /// denote a cell
    fn cell_center(&self, cell_id: u64) -> Option<Coord>;
}
