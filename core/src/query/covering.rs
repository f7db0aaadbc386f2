use itertools::Itertools;
use tracing::debug;

use crate::{
    error::Result,
    index::{CellRange, GeometryEngine, ZoomLevel},
    region::Region,
};

/// A sorted list of disjoint, non-adjacent cell ranges approximating a
/// region
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Covering {
    ranges: Vec<CellRange>,
}

impl Covering {
    /// Normalize the given ranges. Overlapping and adjacent ranges are
    /// merged. If more than `max_ranges` ranges remain, the two neighbors
    /// with the smallest gap between them are merged repeatedly. Merging only
    /// widens ranges, so every id covered by the input stays covered.
    pub fn from_ranges(ranges: impl IntoIterator<Item = CellRange>, max_ranges: usize) -> Self {
        let max_ranges = max_ranges.max(1);

        let mut ranges = ranges
            .into_iter()
            .sorted_unstable()
            .coalesce(|a, b| {
                if b.min <= a.max.saturating_add(1) {
                    Ok(a.hull(&b))
                } else {
                    Err((a, b))
                }
            })
            .collect::<Vec<_>>();

        while ranges.len() > max_ranges {
            let Some(i) = (0..ranges.len() - 1).min_by_key(|&i| ranges[i + 1].min - ranges[i].max)
            else {
                break;
            };
            ranges[i] = ranges[i].hull(&ranges[i + 1]);
            ranges.remove(i + 1);
        }

        Self { ranges }
    }

    pub fn ranges(&self) -> &[CellRange] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn contains(&self, cell_id: u64) -> bool {
        let i = self.ranges.partition_point(|r| r.max < cell_id);
        self.ranges.get(i).is_some_and(|r| r.contains(cell_id))
    }

    /// Total number of ids covered
    pub fn span(&self) -> u128 {
        self.ranges.iter().map(CellRange::span).sum()
    }
}

/// Obtains coverings for regions from a [`GeometryEngine`]
pub struct RegionCoveringClient<'a, E: ?Sized> {
    engine: &'a E,
}

impl<'a, E> RegionCoveringClient<'a, E>
where
    E: GeometryEngine + ?Sized,
{
    pub fn new(engine: &'a E) -> Self {
        Self { engine }
    }

    /// Compute a covering of the region with at most `max_cells` ranges. A
    /// `max_cells` of 0 is treated as 1.
    pub fn cover(&self, region: &Region, zoom_level: ZoomLevel, max_cells: usize) -> Result<Covering> {
        region.validate()?;
        let max_cells = max_cells.max(1);

        let cells = self.engine.cover(region, zoom_level.depth(), max_cells)?;
        let cell_count = cells.len();
        let covering = Covering::from_ranges(
            cells.into_iter().map(|c| self.engine.cell_range(c)),
            max_cells,
        );

        debug!(
            %zoom_level,
            cells = cell_count,
            ranges = covering.len(),
            "Covered {} region",
            region.kind()
        );

        Ok(covering)
    }
}
