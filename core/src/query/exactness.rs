use geo::Coord;
use tracing::debug;

use crate::{
    index::GeometryEngine,
    region::{LatLonBounds, Region},
    storage::point::Point,
};

/// Removes candidates that were returned because their cell intersects the
/// region although the point itself lies outside
pub struct ExactnessFilter<'a, E: ?Sized> {
    engine: &'a E,
}

impl<'a, E> ExactnessFilter<'a, E>
where
    E: GeometryEngine + ?Sized,
{
    pub fn new(engine: &'a E) -> Self {
        Self { engine }
    }

    /// Keep only the candidates inside the region. Order is preserved.
    pub fn filter(&self, candidates: impl IntoIterator<Item = Point>, region: &Region) -> Vec<Point> {
        let mut total = 0;
        let result = candidates
            .into_iter()
            .inspect(|_| total += 1)
            .filter(|p| self.contains(region, p))
            .collect::<Vec<_>>();
        debug!(
            candidates = total,
            accepted = result.len(),
            "Filtered {} candidates",
            region.kind()
        );
        result
    }

    /// Exact boundary-inclusive containment test for a single point
    pub fn contains(&self, region: &Region, point: &Point) -> bool {
        let Some(location) = self.location_of(point) else {
            return false;
        };

        match region {
            Region::BoundingBox {
                lower_left,
                upper_right,
            } => LatLonBounds::from_corners(*lower_left, *upper_right).contains(location),

            Region::Circle {
                center,
                radius_meters,
            } => self.engine.great_circle_distance_m(*center, location) <= *radius_meters,

            Region::Polygon { ring } => self.engine.point_in_polygon(location, ring),
        }
    }

    /// The stored location or the center of the point's cell
    fn location_of(&self, point: &Point) -> Option<Coord> {
        point
            .location
            .map(|l| l.coord())
            .or_else(|| self.engine.cell_center(point.cell_id))
    }
}
