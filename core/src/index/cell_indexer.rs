use crate::{
    error::Result,
    region::validate_coordinate,
    storage::point::{Location, Point},
};

use super::GeometryEngine;

/// Assigns cell ids to coordinates
pub struct CellIndexer<'a, E: ?Sized> {
    engine: &'a E,
}

impl<'a, E> CellIndexer<'a, E>
where
    E: GeometryEngine + ?Sized,
{
    pub fn new(engine: &'a E) -> Self {
        Self { engine }
    }

    /// Compute the cell id of the given coordinate
    pub fn index_of(&self, lat: f64, lon: f64) -> Result<u64> {
        validate_coordinate(lat, lon)?;
        self.engine.cell_id_for_point(lat, lon)
    }

    /// Create a point with the given id and payload located at the given
    /// coordinate
    pub fn point(
        &self,
        id: impl Into<String>,
        lat: f64,
        lon: f64,
        payload: serde_json::Value,
    ) -> Result<Point> {
        let cell_id = self.index_of(lat, lon)?;
        Ok(Point {
            id: id.into(),
            cell_id,
            payload,
            location: Some(Location { lat, lon }),
        })
    }
}

#[cfg(test)]
mod tests {
    use assertor::{assert_that, EqualityAssertion, OptionAssertion};
    use serde_json::json;

    use crate::{
        error::Error,
        index::{GeometryEngine, H3Engine},
        storage::point::Location,
    };

    use super::CellIndexer;

    #[test]
    fn deterministic() {
        let engine = H3Engine;
        let indexer = CellIndexer::new(&engine);
        let a = indexer.index_of(43.0, -107.0).unwrap();
        let b = indexer.index_of(43.0, -107.0).unwrap();
        let far = indexer.index_of(-33.86, 151.21).unwrap();
        assert_that!(a).is_equal_to(b);
        assert_that!(a).is_not_equal_to(far);
    }

    #[test]
    fn point() {
        let engine = H3Engine;
        let indexer = CellIndexer::new(&engine);
        let p = indexer.point("p1", 43.0, -107.0, json!({ "name": "x" })).unwrap();
        assert_that!(p.id.as_str()).is_equal_to("p1");
        assert_that!(p.cell_id).is_equal_to(engine.cell_id_for_point(43.0, -107.0).unwrap());
        assert_that!(p.location).has_value(Location {
            lat: 43.0,
            lon: -107.0,
        });
    }

    #[test]
    fn invalid_coordinates() {
        let engine = H3Engine;
        let indexer = CellIndexer::new(&engine);
        for (lat, lon) in [(91.0, 0.0), (0.0, 181.0), (f64::NAN, 0.0), (0.0, f64::INFINITY)] {
            assert!(matches!(
                indexer.index_of(lat, lon),
                Err(Error::InvalidCoordinate { .. })
            ));
        }
    }
}
