//! Query regions. Coordinates are [`geo::Coord`] values in degrees with
//! `x` holding the longitude and `y` holding the latitude. Use [`lat_lon`] to
//! create them in the more familiar latitude/longitude order.

use geo::{coord, Area, Intersects, LineString, Polygon};

pub use geo::Coord;

pub use self::spherical::SphericalRing;

use crate::error::{Error, Result};

pub mod geojson;
pub mod spherical;

/// Mean earth radius in meters, the same value the H3 library uses for its
/// great-circle distances
pub const EARTH_RADIUS_METERS: f64 = 6_371_007.180_918_475;

/// Create a coordinate from a latitude and a longitude in degrees
pub fn lat_lon(lat: f64, lon: f64) -> Coord {
    coord! { x: lon, y: lat }
}

/// Check that the given latitude and longitude are finite and in range
pub fn validate_coordinate(lat: f64, lon: f64) -> Result<Coord> {
    if !lat.is_finite() || !lon.is_finite() || lat.abs() > 90.0 || lon.abs() > 180.0 {
        return Err(Error::InvalidCoordinate { lat, lon });
    }
    Ok(lat_lon(lat, lon))
}

/// A region to search for points in
#[derive(Debug, Clone, PartialEq)]
pub enum Region {
    /// A latitude/longitude box. The corners may be given in any order, see
    /// [`LatLonBounds::from_corners`].
    BoundingBox {
        lower_left: Coord,
        upper_right: Coord,
    },

    /// All points whose great-circle distance to `center` is at most
    /// `radius_meters`
    Circle { center: Coord, radius_meters: f64 },

    /// A simple polygon on the sphere. The ring is implicitly closed by
    /// connecting the last vertex to the first one. Edges are great-circle
    /// arcs, see [`SphericalRing`].
    Polygon { ring: Vec<Coord> },
}

impl Region {
    /// Create a validated bounding box
    pub fn bounding_box(lower_left: Coord, upper_right: Coord) -> Result<Self> {
        let r = Region::BoundingBox {
            lower_left,
            upper_right,
        };
        r.validate()?;
        Ok(r)
    }

    /// Create a validated circle
    pub fn circle(center: Coord, radius_meters: f64) -> Result<Self> {
        let r = Region::Circle {
            center,
            radius_meters,
        };
        r.validate()?;
        Ok(r)
    }

    /// Create a validated polygon. Consecutive duplicate vertices and an
    /// explicit closing vertex are removed.
    pub fn polygon(ring: Vec<Coord>) -> Result<Self> {
        let ring = normalize_ring(&ring);
        validate_ring(&ring)?;
        Ok(Region::Polygon { ring })
    }

    /// Check the region's invariants
    pub fn validate(&self) -> Result<()> {
        match self {
            Region::BoundingBox {
                lower_left,
                upper_right,
            } => {
                validate_coordinate(lower_left.y, lower_left.x)?;
                validate_coordinate(upper_right.y, upper_right.x)?;
                Ok(())
            }

            Region::Circle {
                center,
                radius_meters,
            } => {
                validate_coordinate(center.y, center.x)?;
                if !radius_meters.is_finite() || *radius_meters < 0.0 {
                    return Err(Error::invalid_geometry(format!(
                        "circle radius must be a non-negative number of meters, got {radius_meters}"
                    )));
                }
                Ok(())
            }

            Region::Polygon { ring } => validate_ring(&normalize_ring(ring)),
        }
    }

    /// A short name of the region's kind for log messages
    pub fn kind(&self) -> &'static str {
        match self {
            Region::BoundingBox { .. } => "bbox",
            Region::Circle { .. } => "circle",
            Region::Polygon { .. } => "polygon",
        }
    }
}

/// A latitude interval and a longitude interval. The longitude interval
/// crosses the antimeridian if `west > east`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLonBounds {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
}

impl LatLonBounds {
    /// Bounds spanned by two arbitrary corners. The latitude interval is
    /// spanned by the two latitudes. The longitude interval is the shorter of
    /// the two arcs connecting the two longitudes.
    pub fn from_corners(a: Coord, b: Coord) -> Self {
        let (lo, hi) = if a.x <= b.x { (a.x, b.x) } else { (b.x, a.x) };
        let (west, east) = if hi - lo <= 180.0 { (lo, hi) } else { (hi, lo) };
        Self {
            south: a.y.min(b.y),
            north: a.y.max(b.y),
            west,
            east,
        }
    }

    /// The smallest bounds containing the spherical cap around `center`
    pub fn around_cap(center: Coord, radius_meters: f64) -> Self {
        let d = (radius_meters / EARTH_RADIUS_METERS).to_degrees();
        let south = center.y - d;
        let north = center.y + d;

        // the cap contains a pole
        if south <= -90.0 || north >= 90.0 {
            return Self {
                south: south.max(-90.0),
                north: north.min(90.0),
                west: -180.0,
                east: 180.0,
            };
        }

        let ratio = d.to_radians().sin() / center.y.to_radians().cos();
        if ratio >= 1.0 {
            return Self {
                south,
                north,
                west: -180.0,
                east: 180.0,
            };
        }

        let dlon = ratio.asin().to_degrees();
        let mut west = center.x - dlon;
        let mut east = center.x + dlon;
        if west < -180.0 {
            west += 360.0;
        }
        if east > 180.0 {
            east -= 360.0;
        }
        Self {
            south,
            north,
            west,
            east,
        }
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    /// The longitude interval split at the antimeridian
    pub fn lon_intervals(&self) -> Vec<(f64, f64)> {
        if self.crosses_antimeridian() {
            vec![(self.west, 180.0), (-180.0, self.east)]
        } else {
            vec![(self.west, self.east)]
        }
    }

    /// Boundary-inclusive containment test
    pub fn contains(&self, c: Coord) -> bool {
        if c.y < self.south || c.y > self.north {
            return false;
        }
        if self.crosses_antimeridian() {
            c.x >= self.west || c.x <= self.east
        } else {
            c.x >= self.west && c.x <= self.east
        }
    }
}

/// Remove consecutive duplicate vertices and an explicit closing vertex
pub(crate) fn normalize_ring(ring: &[Coord]) -> Vec<Coord> {
    let mut ring = ring.to_vec();
    ring.dedup();
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}

/// Convert a normalized ring into a polygon in latitude/longitude space
pub(crate) fn ring_to_polygon(ring: &[Coord]) -> Polygon {
    Polygon::new(LineString::from(ring.to_vec()), vec![])
}

fn validate_ring(ring: &[Coord]) -> Result<()> {
    for v in ring {
        validate_coordinate(v.y, v.x)?;
    }

    if ring.len() < 3 {
        return Err(Error::invalid_geometry(format!(
            "polygon ring needs at least 3 distinct vertices, got {}",
            ring.len()
        )));
    }

    let n = ring.len();
    for i in 0..n {
        if (ring[(i + 1) % n].x - ring[i].x).abs() >= 180.0 {
            return Err(Error::invalid_geometry(
                "polygon ring crosses the antimeridian or a pole",
            ));
        }
    }

    // edges are straight lines in the projected plane
    let spherical = SphericalRing::new(ring)?;
    let projected = spherical.projected().exterior();
    let edges = projected.lines().collect::<Vec<_>>();

    // adjacent edges may only share their common vertex
    for i in 0..n {
        let a = edges[i];
        let b = edges[(i + 1) % n];
        let (dx1, dy1) = (a.end.x - a.start.x, a.end.y - a.start.y);
        let (dx2, dy2) = (b.end.x - b.start.x, b.end.y - b.start.y);
        let cross = dx1 * dy2 - dy1 * dx2;
        let dot = dx1 * dx2 + dy1 * dy2;
        let scale = dx1.hypot(dy1) * dx2.hypot(dy2);
        if cross.abs() <= 1e-12 * scale && dot < 0.0 {
            return Err(Error::invalid_geometry(format!(
                "polygon ring folds back on itself at vertex {}",
                (i + 1) % n
            )));
        }
    }

    for i in 0..n {
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            if edges[i].intersects(&edges[j]) {
                return Err(Error::invalid_geometry(format!(
                    "polygon ring intersects itself (edges {i} and {j})"
                )));
            }
        }
    }

    if spherical.projected().unsigned_area() == 0.0 {
        return Err(Error::invalid_geometry("polygon ring has no area"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use assertor::{assert_that, BooleanAssertion, EqualityAssertion, ResultAssertion};

    use crate::error::Error;

    use super::{lat_lon, validate_coordinate, LatLonBounds, Region};

    fn assert_invalid_geometry(r: crate::error::Result<Region>) {
        assert!(matches!(r, Err(Error::InvalidGeometry(_))), "{r:?}");
    }

    #[test]
    fn coordinates() {
        assert_that!(validate_coordinate(43.0, -107.0)).is_ok();
        assert_that!(validate_coordinate(90.0, 180.0)).is_ok();
        assert_that!(validate_coordinate(-90.0, -180.0)).is_ok();
        assert!(matches!(
            validate_coordinate(90.5, 0.0),
            Err(Error::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            validate_coordinate(0.0, -180.1),
            Err(Error::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            validate_coordinate(f64::NAN, 0.0),
            Err(Error::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn swapped_corners() {
        // Wyoming, given with the northern latitude first
        let b = LatLonBounds::from_corners(
            lat_lon(44.984924, -111.044691),
            lat_lon(41.003994, -104.057992),
        );
        assert_that!(b.south).is_equal_to(41.003994);
        assert_that!(b.north).is_equal_to(44.984924);
        assert_that!(b.west).is_equal_to(-111.044691);
        assert_that!(b.east).is_equal_to(-104.057992);
        assert_that!(b.contains(lat_lon(43.0, -107.0))).is_true();
        assert_that!(b.contains(lat_lon(40.0, -107.0))).is_false();
    }

    #[test]
    fn antimeridian_box() {
        let b = LatLonBounds::from_corners(lat_lon(-10.0, 170.0), lat_lon(10.0, -170.0));
        assert_that!(b.crosses_antimeridian()).is_true();
        assert_that!(b.lon_intervals()).is_equal_to(vec![(170.0, 180.0), (-180.0, -170.0)]);
        assert_that!(b.contains(lat_lon(0.0, 179.0))).is_true();
        assert_that!(b.contains(lat_lon(0.0, -175.0))).is_true();
        assert_that!(b.contains(lat_lon(0.0, 0.0))).is_false();
    }

    #[test]
    fn cap_bounds() {
        let center = lat_lon(40.782865, -73.965355);
        let b = LatLonBounds::around_cap(center, 20000.0);
        assert_that!(b.crosses_antimeridian()).is_false();
        assert_that!(b.contains(center)).is_true();
        assert_that!(b.north - b.south > 0.35 && b.north - b.south < 0.37).is_true();
        // longitude degrees are shorter at this latitude
        assert_that!(b.east - b.west > b.north - b.south).is_true();

        let polar = LatLonBounds::around_cap(lat_lon(89.9, 0.0), 50000.0);
        assert_that!(polar.north).is_equal_to(90.0);
        assert_that!(polar.west).is_equal_to(-180.0);
        assert_that!(polar.east).is_equal_to(180.0);

        let wrapping = LatLonBounds::around_cap(lat_lon(0.0, 179.9), 50000.0);
        assert_that!(wrapping.crosses_antimeridian()).is_true();
    }

    #[test]
    fn circle_radius() {
        assert_that!(Region::circle(lat_lon(0.0, 0.0), 0.0)).is_ok();
        assert_invalid_geometry(Region::circle(lat_lon(0.0, 0.0), -1.0));
        assert_invalid_geometry(Region::circle(lat_lon(0.0, 0.0), f64::INFINITY));
        assert!(matches!(
            Region::circle(lat_lon(95.0, 0.0), 10.0),
            Err(Error::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn polygon_normalization() {
        let r = Region::polygon(vec![
            lat_lon(0.0, 0.0),
            lat_lon(0.0, 1.0),
            lat_lon(0.0, 1.0),
            lat_lon(1.0, 1.0),
            lat_lon(0.0, 0.0),
        ])
        .unwrap();
        assert_that!(r).is_equal_to(Region::Polygon {
            ring: vec![lat_lon(0.0, 0.0), lat_lon(0.0, 1.0), lat_lon(1.0, 1.0)],
        });
    }

    #[test]
    fn degenerate_polygons() {
        assert_invalid_geometry(Region::polygon(vec![lat_lon(0.0, 0.0), lat_lon(1.0, 1.0)]));

        // only two distinct vertices
        assert_invalid_geometry(Region::polygon(vec![
            lat_lon(0.0, 0.0),
            lat_lon(1.0, 1.0),
            lat_lon(0.0, 0.0),
            lat_lon(1.0, 1.0),
        ]));

        // on one meridian
        assert_invalid_geometry(Region::polygon(vec![
            lat_lon(0.0, 0.0),
            lat_lon(1.0, 0.0),
            lat_lon(2.0, 0.0),
        ]));

        // bow tie
        assert_invalid_geometry(Region::polygon(vec![
            lat_lon(0.0, 0.0),
            lat_lon(0.0, 1.0),
            lat_lon(1.0, 0.0),
            lat_lon(1.0, 1.0),
        ]));

        // spike folding back onto the previous edge
        assert_invalid_geometry(Region::polygon(vec![
            lat_lon(0.0, 0.0),
            lat_lon(0.0, 2.0),
            lat_lon(0.0, 1.0),
            lat_lon(1.0, 1.0),
        ]));

        assert_invalid_geometry(Region::polygon(vec![
            lat_lon(0.0, 179.0),
            lat_lon(1.0, -179.0),
            lat_lon(-1.0, -179.0),
        ]));

        // the first edge runs over the north pole
        assert_invalid_geometry(Region::polygon(vec![
            lat_lon(80.0, -90.0),
            lat_lon(80.0, 90.0),
            lat_lon(70.0, 0.0),
        ]));

        // a band around the equator
        let band = (0..12)
            .map(|i| lat_lon(10.0, -165.0 + 30.0 * i as f64))
            .chain((0..12).rev().map(|i| lat_lon(-10.0, -165.0 + 30.0 * i as f64)))
            .collect::<Vec<_>>();
        assert_invalid_geometry(Region::polygon(band));
    }

    #[test]
    fn valid_polygons() {
        // concave
        assert_that!(Region::polygon(vec![
            lat_lon(0.0, 0.0),
            lat_lon(0.0, 4.0),
            lat_lon(4.0, 4.0),
            lat_lon(1.0, 2.0),
            lat_lon(4.0, 0.0),
        ]))
        .is_ok();

        // clockwise and counter-clockwise
        let ccw = vec![lat_lon(0.0, 0.0), lat_lon(0.0, 1.0), lat_lon(1.0, 1.0)];
        let mut cw = ccw.clone();
        cw.reverse();
        assert_that!(Region::polygon(ccw)).is_ok();
        assert_that!(Region::polygon(cw)).is_ok();
    }

    #[test]
    fn validate_constructed_variants() {
        let r = Region::Polygon {
            ring: vec![lat_lon(0.0, 0.0), lat_lon(1.0, 1.0)],
        };
        assert!(matches!(r.validate(), Err(Error::InvalidGeometry(_))));

        let r = Region::BoundingBox {
            lower_left: lat_lon(0.0, 0.0),
            upper_right: lat_lon(0.0, 200.0),
        };
        assert!(matches!(r.validate(), Err(Error::InvalidCoordinate { .. })));
    }
}
