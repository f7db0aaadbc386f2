use geo::{
    coord, coordinate_position::CoordPos, CoordinatePosition, EuclideanDistance, LineString,
    Point, Polygon,
};

use crate::error::{Error, Result};

use super::Coord;

/// Minimum cosine of the angle between a vertex and the projection center.
/// Vertices closer to the horizon can't be projected reliably.
const MIN_COS: f64 = 1e-6;

/// Points closer than this to the projected ring are on its boundary. Near
/// the projection center this is a few micrometers on the ground.
const BOUNDARY_TOLERANCE: f64 = 1e-12;

type Vec3 = [f64; 3];

fn to_unit(c: Coord) -> Vec3 {
    let (lat, lon) = (c.y.to_radians(), c.x.to_radians());
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalize(a: Vec3) -> Option<Vec3> {
    let n = dot(a, a).sqrt();
    (n > 1e-12).then(|| [a[0] / n, a[1] / n, a[2] / n])
}

/// A polygon ring whose edges are great-circle arcs.
///
/// The ring is projected gnomonically onto the plane touching the sphere at
/// the normalized mean of its vertices. This projection maps great circles to
/// straight lines, so planar tests on the projected ring give exact answers
/// on the sphere. All vertices must lie in the open hemisphere around the
/// projection center. The ring denotes the area it encloses inside this
/// hemisphere. Clockwise and counter-clockwise rings denote the same area.
#[derive(Debug, Clone)]
pub struct SphericalRing {
    center: Vec3,
    east: Vec3,
    north: Vec3,
    projected: Polygon,
}

impl SphericalRing {
    pub fn new(ring: &[Coord]) -> Result<Self> {
        let vertices = ring.iter().map(|c| to_unit(*c)).collect::<Vec<_>>();
        let sum = vertices.iter().fold([0.0; 3], |acc, v| {
            [acc[0] + v[0], acc[1] + v[1], acc[2] + v[2]]
        });

        let too_large = || Error::invalid_geometry("polygon ring does not fit into a hemisphere");
        let center = normalize(sum).ok_or_else(too_large)?;
        if vertices.iter().any(|v| dot(*v, center) <= MIN_COS) {
            return Err(too_large());
        }

        // x points east and y points north, which keeps the orientation of
        // the ring as seen from outside the sphere
        let east = normalize(cross([0.0, 0.0, 1.0], center)).unwrap_or([0.0, 1.0, 0.0]);
        let north = cross(center, east);

        let mut result = Self {
            center,
            east,
            north,
            projected: Polygon::new(LineString::new(vec![]), vec![]),
        };
        let exterior = vertices
            .iter()
            .filter_map(|v| result.project_unit(*v))
            .collect::<Vec<_>>();
        result.projected = Polygon::new(LineString::from(exterior), vec![]);
        Ok(result)
    }

    fn project_unit(&self, v: Vec3) -> Option<Coord> {
        let d = dot(v, self.center);
        if d <= 0.0 {
            return None;
        }
        Some(coord! { x: dot(v, self.east) / d, y: dot(v, self.north) / d })
    }

    /// Project a coordinate into the plane of the ring. Returns `None` for
    /// coordinates in the opposite hemisphere.
    pub fn project(&self, c: Coord) -> Option<Coord> {
        self.project_unit(to_unit(c))
    }

    /// The projected ring
    pub fn projected(&self) -> &Polygon {
        &self.projected
    }

    /// Boundary-inclusive containment test
    pub fn contains(&self, c: Coord) -> bool {
        let Some(p) = self.project(c) else {
            return false;
        };
        match self.projected.coordinate_position(&p) {
            CoordPos::Inside | CoordPos::OnBoundary => true,
            CoordPos::Outside => {
                Point::from(p).euclidean_distance(self.projected.exterior()) <= BOUNDARY_TOLERANCE
            }
        }
    }
}
