use geo::{coord, Area, Coord, Densify, DensifyHaversine, Polygon, Rect};
use h3o::{
    geom::{ContainmentMode, PolyfillConfig, ToCells},
    CellIndex, LatLng, Resolution,
};
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::{
    error::{Error, Result},
    region::{
        lat_lon, normalize_ring, ring_to_polygon, validate_coordinate, LatLonBounds, Region,
        SphericalRing, EARTH_RADIUS_METERS,
    },
};

use super::{cell_id, CellRange, GeometryEngine};

/// Widest longitude span of a single planar box handed to the polyfill.
/// Wider boxes are split.
const MAX_BOX_WIDTH: f64 = 90.0;

/// A [`GeometryEngine`] based on the H3 hierarchical grid. Polygon edges
/// and distances follow great circles.
#[derive(Debug, Default, Clone, Copy)]
pub struct H3Engine;

impl GeometryEngine for H3Engine {
    fn cell_id_for_point(&self, lat: f64, lon: f64) -> Result<u64> {
        validate_coordinate(lat, lon)?;
        let ll = LatLng::new(lat, lon).map_err(|_| Error::InvalidCoordinate { lat, lon })?;
        Ok(cell_id::from_cell(ll.to_cell(Resolution::Fifteen)))
    }

    fn cell_range(&self, cell_id: u64) -> CellRange {
        cell_id::range_of(cell_id)
    }

    fn cover(&self, region: &Region, depth: u8, max_cells: usize) -> Result<Vec<u64>> {
        region.validate()?;

        let footprint = Footprint::of(region);
        let depth = depth.min(15);
        let max_cells = max_cells.max(1);

        let mut resolution = Resolution::Zero;
        let mut cells = buffered_cells(&footprint, resolution)?;
        while u8::from(resolution) < depth {
            let Some(next) = resolution.succ() else {
                break;
            };
            let next_cells = buffered_cells(&footprint, next)?;
            if next_cells.len() > max_cells {
                break;
            }
            resolution = next;
            cells = next_cells;
        }

        debug!(
            region = region.kind(),
            resolution = u8::from(resolution),
            cells = cells.len(),
            "Computed covering"
        );

        let mut ids = cells.into_iter().map(cell_id::from_cell).collect::<Vec<_>>();
        ids.sort_unstable();
        Ok(ids)
    }

    fn point_in_polygon(&self, point: Coord, ring: &[Coord]) -> bool {
        let ring = normalize_ring(ring);
        if ring.len() < 3 {
            return false;
        }
        SphericalRing::new(&ring).is_ok_and(|r| r.contains(point))
    }

    fn great_circle_distance_m(&self, a: Coord, b: Coord) -> f64 {
        match (LatLng::new(a.y, a.x), LatLng::new(b.y, b.x)) {
            (Ok(a), Ok(b)) => a.distance_m(b),
            _ => f64::INFINITY,
        }
    }

    fn cell_center(&self, cell_id: u64) -> Option<Coord> {
        cell_id::to_cell(cell_id).map(|cell| {
            let ll = LatLng::from(cell);
            lat_lon(ll.lat(), ll.lng())
        })
    }
}

/// The region as latitude/longitude polygons for the polyfill
enum Footprint {
    /// Boxes whose edges follow parallels and meridians
    Boxes(Vec<Polygon>),

    /// A ring whose edges are great-circle arcs
    Geodesic(Polygon),
}

impl Footprint {
    fn of(region: &Region) -> Self {
        match region {
            Region::BoundingBox {
                lower_left,
                upper_right,
            } => Footprint::Boxes(boxes(&LatLonBounds::from_corners(*lower_left, *upper_right))),

            Region::Circle {
                center,
                radius_meters,
            } => Footprint::Boxes(boxes(&LatLonBounds::around_cap(*center, *radius_meters))),

            Region::Polygon { ring } => Footprint::Geodesic(ring_to_polygon(&normalize_ring(ring))),
        }
    }

    /// Polygons with straight latitude/longitude edges. Great-circle edges
    /// are densified so that the polygon follows them closely at the given
    /// resolution.
    fn polygons(&self, resolution: Resolution) -> Vec<Polygon> {
        match self {
            Footprint::Boxes(boxes) => boxes.clone(),
            Footprint::Geodesic(p) => vec![p.densify_haversine(sample_distance(resolution))],
        }
    }
}

/// Distance between two samples on a boundary in meters
fn sample_distance(resolution: Resolution) -> f64 {
    resolution.edge_length_m() / 2.0
}

fn boxes(bounds: &LatLonBounds) -> Vec<Polygon> {
    let mut result = Vec::new();
    for (west, east) in bounds.lon_intervals() {
        let chunks = ((east - west) / MAX_BOX_WIDTH).ceil().max(1.0);
        let step = (east - west) / chunks;
        for i in 0..chunks as usize {
            let w = west + step * i as f64;
            let e = if i + 1 == chunks as usize {
                east
            } else {
                w + step
            };
            let rect = Rect::new(
                coord! { x: w, y: bounds.south },
                coord! { x: e, y: bounds.north },
            );
            result.push(rect.to_polygon());
        }
    }
    result
}

/// Collect all cells at the given resolution that intersect the footprint or
/// contain one of its vertices and add their direct neighbors. The leaves of
/// a cell are not nested exactly inside it, but they always lie inside the
/// cell or one of its neighbors.
///
/// Polygons without area (points and segments) are sampled along their
/// boundary instead. Every point of the boundary lies in the cell of the
/// nearest sample or in one of its neighbors, so these samples get two rings
/// of neighbors.
fn buffered_cells(footprint: &Footprint, resolution: Resolution) -> Result<FxHashSet<CellIndex>> {
    let mut seeds = FxHashSet::default();
    let mut samples = FxHashSet::default();

    for p in footprint.polygons(resolution) {
        if p.unsigned_area() > 0.0 {
            for c in p.exterior().coords() {
                seeds.insert(cell_at(*c, resolution)?);
            }
            let poly = h3o::geom::Polygon::from_degrees(p)
                .map_err(|e| Error::invalid_geometry(e.to_string()))?;
            seeds.extend(
                poly.to_cells(PolyfillConfig::new(resolution).containment_mode(ContainmentMode::Covers)),
            );
        } else {
            // a degree of longitude is never longer than a degree of latitude
            let step = (sample_distance(resolution) / EARTH_RADIUS_METERS).to_degrees();
            for c in p.densify(step).exterior().coords() {
                samples.insert(cell_at(*c, resolution)?);
            }
        }
    }

    let mut cells = FxHashSet::default();
    for s in seeds {
        cells.extend(s.grid_disk::<Vec<_>>(1));
    }
    for s in samples {
        cells.extend(s.grid_disk::<Vec<_>>(2));
    }
    Ok(cells)
}

fn cell_at(c: Coord, resolution: Resolution) -> Result<CellIndex> {
    let ll = LatLng::new(c.y, c.x).map_err(|_| Error::InvalidCoordinate { lat: c.y, lon: c.x })?;
    Ok(ll.to_cell(resolution))
}
