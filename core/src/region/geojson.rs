//! Polygons from GeoJSON documents

use std::io::Read;

use anyhow::{bail, Context};
use serde_json::Value;

use crate::error::{Error, Result};

use super::{lat_lon, Coord, Region};

impl Region {
    /// Create a polygon from a GeoJSON `Polygon` geometry. Only the outer
    /// ring is used. Positions are either `[lon, lat]` arrays or objects
    /// with `latitude` and `longitude` fields.
    pub fn from_geojson(geometry: &Value) -> Result<Region> {
        let kind = geometry.get("type").and_then(Value::as_str);
        if kind != Some("Polygon") {
            return Err(Error::invalid_geometry(format!(
                "expected a GeoJSON Polygon, got {}",
                kind.unwrap_or("no type")
            )));
        }

        let ring = geometry
            .get("coordinates")
            .and_then(|c| c.get(0))
            .and_then(Value::as_array)
            .ok_or_else(|| Error::invalid_geometry("GeoJSON Polygon has no outer ring"))?;

        let ring = ring
            .iter()
            .enumerate()
            .map(|(i, p)| {
                position(p).ok_or_else(|| {
                    Error::invalid_geometry(format!("invalid position {i} in GeoJSON Polygon: {p}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Region::polygon(ring)
    }
}

fn position(p: &Value) -> Option<Coord> {
    match p {
        Value::Array(a) => {
            let lon = a.first()?.as_f64()?;
            let lat = a.get(1)?.as_f64()?;
            Some(lat_lon(lat, lon))
        }
        Value::Object(o) => {
            let lat = o.get("latitude")?.as_f64()?;
            let lon = o.get("longitude")?.as_f64()?;
            Some(lat_lon(lat, lon))
        }
        _ => None,
    }
}

/// The geometry of a Feature, a document with a `loc` field, or the
/// document itself
fn geometry_of(doc: &Value) -> &Value {
    if doc.get("type").and_then(Value::as_str) == Some("Feature") {
        if let Some(g) = doc.get("geometry") {
            return g;
        }
    }
    doc.get("loc").unwrap_or(doc)
}

fn code_of(doc: &Value) -> Option<&str> {
    doc.get("code")
        .or_else(|| doc.get("properties").and_then(|p| p.get("code")))
        .and_then(Value::as_str)
}

/// Read a polygon from a GeoJSON file. The file may contain a single
/// geometry, a Feature, a FeatureCollection, an array of documents, or one
/// document per line. If `code` is given, the first document whose `code`
/// (or `properties.code`) matches is used. Otherwise, the first document.
pub fn read_polygon(mut reader: impl Read, code: Option<&str>) -> anyhow::Result<Region> {
    let mut contents = String::new();
    reader
        .read_to_string(&mut contents)
        .context("Unable to read GeoJSON")?;

    let docs = match serde_json::from_str::<Value>(&contents) {
        Ok(Value::Array(docs)) => docs,
        Ok(mut doc) => match doc.get_mut("features").map(Value::take) {
            Some(Value::Array(features)) => features,
            _ => vec![doc],
        },
        Err(_) => contents
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty())
            .map(|(i, l)| {
                serde_json::from_str(l).with_context(|| format!("Invalid GeoJSON in line {}", i + 1))
            })
            .collect::<anyhow::Result<Vec<_>>>()?,
    };

    let doc = match code {
        Some(code) => docs.iter().find(|d| code_of(d) == Some(code)),
        None => docs.first(),
    };
    let Some(doc) = doc else {
        match code {
            Some(code) => bail!("No polygon with code `{code}'"),
            None => bail!("GeoJSON contains no polygon"),
        }
    };

    Ok(Region::from_geojson(geometry_of(doc))?)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use assertor::{assert_that, EqualityAssertion, StringAssertion};
    use serde_json::json;

    use crate::{
        error::Error,
        region::{lat_lon, Region},
    };

    use super::read_polygon;

    fn triangle() -> Region {
        Region::polygon(vec![
            lat_lon(41.0, -73.7),
            lat_lon(42.0, -73.5),
            lat_lon(41.3, -71.8),
        ])
        .unwrap()
    }

    #[test]
    fn geometry() {
        let r = Region::from_geojson(&json!({
            "type": "Polygon",
            "coordinates": [[[-73.7, 41.0], [-73.5, 42.0], [-71.8, 41.3], [-73.7, 41.0]]]
        }))
        .unwrap();
        assert_that!(r).is_equal_to(triangle());
    }

    #[test]
    fn object_positions() {
        let r = Region::from_geojson(&json!({
            "type": "Polygon",
            "coordinates": [[
                { "latitude": 41.0, "longitude": -73.7 },
                { "latitude": 42.0, "longitude": -73.5 },
                { "latitude": 41.3, "longitude": -71.8 }
            ]]
        }))
        .unwrap();
        assert_that!(r).is_equal_to(triangle());
    }

    #[test]
    fn invalid_geometries() {
        let point = Region::from_geojson(&json!({ "type": "Point", "coordinates": [1.0, 2.0] }));
        assert!(matches!(point, Err(Error::InvalidGeometry(_))));

        let bad_position = Region::from_geojson(&json!({
            "type": "Polygon",
            "coordinates": [[[-73.7, 41.0], [-73.5], [-71.8, 41.3]]]
        }));
        assert!(matches!(bad_position, Err(Error::InvalidGeometry(_))));

        let out_of_range = Region::from_geojson(&json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 95.0], [1.0, 0.0], [0.0, 1.0]]]
        }));
        assert!(matches!(out_of_range, Err(Error::InvalidCoordinate { .. })));
    }

    #[test]
    fn documents_by_code() {
        let data = "\
{\"_id\":\"1\",\"name\":\"Wyoming\",\"code\":\"WY\",\"loc\":{\"type\":\"Polygon\",\"coordinates\":[[[-111.0,45.0],[-104.0,45.0],[-104.0,41.0],[-111.0,41.0]]]}}

{\"_id\":\"2\",\"name\":\"Connecticut\",\"code\":\"CT\",\"loc\":{\"type\":\"Polygon\",\"coordinates\":[[[-73.7,41.0],[-73.5,42.0],[-71.8,41.3]]]}}
";
        let r = read_polygon(Cursor::new(data), Some("CT")).unwrap();
        assert_that!(r).is_equal_to(triangle());

        let first = read_polygon(Cursor::new(data), None).unwrap();
        assert_that!(first.kind()).is_equal_to("polygon");

        let err = read_polygon(Cursor::new(data), Some("TX")).unwrap_err();
        assert_that!(err.to_string()).contains("TX");
    }

    #[test]
    fn feature_collection() {
        let data = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": { "code": "CT" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-73.7, 41.0], [-73.5, 42.0], [-71.8, 41.3], [-73.7, 41.0]]]
                }
            }]
        })
        .to_string();
        let r = read_polygon(Cursor::new(data), Some("CT")).unwrap();
        assert_that!(r).is_equal_to(triangle());

        let err = read_polygon(Cursor::new("{\"_id\":\n"), None).unwrap_err();
        assert_that!(format!("{err:#}")).contains("line 1");
    }
}
