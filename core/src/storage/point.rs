use geo::Coord;
use serde::{Deserialize, Serialize};

use crate::{query::Value, region::lat_lon};

/// The exact coordinates a point was indexed from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn coord(&self) -> Coord {
        lat_lon(self.lat, self.lon)
    }
}

/// A document in the point store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    #[serde(rename = "_id")]
    pub id: String,

    /// Id of the leaf cell containing the point
    #[serde(rename = "cellId")]
    pub cell_id: u64,

    #[serde(rename = "value", default)]
    pub payload: serde_json::Value,

    #[serde(rename = "loc", default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl Point {
    /// Look up a field by name. `_id`, `cellId` and `loc.lat`/`loc.lon`
    /// address the point itself, `value` and dotted paths starting with
    /// `value.` address the payload. Only scalar fields can be compared, so
    /// objects, arrays, booleans and nulls yield `None`.
    pub fn field(&self, path: &str) -> Option<Value> {
        match path {
            "_id" => Some(Value::String(self.id.clone())),
            "cellId" => Some(Value::Unsigned(self.cell_id)),
            "loc.lat" => self.location.map(|l| Value::Float(l.lat)),
            "loc.lon" => self.location.map(|l| Value::Float(l.lon)),
            "value" => json_scalar(&self.payload),
            _ => {
                let rest = path.strip_prefix("value.")?;
                let mut current = &self.payload;
                for segment in rest.split('.') {
                    current = match current {
                        serde_json::Value::Object(m) => m.get(segment)?,
                        serde_json::Value::Array(a) => a.get(segment.parse::<usize>().ok()?)?,
                        _ => return None,
                    };
                }
                json_scalar(current)
            }
        }
    }
}

fn json_scalar(v: &serde_json::Value) -> Option<Value> {
    match v {
        serde_json::Value::String(s) => Some(Value::String(s.clone())),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Value::Integer(i))
            } else if let Some(u) = n.as_u64() {
                Some(Value::Unsigned(u))
            } else {
                n.as_f64().map(Value::Float)
            }
        }
        _ => None,
    }
}
