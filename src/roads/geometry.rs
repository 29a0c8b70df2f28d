use geo::{Coord, LineString};
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

const LINE_STRING: &str = "LineString";

/// Vertex as delivered by Overpass `out geom` (degrees, WGS84)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Wire and storage form of a road geometry.
///
/// Serializes as a GeoJSON LineString: `{"type": "LineString", "coordinates": [[lon, lat], ...]}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineStringGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<[f64; 2]>,
}

impl LineStringGeometry {
    /// Convert back to the internal polyline, keeping vertex order
    pub fn decode(&self) -> Result<LineString<f64>, DecodeError> {
        if self.kind != LINE_STRING {
            return Err(DecodeError::UnsupportedGeometry(self.kind.clone()));
        }

        Ok(LineString::new(
            self.coordinates
                .iter()
                .map(|&[lon, lat]| Coord { x: lon, y: lat })
                .collect(),
        ))
    }
}

/// Build a polyline from source vertices.
///
/// Coordinates are copied as-is (x = lon, y = lat). Never fails; an empty
/// input gives an empty line and the caller decides whether it is usable.
pub fn decode(raw: &[RawPoint]) -> LineString<f64> {
    LineString::new(raw.iter().map(|p| Coord { x: p.lon, y: p.lat }).collect())
}

pub fn encode(line: &LineString<f64>) -> LineStringGeometry {
    LineStringGeometry {
        kind: LINE_STRING.to_string(),
        coordinates: line.coords().map(|c| [c.x, c.y]).collect(),
    }
}

/// Arithmetic mean of the vertices, as `[lon, lat]`.
///
/// Used for display only; this is not the length-weighted centroid of the line.
pub fn centroid(line: &LineString<f64>) -> Option<[f64; 2]> {
    let count = line.0.len();
    if count == 0 {
        return None;
    }

    let (sum_x, sum_y) = line
        .coords()
        .fold((0.0, 0.0), |(sx, sy), c| (sx + c.x, sy + c.y));

    Some([sum_x / count as f64, sum_y / count as f64])
}
