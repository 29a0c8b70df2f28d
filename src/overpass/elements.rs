use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DecodeError, FetchError};
use crate::roads::geometry::RawPoint;
use crate::roads::tags::Tags;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Node,
    Way,
    Relation,
    #[serde(other)]
    Other,
}

/// One element of an Overpass `out geom` response.
///
/// Vertices Overpass could not resolve come back as `null` and are kept as
/// `None` so the way can be rejected instead of silently shortened.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawElement {
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(default)]
    pub geometry: Vec<Option<RawPoint>>,
}

impl RawElement {
    #[cfg(test)]
    pub fn way(id: u64, tags: Tags, points: &[(f64, f64)]) -> Self {
        RawElement {
            kind: ElementKind::Way,
            id,
            tags: Some(tags),
            geometry: points
                .iter()
                .map(|&(lon, lat)| Some(RawPoint { lat, lon }))
                .collect(),
        }
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.as_ref()?.get(key).map(String::as_str)
    }

    /// Every vertex, or an error naming how many are missing
    pub fn vertices(&self) -> Result<Vec<RawPoint>, DecodeError> {
        let missing = self.geometry.iter().filter(|p| p.is_none()).count();
        if missing > 0 {
            return Err(DecodeError::MissingVertices(missing));
        }
        Ok(self.geometry.iter().flatten().copied().collect())
    }
}

#[derive(Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<Value>,
    #[serde(default)]
    remark: Option<String>,
}

/// Decode an Overpass JSON body.
///
/// A runtime error reported in `remark` fails the whole response. Single
/// malformed elements are dropped with a warning.
///
/// # Arguments
/// * `body` - Raw response text from the interpreter endpoint
///
/// # Returns
/// Every well-formed element, in response order
pub fn parse_overpass_json(body: &str) -> Result<Vec<RawElement>, FetchError> {
    let response: OverpassResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::Parse(format!("Failed to parse Overpass JSON: {}", e)))?;

    if let Some(remark) = response.remark {
        if remark.contains("error") {
            return Err(FetchError::Overpass(remark));
        }
        log::warn!("Overpass remark: {}", remark);
    }

    let total = response.elements.len();
    let elements: Vec<RawElement> = response
        .elements
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<RawElement>(value) {
            Ok(element) => Some(element),
            Err(e) => {
                log::warn!("Dropping malformed Overpass element: {}", e);
                None
            }
        })
        .collect();

    if elements.len() < total {
        log::warn!("Dropped {} of {} Overpass element(s)", total - elements.len(), total);
    }

    Ok(elements)
}
