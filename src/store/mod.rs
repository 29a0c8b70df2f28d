//! Persistence and spatial query layer for classified roads.

mod index;
mod indexed;
pub mod snapshot;

pub use index::{compute_envelope, IndexedEnvelope, RoadIndex};
pub use indexed::IndexedRoadStore;

use chrono::{DateTime, Utc};
use geo::LineString;
use serde::Serialize;

use crate::bounds::BoundingBox;
use crate::error::{QueryError, StorageError};

/// Maximum rows returned by a bounding-box query
pub const BOUNDS_RESULT_LIMIT: usize = 1000;

/// Maximum matches returned by a name search
pub const SEARCH_RESULT_LIMIT: usize = 10;

/// A classified road, as written by ingestion
#[derive(Clone, Debug, PartialEq)]
pub struct RoadSegment {
    pub external_id: u64,
    pub name: Option<String>,
    pub highway_type: String,
    pub width_m: Option<f64>,
    pub max_speed_kph: Option<u32>,
    pub is_accessible: bool,
    pub geometry: LineString<f64>,
}

/// A stored row: the segment plus the identity and timestamp the store owns
#[derive(Clone, Debug, PartialEq)]
pub struct StoredRoad {
    pub id: u64,
    pub segment: RoadSegment,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NameMatch {
    pub id: u64,
    pub name: String,
    pub highway_type: String,
    /// Vertex mean as `[lon, lat]`
    pub centroid: [f64; 2],
}

/// Aggregates over the whole table, keyed for the map client
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RoadStats {
    pub total_roads: usize,
    pub accessible_roads: usize,
    /// Mean over rows with a known width
    #[serde(rename = "avg_width")]
    pub avg_width_meters: Option<f64>,
    /// Highest known limit
    #[serde(rename = "max_speed_limit")]
    pub max_speed_limit_kph: Option<u32>,
}

/// Storage contract shared by ingestion and the query API.
///
/// Implementations handle their own locking; callers share one handle
/// (usually behind an `Arc`) without extra synchronization.
pub trait RoadStore: Send + Sync {
    /// Cheap liveness check, run before an ingestion or on a health check
    fn check_connection(&self) -> Result<(), StorageError>;

    /// Insert by `external_id`, or overwrite every mutable field of the
    /// existing row. Row id is kept across updates.
    fn upsert(&self, segment: RoadSegment) -> Result<UpsertOutcome, StorageError>;

    /// Accessible rows whose geometry intersects `bounds`, at most
    /// [`BOUNDS_RESULT_LIMIT`], in row id order.
    fn query_by_bounds(&self, bounds: &BoundingBox) -> Result<Vec<StoredRoad>, StorageError>;

    /// Case-insensitive substring search over accessible named rows, at most
    /// [`SEARCH_RESULT_LIMIT`] distinct names.
    fn search_by_name(&self, query: &str) -> Result<Vec<NameMatch>, QueryError>;

    fn stats(&self) -> Result<RoadStats, StorageError>;

    fn get(&self, external_id: u64) -> Result<Option<StoredRoad>, StorageError>;
}

/// Reject rows the store must never hold
pub fn validate(segment: &RoadSegment) -> Result<(), StorageError> {
    let points = segment.geometry.0.len();
    if points < 2 {
        return Err(StorageError::Constraint(format!(
            "way {} has {} point(s), at least 2 required",
            segment.external_id, points
        )));
    }

    if segment
        .geometry
        .coords()
        .any(|c| !c.x.is_finite() || !c.y.is_finite())
    {
        return Err(StorageError::Constraint(format!(
            "way {} has non-finite coordinates",
            segment.external_id
        )));
    }

    if let Some(width) = segment.width_m {
        if !width.is_finite() {
            return Err(StorageError::Constraint(format!(
                "way {} has non-finite width",
                segment.external_id
            )));
        }
    }

    Ok(())
}
