//! Road accessibility data pipeline.
//!
//! Ways fetched from Overpass are decoded, classified for small-vehicle
//! access and upserted into a spatially indexed store, which then serves
//! bounding-box, name and aggregate queries.

pub mod bounds;
pub mod config;
pub mod error;
pub mod ingest;
pub mod overpass;
pub mod roads;
pub mod server;
pub mod store;

pub use error::{DecodeError, FetchError, IngestError, QueryError, StorageError};
pub use ingest::{IngestionPipeline, IngestionReport};
pub use roads::{AccessibilityClassifier, QueryFilter};
pub use store::{IndexedRoadStore, RoadStore};
