//! Overpass API source: query building, fetching and element decoding.

mod elements;
mod fetcher;

pub use elements::{parse_overpass_json, ElementKind, RawElement};
pub use fetcher::{OverpassFetcher, DEFAULT_OVERPASS_URL, DEFAULT_TIMEOUT_SECS, HIGHWAY_FILTER};

use crate::bounds::BoundingBox;
use crate::error::FetchError;

/// Where ingestion pulls raw way records from.
///
/// One call per ingestion run. An error aborts the run.
#[allow(async_fn_in_trait)]
pub trait WaySource {
    async fn fetch_ways(&self, bounds: &BoundingBox) -> Result<Vec<RawElement>, FetchError>;
}
