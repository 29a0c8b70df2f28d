use std::time::Duration;

use super::{parse_overpass_json, RawElement, WaySource};
use crate::bounds::BoundingBox;
use crate::error::FetchError;

pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Highway classes requested from Overpass
pub const HIGHWAY_FILTER: &str = "motorway|trunk|primary|secondary|tertiary|unclassified|residential|service|living_street|pedestrian|cycleway|track|path|footway";

/// Overpass API client for fetching road ways with inline geometry
///
/// # Query Strategy
/// - One `out geom` query per bounding box, vertices inlined per way
/// - Server-side timeout matches the client timeout
///
/// # Error Handling
/// - Single attempt, no retries: re-running ingestion is the retry
/// - Client timeout and HTTP errors are reported as distinct [`FetchError`]s
/// - Runtime errors Overpass reports in `remark` fail the fetch
pub struct OverpassFetcher {
    client: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
}

impl OverpassFetcher {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("urbanway/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        OverpassFetcher {
            client,
            base_url: base_url.into(),
            timeout_secs,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build Overpass QL query for a bounding box
    ///
    /// # Query Format
    /// ```text
    /// [out:json][timeout:60][bbox:south,west,north,east];
    /// (
    ///   way["highway"~"motorway|trunk|..."];
    /// );
    /// out geom;
    /// ```
    pub fn build_query(&self, bounds: &BoundingBox) -> String {
        format!(
            "[out:json][timeout:{}][bbox:{},{},{},{}];\n\
            (\n  \
              way[\"highway\"~\"{}\"];\n\
            );\n\
            out geom;",
            self.timeout_secs,
            bounds.south,
            bounds.west,
            bounds.north,
            bounds.east,
            HIGHWAY_FILTER
        )
    }

    pub async fn fetch(&self, bounds: &BoundingBox) -> Result<Vec<RawElement>, FetchError> {
        let query = self.build_query(bounds);
        log::info!("Querying Overpass at {} for {}", self.base_url, bounds);

        let response = self
            .client
            .post(&self.base_url)
            .body(query)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http(status.as_u16()));
        }

        let body = response.text().await.map_err(map_transport_error)?;
        let elements = parse_overpass_json(&body)?;

        log::info!("Overpass returned {} element(s)", elements.len());
        Ok(elements)
    }
}

impl Default for OverpassFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_OVERPASS_URL, DEFAULT_TIMEOUT_SECS)
    }
}

impl WaySource for OverpassFetcher {
    async fn fetch_ways(&self, bounds: &BoundingBox) -> Result<Vec<RawElement>, FetchError> {
        self.fetch(bounds).await
    }
}

fn map_transport_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(e.to_string())
    }
}
