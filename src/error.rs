use thiserror::Error;

/// Per-record problems found while turning a raw way into a road segment.
/// Always recoverable: the record is skipped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Element is not a way")]
    NotAWay,

    #[error("Missing highway tag")]
    MissingHighway,

    #[error("Geometry has {0} point(s), at least 2 required")]
    TooFewPoints(usize),

    #[error("Geometry has {0} missing vertex(es)")]
    MissingVertices(usize),

    #[error("Unsupported geometry type: {0}")]
    UnsupportedGeometry(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Constraint violated: {0}")]
    Constraint(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Read-path failures. The `Invalid*` variants are malformed parameters and
/// surface as a rejected request.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Failures talking to the external geographic data source.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network timeout")]
    Timeout,

    #[error("HTTP error: {0}")]
    Http(u16),

    #[error("Overpass error: {0}")]
    Overpass(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Run-level failures. These abort an ingestion run with nothing imported.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Storage check failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Source fetch failed: {0}")]
    Fetch(#[from] FetchError),
}
