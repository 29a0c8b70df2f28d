//! HTTP query API over a shared road store.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::bounds::BoundingBox;
use crate::error::{QueryError, StorageError};
use crate::roads::geometry::{self, LineStringGeometry};
use crate::roads::{CandidateRoad, FilterOutcome, QueryFilter};
use crate::store::{RoadStats, RoadStore, StoredRoad};

/// Everything a handler needs, passed in explicitly
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RoadStore>,
    pub filter: QueryFilter,
}

impl AppState {
    pub fn new(store: Arc<dyn RoadStore>) -> Self {
        AppState {
            store,
            filter: QueryFilter::default(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/db-check", get(db_check_handler))
        .route("/api/map/roads", get(roads_handler))
        .route("/api/map/search", get(search_handler))
        .route("/api/map/stats", get(stats_handler))
        .route("/api/map/filter-roads", post(filter_roads_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(state: AppState, addr: &str) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    log::info!("Serving road API at http://{}", listener.local_addr()?);

    axum::serve(listener, router(state)).await
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::InvalidBounds(_) | QueryError::InvalidQuery(_) => {
                ApiError::BadRequest(e.to_string())
            }
            QueryError::Storage(e) => e.into(),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, "Bad Request", message),
            ApiError::Internal(message) => {
                log::error!("Request failed: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error", message)
            }
        };

        (status, Json(json!({ "error": error, "message": message }))).into_response()
    }
}

#[derive(Serialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: &'static str,
    features: Vec<Feature>,
}

#[derive(Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
    properties: RoadProperties,
    geometry: LineStringGeometry,
}

#[derive(Serialize)]
struct RoadProperties {
    id: u64,
    osm_id: u64,
    name: Option<String>,
    highway_type: String,
    width: Option<f64>,
    max_speed: Option<u32>,
    is_accessible: bool,
}

impl From<StoredRoad> for Feature {
    fn from(road: StoredRoad) -> Self {
        let geometry = geometry::encode(&road.segment.geometry);
        let segment = road.segment;

        Feature {
            kind: "Feature",
            properties: RoadProperties {
                id: road.id,
                osm_id: segment.external_id,
                name: segment.name,
                highway_type: segment.highway_type,
                width: segment.width_m,
                max_speed: segment.max_speed_kph,
                is_accessible: segment.is_accessible,
            },
            geometry,
        }
    }
}

#[derive(Deserialize)]
struct SearchParams {
    q: Option<String>,
}

#[derive(Serialize)]
struct SearchResult {
    id: u64,
    name: String,
    #[serde(rename = "type")]
    highway_type: String,
    center: [f64; 2],
}

#[derive(Deserialize)]
struct FilterRequest {
    #[serde(default)]
    roads: Vec<CandidateRoad>,
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn db_check_handler(State(state): State<AppState>) -> Response {
    match state.store.check_connection() {
        Ok(()) => Json(json!({
            "status": "ok",
            "message": "Road store is reachable",
            "timestamp": Utc::now().to_rfc3339(),
        }))
        .into_response(),
        Err(e) => {
            log::error!("Store check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "message": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn roads_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<FeatureCollection>, ApiError> {
    let bounds = BoundingBox::from_query(
        params.get("north").map(String::as_str),
        params.get("south").map(String::as_str),
        params.get("east").map(String::as_str),
        params.get("west").map(String::as_str),
    )?;

    let roads = state.store.query_by_bounds(&bounds)?;

    Ok(Json(FeatureCollection {
        kind: "FeatureCollection",
        features: roads.into_iter().map(Feature::from).collect(),
    }))
}

async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let matches = state
        .store
        .search_by_name(params.q.as_deref().unwrap_or_default())?;

    let results: Vec<SearchResult> = matches
        .into_iter()
        .map(|m| SearchResult {
            id: m.id,
            name: m.name,
            highway_type: m.highway_type,
            center: m.centroid,
        })
        .collect();

    Ok(Json(json!({ "results": results })))
}

async fn stats_handler(State(state): State<AppState>) -> Result<Json<RoadStats>, ApiError> {
    Ok(Json(state.store.stats()?))
}

async fn filter_roads_handler(
    State(state): State<AppState>,
    Json(request): Json<FilterRequest>,
) -> Json<FilterOutcome> {
    Json(state.filter.filter(request.roads))
}
