//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::engine::MemoryEngine;
use crate::error::{CacheError, Result};
use crate::models::{
    FlushResponse, GetResponse, HealthResponse, SetRequest, SetResponse, StatsResponse,
};
use crate::overlay::Overlay;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Overlay over the bundled engine
    pub overlay: Arc<Overlay<MemoryEngine>>,
}

impl AppState {
    /// Creates a new AppState around an opened overlay.
    pub fn new(overlay: Overlay<MemoryEngine>) -> Self {
        Self {
            overlay: Arc::new(overlay),
        }
    }
}

/// Handler for PUT /set
///
/// Stores a key-value pair. A missing or non-positive TTL makes it permanent.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let expire_seconds = req.expire_seconds();
    state
        .overlay
        .put(&req.key, req.value.as_bytes(), expire_seconds)
        .await?;

    Ok(Json(SetResponse::new(req.key, expire_seconds <= 0)))
}

/// Handler for GET /get/:key
///
/// Retrieves a value, falling back to the permanent store on an engine miss.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let value = state.overlay.fetch(&key).await?;

    Ok(Json(GetResponse::new(key, &value)))
}

/// Handler for POST /flush
///
/// Writes a snapshot immediately.
pub async fn flush_handler(State(state): State<AppState>) -> Result<Json<FlushResponse>> {
    let report = state.overlay.flush().await?;

    Ok(Json(FlushResponse::from_report(report)))
}

/// Handler for GET /stats
///
/// Returns engine and overlay statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let engine = state.overlay.engine().stats();
    let overlay = state.overlay.stats().await;

    Json(StatsResponse::new(&engine, overlay))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
