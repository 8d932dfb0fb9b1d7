//! API Handlers
//!
//! HTTP request handlers for the admin endpoints.

use axum::{extract::State, Json};

use crate::cache::SharedCache;
use crate::models::{HealthResponse, StatsResponse};

/// Application state shared across all handlers.
///
/// Holds the same cache the proxy serves from.
#[derive(Clone)]
pub struct AppState {
    /// Shared cache store
    pub cache: SharedCache,
}

impl AppState {
    /// Creates a new AppState over the proxy's cache.
    pub fn new(cache: SharedCache) -> Self {
        Self { cache }
    }
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.cache.lock().await;
    let stats = cache.stats();

    Json(StatsResponse::new(
        &stats,
        cache.capacity(),
        cache.ttl().as_secs_f64(),
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
