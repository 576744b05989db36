//! Health and cache status handlers.

use super::{AppState, CacheStatusResponse, HealthResponse};
use axum::{extract::State, Json};
use std::sync::Arc;

/// GET /health - Service status.
pub async fn handle(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let cache = state.cache.get_cache_state();

    let status = if !state.config.gateway.is_configured() || cache.is_demo() {
        "demo"
    } else if cache.error.is_some() {
        "degraded"
    } else {
        "healthy"
    };

    Json(HealthResponse {
        status: status.to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        last_fetch: cache.last_fetch,
    })
}

/// GET /api/cache - Coordinator state without side effects.
pub async fn cache_status(State(state): State<Arc<AppState>>) -> Json<CacheStatusResponse> {
    let cache = state.cache.get_cache_state();
    let now = state.cache.now();

    Json(CacheStatusResponse {
        is_loading: cache.is_loading,
        is_revalidating: state.cache.is_revalidating(),
        is_demo: cache.is_demo(),
        last_fetch: cache.last_fetch,
        age_seconds: cache
            .last_fetch
            .map(|at| (now - at).num_seconds().max(0) as u64),
        date_range: cache.data.as_ref().and_then(|s| s.date_range),
        current_range: cache.current_range,
        error: cache.error.as_ref().map(|e| e.to_string()),
        is_network_error: cache.is_network_error,
        counts: cache.data.as_ref().map(|s| s.counts().into()),
        subscribers: state.cache.subscriber_count(),
    })
}
