//! # Read API
//!
//! JSON endpoints over the cache coordinator for presentation clients.
//!
//! ## Endpoints
//!
//! - `GET /api/dashboard?start=YYYY-MM-DD&end=YYYY-MM-DD` or `?preset=last_7_days` -
//!   collections for the range plus loading, demo and error flags
//! - `POST /api/refresh` - same parameters, forces a reload first
//! - `GET /api/kpis` - same parameters, indicators computed over the range
//! - `GET /api/cache` - coordinator status and snapshot counts
//! - `GET /health` - `healthy`, `degraded` or `demo`
//! - `GET /metrics` - Prometheus text format
//!
//! ## Example
//!
//! ```no_run
//! use salespulse::api::{create_router, AppState};
//! use salespulse::cache::CacheCoordinator;
//! use salespulse::config::PulseConfig;
//! use salespulse::gateway::GatewayClient;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(PulseConfig::default());
//! let source = Arc::new(GatewayClient::new(config.gateway.clone())?);
//! let cache = CacheCoordinator::new(source, config.cache.clone());
//!
//! let state = Arc::new(AppState::new(
//!     config,
//!     cache,
//!     salespulse::metrics::handle_or_detached(),
//! ));
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3001").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Invalid range parameters are rejected with 400:
//! ```json
//! {
//!   "error": {
//!     "message": "unknown range preset 'fortnight'",
//!     "type": "invalid_request_error",
//!     "param": "preset",
//!     "code": "invalid_range"
//!   }
//! }
//! ```
//!
//! Fetch failures are never HTTP errors: the last good data is returned with
//! `error` and `isNetworkError` set.

mod dashboard;
mod health;
pub mod types;

pub use types::*;

use crate::cache::CacheCoordinator;
use crate::config::PulseConfig;
use crate::metrics::MetricsCollector;
use axum::{
    body::Body,
    http::Request,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub cache: CacheCoordinator,
    pub config: Arc<PulseConfig>,
    /// Server startup time for uptime tracking
    pub start_time: Instant,
    pub metrics_collector: Arc<MetricsCollector>,
}

impl AppState {
    pub fn new(
        config: Arc<PulseConfig>,
        cache: CacheCoordinator,
        prometheus_handle: PrometheusHandle,
    ) -> Self {
        let start_time = Instant::now();
        let metrics_collector = Arc::new(MetricsCollector::new(
            cache.clone(),
            start_time,
            prometheus_handle,
        ));

        Self {
            cache,
            config,
            start_time,
            metrics_collector,
        }
    }
}

/// Create the API router with all endpoints configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    let timeout = Duration::from_secs(state.config.server.request_timeout_seconds.max(1));

    Router::new()
        .route("/api/dashboard", get(dashboard::handle))
        .route("/api/refresh", post(dashboard::refresh))
        .route("/api/kpis", get(dashboard::kpis))
        .route("/api/cache", get(health::cache_status))
        .route("/health", get(health::handle))
        .route("/metrics", get(crate::metrics::handler::metrics_handler))
        .layer(TimeoutLayer::new(timeout))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| crate::logging::request_span(request)),
        )
        .with_state(state)
}
