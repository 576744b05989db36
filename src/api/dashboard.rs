//! Dashboard endpoints.

use super::{ApiError, AppState, RangeQuery};
use crate::dashboard::{DashboardData, DashboardHandle};
use crate::kpi::Kpis;
use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

/// GET /api/dashboard - Data for the selected range, read through the cache.
pub async fn handle(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<DashboardData>, ApiError> {
    let range = query.resolve(state.cache.zone(), state.cache.now())?;
    let view = DashboardHandle::mount(state.cache.clone(), range).await;
    Ok(Json(view.data()))
}

/// POST /api/refresh - Forced reload of the selected range.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<DashboardData>, ApiError> {
    let range = query.resolve(state.cache.zone(), state.cache.now())?;
    let view = DashboardHandle::mount(state.cache.clone(), range).await;
    view.refresh().await;

    let data = view.data();
    if let Some(error) = &data.error {
        tracing::warn!(
            error = %error,
            network = data.is_network_error,
            "Refresh finished with an error"
        );
    }
    Ok(Json(data))
}

/// GET /api/kpis - Indicators for the selected range.
pub async fn kpis(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Kpis>, ApiError> {
    let range = query.resolve(state.cache.zone(), state.cache.now())?;
    let view = DashboardHandle::mount(state.cache.clone(), range).await;
    Ok(Json(Kpis::from(&view.data())))
}
