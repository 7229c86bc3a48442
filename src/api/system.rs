//! System status, storage stats, and metrics scrape endpoint.

use axum::{Json, extract::State, response::IntoResponse};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, SystemStatus};
use crate::storage::StorageStats;

/// GET /system/status
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<SystemStatus>>, ApiError> {
    let database_ok = state.store().ping().await.is_ok();

    Ok(Json(ApiResponse::success(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        database_ok,
    })))
}

/// GET /system/storage
pub async fn get_storage_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<StorageStats>>, ApiError> {
    let storage = state.storage().clone();
    let stats = tokio::task::spawn_blocking(move || storage.stats())
        .await
        .map_err(|e| ApiError::internal(format!("Stats task panicked: {e}")))?;

    Ok(Json(ApiResponse::success(stats)))
}

/// GET /system/metrics
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.prometheus_handle.as_ref().map_or_else(
        || "Metrics not enabled or failed to initialize".to_string(),
        metrics_exporter_prometheus::PrometheusHandle::render,
    )
}
