//! Per-user client favorites.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::{ApiError, ApiResponse, AppState, validation};
use crate::domain::ClientId;
use crate::services::client_service::ClientDto;

#[derive(Serialize)]
pub struct ToggleResponse {
    pub client_id: i32,
    pub favorited: bool,
}

/// GET /favorites
/// The caller's favorites, most recently favorited first.
pub async fn list_favorites(
    State(state): State<Arc<AppState>>,
    axum::Extension(user): axum::Extension<CurrentUser>,
) -> Result<Json<ApiResponse<Vec<ClientDto>>>, ApiError> {
    let favorites = state.clients().favorites(user.id).await?;
    Ok(Json(ApiResponse::success(favorites)))
}

/// POST /favorites/{client_id}
/// Toggles the favorite and reports the new state.
pub async fn toggle_favorite(
    State(state): State<Arc<AppState>>,
    axum::Extension(user): axum::Extension<CurrentUser>,
    Path(client_id): Path<i32>,
) -> Result<Json<ApiResponse<ToggleResponse>>, ApiError> {
    let client_id = validation::validate_id(client_id, "client")?;

    let favorited = state
        .clients()
        .toggle_favorite(user.id, ClientId::new(client_id))
        .await?;

    Ok(Json(ApiResponse::success(ToggleResponse {
        client_id,
        favorited,
    })))
}
