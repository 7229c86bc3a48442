//! Admin CRUD for invite codes.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::{ApiError, ApiResponse, MessageResponse, Page, Pagination, AppState, validation};
use crate::services::code_service::{CodeDto, CodeUsageDto};

#[derive(Deserialize)]
pub struct CreateCodeRequest {
    pub expires_in_days: Option<i64>,
    #[serde(default = "default_max_uses")]
    pub max_uses: i32,
    pub notes: Option<String>,
}

const fn default_max_uses() -> i32 {
    1
}

#[derive(Serialize)]
pub struct CodeDetailResponse {
    #[serde(flatten)]
    pub code: CodeDto,
    pub usages: Vec<CodeUsageDto>,
}

/// POST /codes
pub async fn create_code(
    State(state): State<Arc<AppState>>,
    axum::Extension(user): axum::Extension<CurrentUser>,
    Json(payload): Json<CreateCodeRequest>,
) -> Result<Json<ApiResponse<CodeDto>>, ApiError> {
    if let Some(days) = payload.expires_in_days
        && days < 1
    {
        return Err(ApiError::validation("expires_in_days must be at least 1"));
    }

    let code = state
        .codes()
        .create_code(
            user.id,
            payload.expires_in_days,
            payload.max_uses,
            payload.notes.as_deref(),
        )
        .await?;

    Ok(Json(ApiResponse::success(code)))
}

/// GET /codes
pub async fn list_codes(
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<ApiResponse<Page<CodeDto>>>, ApiError> {
    let (items, total) = state
        .codes()
        .list(pagination.limit(), pagination.offset())
        .await?;

    Ok(Json(ApiResponse::success(Page {
        items,
        total,
        limit: pagination.limit(),
        offset: pagination.offset(),
    })))
}

/// GET /codes/{id}
pub async fn get_code(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<CodeDetailResponse>>, ApiError> {
    let id = validation::validate_id(id, "code")?;
    let (code, usages) = state.codes().get(id).await?;

    Ok(Json(ApiResponse::success(CodeDetailResponse {
        code,
        usages,
    })))
}

/// DELETE /codes/{id}
/// Revokes the code; the row is kept as a historical record.
pub async fn revoke_code(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validation::validate_id(id, "code")?;
    state.codes().revoke(id).await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: format!("Code {id} revoked"),
    })))
}
