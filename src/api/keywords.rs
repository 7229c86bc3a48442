//! Keyword CRUD.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, MessageResponse, Page, Pagination, validation};
use crate::services::client_service::KeywordDto;
use crate::services::keyword_service::UpdateKeyword;

#[derive(Deserialize)]
pub struct CreateKeywordRequest {
    pub term: String,
    pub category: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateKeywordRequest {
    pub term: Option<String>,
    /// Present-and-null clears the category; absent leaves it untouched.
    #[serde(default, deserialize_with = "super::double_option")]
    pub category: Option<Option<String>>,
}

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub include_inactive: bool,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// POST /keywords
pub async fn create_keyword(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateKeywordRequest>,
) -> Result<Json<ApiResponse<KeywordDto>>, ApiError> {
    let term = validation::validate_term(&payload.term)?;
    let keyword = state
        .keywords()
        .create(term, payload.category.as_deref())
        .await?;

    Ok(Json(ApiResponse::success(keyword)))
}

/// GET /keywords
pub async fn list_keywords(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Page<KeywordDto>>>, ApiError> {
    let pagination = Pagination {
        limit: query.limit,
        offset: query.offset,
    };

    let (items, total) = state
        .keywords()
        .list(query.include_inactive, pagination.limit(), pagination.offset())
        .await?;

    Ok(Json(ApiResponse::success(Page {
        items,
        total,
        limit: pagination.limit(),
        offset: pagination.offset(),
    })))
}

/// GET /keywords/{id}
pub async fn get_keyword(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<KeywordDto>>, ApiError> {
    let id = validation::validate_id(id, "keyword")?;
    let keyword = state.keywords().get(id).await?;
    Ok(Json(ApiResponse::success(keyword)))
}

/// PUT /keywords/{id}
pub async fn update_keyword(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateKeywordRequest>,
) -> Result<Json<ApiResponse<KeywordDto>>, ApiError> {
    let id = validation::validate_id(id, "keyword")?;

    let keyword = state
        .keywords()
        .update(
            id,
            UpdateKeyword {
                term: payload.term,
                category: payload.category,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(keyword)))
}

/// DELETE /keywords/{id}
/// Soft delete; associations and results stay joinable.
pub async fn deactivate_keyword(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validation::validate_id(id, "keyword")?;
    state.keywords().deactivate(id).await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: format!("Keyword {id} deactivated"),
    })))
}
