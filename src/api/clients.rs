//! Client (agency) CRUD, source URLs, and keyword associations.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::{ApiError, ApiResponse, AppState, MessageResponse, Page, Pagination, validation};
use crate::domain::ClientId;
use crate::services::client_service::{ClientDto, KeywordDto, SourceDto, UpdateClient};

#[derive(Deserialize)]
pub struct CreateClientRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    /// Present-and-null clears the description; absent leaves it untouched.
    #[serde(default, deserialize_with = "super::double_option")]
    pub description: Option<Option<String>>,
}

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub include_inactive: bool,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Deserialize)]
pub struct AddSourceRequest {
    pub url: String,
    pub label: Option<String>,
}

/// POST /clients
pub async fn create_client(
    State(state): State<Arc<AppState>>,
    axum::Extension(user): axum::Extension<CurrentUser>,
    Json(payload): Json<CreateClientRequest>,
) -> Result<Json<ApiResponse<ClientDto>>, ApiError> {
    let client = state
        .clients()
        .create(&payload.name, payload.description.as_deref(), user.id)
        .await?;

    Ok(Json(ApiResponse::success(client)))
}

/// GET /clients
pub async fn list_clients(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Page<ClientDto>>>, ApiError> {
    let pagination = Pagination {
        limit: query.limit,
        offset: query.offset,
    };

    let (items, total) = state
        .clients()
        .list(query.include_inactive, pagination.limit(), pagination.offset())
        .await?;

    Ok(Json(ApiResponse::success(Page {
        items,
        total,
        limit: pagination.limit(),
        offset: pagination.offset(),
    })))
}

/// GET /clients/{id}
pub async fn get_client(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ClientDto>>, ApiError> {
    let id = validation::validate_id(id, "client")?;
    let client = state.clients().get(ClientId::new(id)).await?;
    Ok(Json(ApiResponse::success(client)))
}

/// PUT /clients/{id}
pub async fn update_client(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateClientRequest>,
) -> Result<Json<ApiResponse<ClientDto>>, ApiError> {
    let id = validation::validate_id(id, "client")?;

    let client = state
        .clients()
        .update(
            ClientId::new(id),
            UpdateClient {
                name: payload.name,
                description: payload.description,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(client)))
}

/// DELETE /clients/{id}
/// Soft delete; associations and results stay joinable.
pub async fn deactivate_client(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validation::validate_id(id, "client")?;
    state.clients().deactivate(ClientId::new(id)).await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: format!("Client {id} deactivated"),
    })))
}

/// GET /clients/{id}/sources
pub async fn list_sources(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<SourceDto>>>, ApiError> {
    let id = validation::validate_id(id, "client")?;
    let sources = state.clients().sources(ClientId::new(id)).await?;
    Ok(Json(ApiResponse::success(sources)))
}

/// POST /clients/{id}/sources
pub async fn add_source(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<AddSourceRequest>,
) -> Result<Json<ApiResponse<SourceDto>>, ApiError> {
    let id = validation::validate_id(id, "client")?;
    let source = state
        .clients()
        .add_source(ClientId::new(id), &payload.url, payload.label.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(source)))
}

/// DELETE /clients/{id}/sources/{source_id}
pub async fn remove_source(
    State(state): State<Arc<AppState>>,
    Path((id, source_id)): Path<(i32, i32)>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validation::validate_id(id, "client")?;
    state
        .clients()
        .remove_source(ClientId::new(id), source_id)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: format!("Source {source_id} removed"),
    })))
}

/// GET /clients/{id}/keywords
pub async fn list_client_keywords(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<KeywordDto>>>, ApiError> {
    let id = validation::validate_id(id, "client")?;
    let keywords = state.clients().keywords(ClientId::new(id)).await?;
    Ok(Json(ApiResponse::success(keywords)))
}

/// POST /clients/{id}/keywords/{keyword_id}
pub async fn link_keyword(
    State(state): State<Arc<AppState>>,
    Path((id, keyword_id)): Path<(i32, i32)>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validation::validate_id(id, "client")?;
    let keyword_id = validation::validate_id(keyword_id, "keyword")?;

    state
        .clients()
        .link_keyword(ClientId::new(id), keyword_id)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: format!("Keyword {keyword_id} linked to client {id}"),
    })))
}

/// DELETE /clients/{id}/keywords/{keyword_id}
pub async fn unlink_keyword(
    State(state): State<Arc<AppState>>,
    Path((id, keyword_id)): Path<(i32, i32)>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validation::validate_id(id, "client")?;
    state
        .clients()
        .unlink_keyword(ClientId::new(id), keyword_id)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: format!("Keyword {keyword_id} unlinked from client {id}"),
    })))
}
