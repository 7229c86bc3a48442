//! Scrape-job submission, polling, results, and artifact download.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::{ApiError, ApiResponse, AppState, Page, Pagination, validation};
use crate::domain::{ClientId, JobId};
use crate::services::job_service::{JobDto, JobStorageReport, ResultDto, SubmitJobRequest};

#[derive(Deserialize)]
pub struct SubmitRequest {
    pub client_id: i32,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub max_pages: Option<i32>,
    #[serde(default = "default_true")]
    pub include_minutes: bool,
    #[serde(default = "default_true")]
    pub include_packages: bool,
}

const fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
pub struct JobListQuery {
    pub client_id: Option<i32>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Deserialize)]
pub struct CleanupQuery {
    #[serde(default)]
    pub include_artifacts: bool,
}

/// POST /jobs
/// Accepted-style: the job id returns immediately, work happens off-path.
pub async fn submit_job(
    State(state): State<Arc<AppState>>,
    axum::Extension(user): axum::Extension<CurrentUser>,
    Json(payload): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<ApiResponse<JobDto>>), ApiError> {
    let client_id = validation::validate_id(payload.client_id, "client")?;

    let date_from = payload
        .date_from
        .map(|d| validation::validate_iso_date(&d, "date_from"))
        .transpose()?;
    let date_to = payload
        .date_to
        .map(|d| validation::validate_iso_date(&d, "date_to"))
        .transpose()?;

    if let (Some(from), Some(to)) = (&date_from, &date_to)
        && from > to
    {
        return Err(ApiError::validation("date_from must not be after date_to"));
    }

    let job = state
        .jobs()
        .submit(
            SubmitJobRequest {
                client_id: ClientId::new(client_id),
                date_from,
                date_to,
                max_pages: payload.max_pages,
                include_minutes: payload.include_minutes,
                include_packages: payload.include_packages,
            },
            user.id,
        )
        .await?;

    Ok((StatusCode::ACCEPTED, Json(ApiResponse::success(job))))
}

/// GET /jobs
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<JobListQuery>,
) -> Result<Json<ApiResponse<Page<JobDto>>>, ApiError> {
    let pagination = Pagination {
        limit: query.limit,
        offset: query.offset,
    };

    let client_id = query
        .client_id
        .map(|id| validation::validate_id(id, "client").map(ClientId::new))
        .transpose()?;

    let (items, total) = state
        .jobs()
        .list(client_id, pagination.limit(), pagination.offset())
        .await?;

    Ok(Json(ApiResponse::success(Page {
        items,
        total,
        limit: pagination.limit(),
        offset: pagination.offset(),
    })))
}

/// GET /jobs/{id}
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<JobDto>>, ApiError> {
    let id = validation::validate_id(id, "job")?;
    let job = state.jobs().get(JobId::new(id)).await?;
    Ok(Json(ApiResponse::success(job)))
}

/// POST /jobs/{id}/cancel
pub async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<JobDto>>, ApiError> {
    let id = validation::validate_id(id, "job")?;
    state.jobs().cancel(JobId::new(id)).await?;

    let job = state.jobs().get(JobId::new(id)).await?;
    Ok(Json(ApiResponse::success(job)))
}

/// GET /jobs/{id}/results
pub async fn job_results(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<ApiResponse<Page<ResultDto>>>, ApiError> {
    let id = validation::validate_id(id, "job")?;

    let (items, total) = state
        .jobs()
        .results(JobId::new(id), pagination.limit(), pagination.offset())
        .await?;

    Ok(Json(ApiResponse::success(Page {
        items,
        total,
        limit: pagination.limit(),
        offset: pagination.offset(),
    })))
}

/// GET /jobs/{id}/artifact
/// Streams the packaged zip of annotated documents.
pub async fn download_artifact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let id = validation::validate_id(id, "job")?;
    let path = state.jobs().artifact_path(JobId::new(id)).await?;

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to read artifact: {e}")))?;

    let disposition = format!("attachment; filename=\"job_{id}.zip\"");

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

/// DELETE /jobs/{id}/storage
pub async fn cleanup_job_storage(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Query(query): Query<CleanupQuery>,
) -> Result<Json<ApiResponse<JobStorageReport>>, ApiError> {
    let id = validation::validate_id(id, "job")?;

    let report = state
        .jobs()
        .cleanup_storage(JobId::new(id), query.include_artifacts)
        .await?;

    Ok(Json(ApiResponse::success(report)))
}
