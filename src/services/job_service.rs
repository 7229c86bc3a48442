//! Domain service for the scrape-job lifecycle.
//!
//! Submission is non-blocking: the job row is created in `pending` and the
//! pipeline runs off the request path. All status mutations after submission
//! belong to the executing worker; cancellation of a running job only raises a
//! flag the worker observes between processing steps.

use serde::Serialize;
use thiserror::Error;

use crate::domain::{ClientId, JobId, JobStatus};

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Client not found: {0}")]
    ClientNotFound(ClientId),

    #[error("Client {0} is inactive")]
    ClientInactive(ClientId),

    #[error("Job {job} cannot transition from {from}")]
    InvalidTransition { job: JobId, from: JobStatus },

    #[error("No artifact available for job {0}")]
    ArtifactNotFound(JobId),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for JobError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for JobError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// DTO for job information.
#[derive(Debug, Clone, Serialize)]
pub struct JobDto {
    pub id: i32,
    pub client_id: i32,
    pub status: JobStatus,
    pub created_by: i32,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub error_message: Option<String>,
    pub result_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultDto {
    pub id: i32,
    pub source_url: String,
    pub file_name: String,
    pub page_number: i32,
    pub keyword: String,
    pub snippet: String,
    pub entities: Option<serde_json::Value>,
}

/// Submission parameters; dates are inclusive ISO bounds on discovered
/// document dates.
#[derive(Debug, Clone)]
pub struct SubmitJobRequest {
    pub client_id: ClientId,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub max_pages: Option<i32>,
    pub include_minutes: bool,
    pub include_packages: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobStorageReport {
    pub files_deleted: usize,
    pub bytes_freed: u64,
}

/// Domain service trait for scrape jobs.
#[async_trait::async_trait]
pub trait JobService: Send + Sync {
    /// Creates the job in `pending` and hands it to the background worker.
    /// Returns immediately; never blocks on network I/O.
    async fn submit(
        &self,
        request: SubmitJobRequest,
        created_by: i32,
    ) -> Result<JobDto, JobError>;

    async fn get(&self, id: JobId) -> Result<JobDto, JobError>;

    async fn list(
        &self,
        client_id: Option<ClientId>,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<JobDto>, u64), JobError>;

    /// Requests cancellation. Allowed from `pending` or `running`; already
    /// persisted results are kept. Cooperative: in-flight single-file work
    /// finishes before the worker observes the flag.
    async fn cancel(&self, id: JobId) -> Result<(), JobError>;

    /// Paginated results ordered by file then page.
    async fn results(
        &self,
        id: JobId,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<ResultDto>, u64), JobError>;

    /// Filesystem path of the packaged artifact for a completed job.
    async fn artifact_path(&self, id: JobId) -> Result<std::path::PathBuf, JobError>;

    /// Deletes the job's working storage. Idempotent.
    async fn cleanup_storage(
        &self,
        id: JobId,
        include_artifacts: bool,
    ) -> Result<JobStorageReport, JobError>;
}
