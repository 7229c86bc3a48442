//! `SeaORM` implementation of the `JobService` trait, plus the cancellation
//! registry shared with the pipeline.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::info;

use crate::db::Store;
use crate::domain::events::NotificationEvent;
use crate::domain::{ClientId, JobId, JobStatus};
use crate::entities::{scrape_job_configs, scrape_jobs};
use crate::services::job_service::{
    JobDto, JobError, JobService, JobStorageReport, ResultDto, SubmitJobRequest,
};
use crate::services::pipeline::ScrapePipeline;
use crate::storage::{Category, JobStorage};

/// Per-job cancellation flags. Flags are registered at submission and dropped
/// when the worker finishes, so the map stays bounded by in-flight jobs.
#[derive(Default, Clone)]
pub struct CancelRegistry {
    flags: Arc<Mutex<HashMap<i32, Arc<AtomicBool>>>>,
}

impl CancelRegistry {
    #[must_use]
    pub fn register(&self, job_id: i32) -> Arc<AtomicBool> {
        let flag = Arc::new(AtomicBool::new(false));
        self.flags
            .lock()
            .expect("cancel registry poisoned")
            .insert(job_id, flag.clone());
        flag
    }

    /// Raises the flag if the job is in flight. Returns whether a worker will
    /// observe it.
    #[must_use]
    pub fn request_cancel(&self, job_id: i32) -> bool {
        self.flags
            .lock()
            .expect("cancel registry poisoned")
            .get(&job_id)
            .map(|flag| flag.store(true, Ordering::Relaxed))
            .is_some()
    }

    pub fn unregister(&self, job_id: i32) {
        self.flags
            .lock()
            .expect("cancel registry poisoned")
            .remove(&job_id);
    }
}

fn status_of(model: &scrape_jobs::Model) -> JobStatus {
    JobStatus::parse(&model.status).unwrap_or(JobStatus::Failed)
}

fn to_dto(model: scrape_jobs::Model, result_count: u64) -> JobDto {
    JobDto {
        status: status_of(&model),
        id: model.id,
        client_id: model.client_id,
        created_by: model.created_by,
        created_at: model.created_at,
        started_at: model.started_at,
        completed_at: model.completed_at,
        error_message: model.error_message,
        result_count,
    }
}

pub struct SeaOrmJobService {
    store: Store,
    storage: JobStorage,
    pipeline: Arc<ScrapePipeline>,
    cancels: CancelRegistry,
    event_bus: broadcast::Sender<NotificationEvent>,
    default_max_pages: i32,
}

impl SeaOrmJobService {
    #[must_use]
    pub fn new(
        store: Store,
        storage: JobStorage,
        pipeline: Arc<ScrapePipeline>,
        event_bus: broadcast::Sender<NotificationEvent>,
        default_max_pages: i32,
    ) -> Self {
        Self {
            store,
            storage,
            pipeline,
            cancels: CancelRegistry::default(),
            event_bus,
            default_max_pages,
        }
    }

    async fn require_job(&self, id: JobId) -> Result<scrape_jobs::Model, JobError> {
        self.store
            .job_repo()
            .get(id.value())
            .await?
            .ok_or(JobError::NotFound(id))
    }
}

#[async_trait]
impl JobService for SeaOrmJobService {
    async fn submit(
        &self,
        request: SubmitJobRequest,
        created_by: i32,
    ) -> Result<JobDto, JobError> {
        let client = self
            .store
            .client_repo()
            .get(request.client_id.value())
            .await?
            .ok_or(JobError::ClientNotFound(request.client_id))?;

        if !client.is_active {
            return Err(JobError::ClientInactive(request.client_id));
        }

        if !request.include_minutes && !request.include_packages {
            return Err(JobError::Validation(
                "At least one of minutes or packages must be included".to_string(),
            ));
        }

        let max_pages = match request.max_pages {
            Some(n) if n < 1 => {
                return Err(JobError::Validation(
                    "max_pages must be at least 1".to_string(),
                ));
            }
            Some(n) => n,
            None => self.default_max_pages,
        };

        let config = scrape_job_configs::Model {
            job_id: 0,
            date_from: request.date_from,
            date_to: request.date_to,
            max_pages,
            include_minutes: request.include_minutes,
            include_packages: request.include_packages,
        };

        let job_id = self
            .store
            .job_repo()
            .insert(client.id, created_by, &config)
            .await?;

        let _ = self.event_bus.send(NotificationEvent::JobSubmitted {
            job_id,
            client_id: client.id,
        });
        metrics::counter!("minutarr_jobs_submitted_total").increment(1);

        // Snapshot the pending row before the worker can touch it, so the
        // caller always sees the accepted state.
        let job = self.require_job(JobId::new(job_id)).await?;

        // Fire-and-forget worker. The spawned task owns every later status
        // write; its terminal handling lives in the pipeline, not here.
        let flag = self.cancels.register(job_id);
        let pipeline = self.pipeline.clone();
        let cancels = self.cancels.clone();
        tokio::spawn(async move {
            pipeline.execute(job_id, flag).await;
            cancels.unregister(job_id);
        });

        Ok(to_dto(job, 0))
    }

    async fn get(&self, id: JobId) -> Result<JobDto, JobError> {
        let job = self.require_job(id).await?;
        let count = self.store.job_repo().result_count(id.value()).await?;
        Ok(to_dto(job, count))
    }

    async fn list(
        &self,
        client_id: Option<ClientId>,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<JobDto>, u64), JobError> {
        let (rows, total) = self
            .store
            .job_repo()
            .list(client_id.map(|c| c.value()), limit, offset)
            .await?;

        let mut dtos = Vec::with_capacity(rows.len());
        for row in rows {
            let count = self.store.job_repo().result_count(row.id).await?;
            dtos.push(to_dto(row, count));
        }

        Ok((dtos, total))
    }

    async fn cancel(&self, id: JobId) -> Result<(), JobError> {
        let job = self.require_job(id).await?;
        let status = status_of(&job);

        if status.is_terminal() {
            return Err(JobError::InvalidTransition { job: id, from: status });
        }

        if self.cancels.request_cancel(id.value()) {
            info!("Cancellation requested for running job {}", id);
            return Ok(());
        }

        // No in-flight worker (e.g. a pending job orphaned by a restart):
        // there is no competing writer, so the terminal write is safe here.
        let transitioned = self.store.job_repo().mark_cancelled(id.value()).await?;
        if transitioned {
            let _ = self
                .event_bus
                .send(NotificationEvent::JobCancelled { job_id: id.value() });
            Ok(())
        } else {
            let job = self.require_job(id).await?;
            Err(JobError::InvalidTransition {
                job: id,
                from: status_of(&job),
            })
        }
    }

    async fn results(
        &self,
        id: JobId,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<ResultDto>, u64), JobError> {
        self.require_job(id).await?;

        let (rows, total) = self.store.job_repo().results(id.value(), limit, offset).await?;

        let dtos = rows
            .into_iter()
            .map(|row| ResultDto {
                id: row.id,
                source_url: row.source_url,
                file_name: row.file_name,
                page_number: row.page_number,
                keyword: row.keyword,
                snippet: row.snippet,
                entities: row
                    .entities
                    .as_deref()
                    .and_then(|raw| serde_json::from_str(raw).ok()),
            })
            .collect();

        Ok((dtos, total))
    }

    async fn artifact_path(&self, id: JobId) -> Result<PathBuf, JobError> {
        let job = self.require_job(id).await?;

        if status_of(&job) != JobStatus::Completed {
            return Err(JobError::ArtifactNotFound(id));
        }

        let path = self
            .storage
            .path_for(id.value(), Category::Artifacts)
            .join(format!("job_{}.zip", id.value()));

        if path.exists() {
            Ok(path)
        } else {
            Err(JobError::ArtifactNotFound(id))
        }
    }

    async fn cleanup_storage(
        &self,
        id: JobId,
        include_artifacts: bool,
    ) -> Result<JobStorageReport, JobError> {
        let job = self.require_job(id).await?;
        if !status_of(&job).is_terminal() {
            return Err(JobError::Validation(
                "Cannot clean storage of a job that is still pending or running".to_string(),
            ));
        }

        let stats = self
            .storage
            .cleanup_job(id.value(), include_artifacts)
            .await?;

        Ok(JobStorageReport {
            files_deleted: stats.files_deleted,
            bytes_freed: stats.bytes_freed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_registry_lifecycle() {
        let registry = CancelRegistry::default();
        let flag = registry.register(1);

        assert!(!flag.load(Ordering::Relaxed));
        assert!(registry.request_cancel(1));
        assert!(flag.load(Ordering::Relaxed));

        registry.unregister(1);
        assert!(!registry.request_cancel(1));
    }

    #[test]
    fn test_unknown_job_has_no_flag() {
        let registry = CancelRegistry::default();
        assert!(!registry.request_cancel(99));
    }
}
