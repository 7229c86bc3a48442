//! Background scheduler: the storage retention sweep.
//!
//! Runs on a cron expression when configured, otherwise on a plain interval.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{Duration, interval};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::SchedulerConfig;
use crate::domain::events::NotificationEvent;
use crate::storage::JobStorage;

pub struct Scheduler {
    storage: JobStorage,
    event_bus: tokio::sync::broadcast::Sender<NotificationEvent>,
    config: SchedulerConfig,
    running: Arc<RwLock<bool>>,
}

impl Scheduler {
    #[must_use]
    pub fn new(
        storage: JobStorage,
        event_bus: tokio::sync::broadcast::Sender<NotificationEvent>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            storage,
            event_bus,
            config,
            running: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Scheduler is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!("Starting background scheduler");

        if let Some(cron_expr) = &self.config.cron_expression {
            self.run_with_cron(cron_expr).await
        } else {
            self.run_with_interval().await
        }
    }

    async fn run_with_cron(&self, cron_expr: &str) -> Result<()> {
        let mut sched = JobScheduler::new().await?;

        let storage = self.storage.clone();
        let event_bus = self.event_bus.clone();
        let running = Arc::clone(&self.running);

        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let storage = storage.clone();
            let event_bus = event_bus.clone();
            let running = Arc::clone(&running);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                if let Err(e) = run_retention_sweep(&storage, &event_bus).await {
                    error!("Scheduled retention sweep failed: {}", e);
                }
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!("Scheduler running with cron: {}", cron_expr);

        loop {
            if !*self.running.read().await {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        sched.shutdown().await?;
        Ok(())
    }

    async fn run_with_interval(&self) -> Result<()> {
        let interval_hours = self.config.cleanup_interval_hours;
        info!("Scheduler running every {} hours", interval_hours);

        let mut sweep_interval = interval(Duration::from_secs(u64::from(interval_hours) * 3600));
        // The immediate first tick would sweep at startup; skip it.
        sweep_interval.tick().await;

        loop {
            sweep_interval.tick().await;

            if !*self.running.read().await {
                break;
            }

            if let Err(e) = run_retention_sweep(&self.storage, &self.event_bus).await {
                error!("Scheduled retention sweep failed: {}", e);
            }
        }

        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping scheduler...");
        *self.running.write().await = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// One manual sweep, used by the CLI.
    pub async fn run_once(&self) -> Result<()> {
        run_retention_sweep(&self.storage, &self.event_bus).await
    }
}

async fn run_retention_sweep(
    storage: &JobStorage,
    event_bus: &tokio::sync::broadcast::Sender<NotificationEvent>,
) -> Result<()> {
    info!("Running storage retention sweep...");

    let stats = storage.cleanup_older_than_retention().await?;

    let _ = event_bus.send(NotificationEvent::CleanupFinished {
        files_deleted: stats.files_deleted,
        bytes_freed: stats.bytes_freed,
    });

    info!(
        event = "retention_sweep_finished",
        files_deleted = stats.files_deleted,
        bytes_freed = stats.bytes_freed,
        errors = stats.errors,
        "Retention sweep complete"
    );

    Ok(())
}
