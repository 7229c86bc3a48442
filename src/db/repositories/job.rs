use crate::entities::{prelude::*, scrape_job_configs, scrape_jobs, scrape_results};
use anyhow::Result;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use tracing::info;

/// Non-terminal statuses. Everything else is final.
pub const STATUS_PENDING: &str = "pending";
pub const STATUS_RUNNING: &str = "running";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_FAILED: &str = "failed";
pub const STATUS_CANCELLED: &str = "cancelled";

pub struct JobRepository {
    conn: DatabaseConnection,
}

impl JobRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn insert(
        &self,
        client_id: i32,
        created_by: i32,
        config: &scrape_job_configs::Model,
    ) -> Result<i32> {
        let now = chrono::Utc::now().to_rfc3339();

        let job = scrape_jobs::ActiveModel {
            client_id: Set(client_id),
            status: Set(STATUS_PENDING.to_string()),
            created_by: Set(created_by),
            created_at: Set(now),
            started_at: Set(None),
            completed_at: Set(None),
            error_message: Set(None),
            ..Default::default()
        };

        let res = ScrapeJobs::insert(job).exec(&self.conn).await?;
        let job_id = res.last_insert_id;

        let cfg = scrape_job_configs::ActiveModel {
            job_id: Set(job_id),
            date_from: Set(config.date_from.clone()),
            date_to: Set(config.date_to.clone()),
            max_pages: Set(config.max_pages),
            include_minutes: Set(config.include_minutes),
            include_packages: Set(config.include_packages),
        };
        ScrapeJobConfigs::insert(cfg).exec(&self.conn).await?;

        info!("Submitted scrape job #{} for client {}", job_id, client_id);
        Ok(job_id)
    }

    pub async fn get(&self, id: i32) -> Result<Option<scrape_jobs::Model>> {
        Ok(ScrapeJobs::find_by_id(id).one(&self.conn).await?)
    }

    pub async fn get_config(&self, job_id: i32) -> Result<Option<scrape_job_configs::Model>> {
        Ok(ScrapeJobConfigs::find_by_id(job_id).one(&self.conn).await?)
    }

    pub async fn list(
        &self,
        client_id: Option<i32>,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<scrape_jobs::Model>, u64)> {
        let mut query = ScrapeJobs::find().order_by_desc(scrape_jobs::Column::CreatedAt);

        if let Some(client_id) = client_id {
            query = query.filter(scrape_jobs::Column::ClientId.eq(client_id));
        }

        let total = query.clone().count(&self.conn).await?;
        let rows = query.limit(limit).offset(offset).all(&self.conn).await?;

        Ok((rows, total))
    }

    /// Conditional pending -> running transition. Returns false if the job was
    /// not pending (already ran, or terminal) so a job executes at most once.
    pub async fn try_mark_running(&self, id: i32) -> Result<bool> {
        let result = ScrapeJobs::update_many()
            .col_expr(
                scrape_jobs::Column::Status,
                sea_orm::sea_query::Expr::value(STATUS_RUNNING),
            )
            .col_expr(
                scrape_jobs::Column::StartedAt,
                sea_orm::sea_query::Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(scrape_jobs::Column::Id.eq(id))
            .filter(scrape_jobs::Column::Status.eq(STATUS_PENDING))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Terminal transition, guarded on non-terminal current status. The whole
    /// record is written in one UPDATE so pollers never see a partial state.
    async fn mark_terminal(&self, id: i32, status: &str, error: Option<&str>) -> Result<bool> {
        let result = ScrapeJobs::update_many()
            .col_expr(
                scrape_jobs::Column::Status,
                sea_orm::sea_query::Expr::value(status),
            )
            .col_expr(
                scrape_jobs::Column::CompletedAt,
                sea_orm::sea_query::Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .col_expr(
                scrape_jobs::Column::ErrorMessage,
                sea_orm::sea_query::Expr::value(error),
            )
            .filter(scrape_jobs::Column::Id.eq(id))
            .filter(
                scrape_jobs::Column::Status
                    .is_in([STATUS_PENDING, STATUS_RUNNING]),
            )
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn mark_completed(&self, id: i32) -> Result<bool> {
        self.mark_terminal(id, STATUS_COMPLETED, None).await
    }

    pub async fn mark_failed(&self, id: i32, error: &str) -> Result<bool> {
        self.mark_terminal(id, STATUS_FAILED, Some(error)).await
    }

    pub async fn mark_cancelled(&self, id: i32) -> Result<bool> {
        self.mark_terminal(id, STATUS_CANCELLED, None).await
    }

    // ========================================================================
    // Results
    // ========================================================================

    #[allow(clippy::too_many_arguments)]
    pub async fn add_result(
        &self,
        job_id: i32,
        source_url: &str,
        file_name: &str,
        page_number: i32,
        keyword: &str,
        snippet: &str,
        entities: Option<String>,
    ) -> Result<()> {
        let active_model = scrape_results::ActiveModel {
            job_id: Set(job_id),
            source_url: Set(source_url.to_string()),
            file_name: Set(file_name.to_string()),
            page_number: Set(page_number),
            keyword: Set(keyword.to_string()),
            snippet: Set(snippet.to_string()),
            entities: Set(entities),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        ScrapeResults::insert(active_model).exec(&self.conn).await?;
        Ok(())
    }

    /// Results ordered by file then page for readable output.
    pub async fn results(
        &self,
        job_id: i32,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<scrape_results::Model>, u64)> {
        let query = ScrapeResults::find()
            .filter(scrape_results::Column::JobId.eq(job_id))
            .order_by_asc(scrape_results::Column::FileName)
            .order_by_asc(scrape_results::Column::PageNumber);

        let total = query.clone().count(&self.conn).await?;
        let rows = query.limit(limit).offset(offset).all(&self.conn).await?;

        Ok((rows, total))
    }

    pub async fn result_count(&self, job_id: i32) -> Result<u64> {
        let count = ScrapeResults::find()
            .filter(scrape_results::Column::JobId.eq(job_id))
            .count(&self.conn)
            .await?;
        Ok(count)
    }
}
