use anyhow::Result;
use sea_orm::sea_query::{Expr, ExprTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    EntityTrait, QueryFilter, Set, Statement, TransactionTrait,
};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::{auth_codes, code_usages, scrape_job_configs, scrape_jobs, scrape_results, users};

pub mod migrator;
pub mod repositories;

pub use repositories::job::{
    STATUS_CANCELLED, STATUS_COMPLETED, STATUS_FAILED, STATUS_PENDING, STATUS_RUNNING,
};
pub use repositories::user::User;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.starts_with(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    #[must_use]
    pub fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn code_repo(&self) -> repositories::auth_code::AuthCodeRepository {
        repositories::auth_code::AuthCodeRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn client_repo(&self) -> repositories::client::ClientRepository {
        repositories::client::ClientRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn keyword_repo(&self) -> repositories::keyword::KeywordRepository {
        repositories::keyword::KeywordRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn favorite_repo(&self) -> repositories::favorite::FavoriteRepository {
        repositories::favorite::FavoriteRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn job_repo(&self) -> repositories::job::JobRepository {
        repositories::job::JobRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn reset_token_repo(&self) -> repositories::reset_token::ResetTokenRepository {
        repositories::reset_token::ResetTokenRepository::new(self.conn.clone())
    }

    /// Creates the user and consumes the invite code in one transaction.
    ///
    /// The conditional increment re-checks `current_uses < max_uses` inside the
    /// transaction, so a failed user insert never consumes a code and two
    /// concurrent registrations cannot both take the last use.
    pub async fn register_user_with_code(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        code_id: i32,
    ) -> Result<User> {
        let now = chrono::Utc::now().to_rfc3339();

        let txn = self.conn.begin().await?;

        let user = users::ActiveModel {
            username: Set(username.to_string()),
            email: Set(email.to_string()),
            password_hash: Set(password_hash.to_string()),
            role: Set("user".to_string()),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let consumed = auth_codes::Entity::update_many()
            .col_expr(
                auth_codes::Column::CurrentUses,
                Expr::col(auth_codes::Column::CurrentUses).add(1),
            )
            .filter(auth_codes::Column::Id.eq(code_id))
            .filter(auth_codes::Column::IsActive.eq(true))
            .filter(
                Expr::col(auth_codes::Column::CurrentUses)
                    .lt(Expr::col(auth_codes::Column::MaxUses)),
            )
            .exec(&txn)
            .await?;

        if consumed.rows_affected == 0 {
            txn.rollback().await?;
            anyhow::bail!("auth code no longer consumable");
        }

        code_usages::ActiveModel {
            code_id: Set(code_id),
            user_id: Set(user.id),
            used_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!("Registered user '{}' via auth code #{}", username, code_id);
        Ok(User::from(user))
    }

    /// Inserts a batch of results for one file in a single transaction so a
    /// crash mid-file never leaves half a page recorded.
    pub async fn add_results_batch(
        &self,
        job_id: i32,
        source_url: &str,
        file_name: &str,
        rows: &[(i32, String, String, Option<String>)],
    ) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let now = chrono::Utc::now().to_rfc3339();
        let txn = self.conn.begin().await?;

        for (page_number, keyword, snippet, entities) in rows {
            scrape_results::ActiveModel {
                job_id: Set(job_id),
                source_url: Set(source_url.to_string()),
                file_name: Set(file_name.to_string()),
                page_number: Set(*page_number),
                keyword: Set(keyword.clone()),
                snippet: Set(snippet.clone()),
                entities: Set(entities.clone()),
                created_at: Set(now.clone()),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;
        Ok(())
    }

    /// Fetches a job with its config in one call.
    pub async fn get_job_with_config(
        &self,
        job_id: i32,
    ) -> Result<Option<(scrape_jobs::Model, scrape_job_configs::Model)>> {
        let Some(job) = self.job_repo().get(job_id).await? else {
            return Ok(None);
        };
        let config = self
            .job_repo()
            .get_config(job_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Job {} has no config row", job_id))?;
        Ok(Some((job, config)))
    }
}
