//! Domain service for keyword management.

use thiserror::Error;

use crate::services::client_service::KeywordDto;

#[derive(Debug, Error)]
pub enum KeywordError {
    #[error("Keyword not found: {0}")]
    NotFound(i32),

    #[error("A keyword '{0}' already exists")]
    DuplicateTerm(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for KeywordError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for KeywordError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct UpdateKeyword {
    pub term: Option<String>,
    /// Outer None leaves the category untouched; Some(None) clears it.
    pub category: Option<Option<String>>,
}

/// Domain service trait for keywords.
#[async_trait::async_trait]
pub trait KeywordService: Send + Sync {
    async fn create(&self, term: &str, category: Option<&str>) -> Result<KeywordDto, KeywordError>;

    async fn get(&self, id: i32) -> Result<KeywordDto, KeywordError>;

    /// Soft-deleted keywords are excluded unless `include_inactive` is set.
    async fn list(
        &self,
        include_inactive: bool,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<KeywordDto>, u64), KeywordError>;

    async fn update(&self, id: i32, update: UpdateKeyword) -> Result<KeywordDto, KeywordError>;

    /// Soft delete. Existing associations and results stay joinable.
    async fn deactivate(&self, id: i32) -> Result<(), KeywordError>;
}
