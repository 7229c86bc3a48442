//! Domain service for clients (tracked agencies), their source URLs, keyword
//! associations, and per-user favorites.

use serde::Serialize;
use thiserror::Error;

use crate::domain::ClientId;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Client not found: {0}")]
    NotFound(ClientId),

    #[error("Source not found: {0}")]
    SourceNotFound(i32),

    #[error("A client named '{0}' already exists")]
    DuplicateName(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for ClientError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for ClientError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// DTO for client information.
#[derive(Debug, Clone, Serialize)]
pub struct ClientDto {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_by: i32,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceDto {
    pub id: i32,
    pub client_id: i32,
    pub url: String,
    pub label: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeywordDto {
    pub id: i32,
    pub term: String,
    pub category: Option<String>,
    pub is_active: bool,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct UpdateClient {
    pub name: Option<String>,
    /// Outer None leaves the description untouched; Some(None) clears it.
    pub description: Option<Option<String>>,
}

/// Domain service trait for client management.
#[async_trait::async_trait]
pub trait ClientService: Send + Sync {
    async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        created_by: i32,
    ) -> Result<ClientDto, ClientError>;

    async fn get(&self, id: ClientId) -> Result<ClientDto, ClientError>;

    /// Soft-deleted clients are excluded unless `include_inactive` is set.
    async fn list(
        &self,
        include_inactive: bool,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<ClientDto>, u64), ClientError>;

    async fn update(&self, id: ClientId, update: UpdateClient) -> Result<ClientDto, ClientError>;

    /// Soft delete. Existing results and associations stay joinable.
    async fn deactivate(&self, id: ClientId) -> Result<(), ClientError>;

    async fn add_source(
        &self,
        id: ClientId,
        url: &str,
        label: Option<&str>,
    ) -> Result<SourceDto, ClientError>;

    async fn remove_source(&self, id: ClientId, source_id: i32) -> Result<(), ClientError>;

    async fn sources(&self, id: ClientId) -> Result<Vec<SourceDto>, ClientError>;

    /// Idempotent.
    async fn link_keyword(&self, id: ClientId, keyword_id: i32) -> Result<(), ClientError>;

    async fn unlink_keyword(&self, id: ClientId, keyword_id: i32) -> Result<(), ClientError>;

    /// Active keywords linked to the client.
    async fn keywords(&self, id: ClientId) -> Result<Vec<KeywordDto>, ClientError>;

    /// Idempotent: favoriting twice leaves one row.
    async fn add_favorite(&self, user_id: i32, id: ClientId) -> Result<(), ClientError>;

    async fn remove_favorite(&self, user_id: i32, id: ClientId) -> Result<bool, ClientError>;

    /// Toggles and reports the new state (true = now favorited).
    async fn toggle_favorite(&self, user_id: i32, id: ClientId) -> Result<bool, ClientError>;

    /// The user's favorites, most recently favorited first.
    async fn favorites(&self, user_id: i32) -> Result<Vec<ClientDto>, ClientError>;
}
