//! Domain service for invite codes gating self-registration.

use serde::Serialize;
use thiserror::Error;

/// Errors specific to invite-code operations.
///
/// The four rejection variants carry distinct messages for admin debugging;
/// the API layer collapses all of them to one generic message for the
/// registrant.
#[derive(Debug, Error)]
pub enum CodeError {
    #[error("Invalid code")]
    InvalidCode,

    #[error("Code has expired")]
    ExpiredCode,

    #[error("Code has been revoked")]
    RevokedCode,

    #[error("Code has no remaining uses")]
    ExhaustedCode,

    #[error("Code not found: {0}")]
    NotFound(i32),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for CodeError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for CodeError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Derived lifecycle state, computed at read time from the stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeStatus {
    Active,
    Revoked,
    Expired,
    Exhausted,
}

/// DTO for invite-code information.
#[derive(Debug, Clone, Serialize)]
pub struct CodeDto {
    pub id: i32,
    pub code: String,
    /// Hyphen-grouped form shown to admins: XXXX-XXXX-XXXX.
    pub display_code: String,
    pub status: CodeStatus,
    pub created_by: i32,
    pub expires_at: Option<String>,
    pub max_uses: i32,
    pub current_uses: i32,
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CodeUsageDto {
    pub user_id: i32,
    pub used_at: String,
}

/// Domain service trait for invite codes.
#[async_trait::async_trait]
pub trait CodeService: Send + Sync {
    /// Creates a new code.
    ///
    /// # Errors
    ///
    /// Returns [`CodeError::Validation`] for a non-positive `max_uses`.
    async fn create_code(
        &self,
        created_by: i32,
        expires_in_days: Option<i64>,
        max_uses: i32,
        notes: Option<&str>,
    ) -> Result<CodeDto, CodeError>;

    /// Normalizes and validates a raw code without consuming it.
    ///
    /// # Errors
    ///
    /// Check order on rejection: revoked, then expired, then exhausted.
    async fn validate(&self, raw_code: &str) -> Result<CodeDto, CodeError>;

    /// Revokes a code. Idempotent: revoking an inactive code succeeds.
    async fn revoke(&self, id: i32) -> Result<(), CodeError>;

    /// Lists codes newest-first with derived status.
    async fn list(&self, limit: u64, offset: u64) -> Result<(Vec<CodeDto>, u64), CodeError>;

    /// Gets one code with its usage history.
    async fn get(&self, id: i32) -> Result<(CodeDto, Vec<CodeUsageDto>), CodeError>;
}
