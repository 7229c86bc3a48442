use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use crate::services::{AuthError, ClientError, CodeError, JobError, KeywordError};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),

    ValidationError(String),

    Conflict(String),

    Unauthorized(String),

    Forbidden(String),

    DatabaseError(String),

    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            ApiError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ApiResponse::<()>::error(error_message);
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => {
                ApiError::Unauthorized("Invalid credentials".to_string())
            }
            AuthError::UserNotFound => ApiError::NotFound("User not found".to_string()),
            AuthError::Conflict(what) => ApiError::Conflict(format!("{what} is already taken")),
            AuthError::Validation(msg) => ApiError::ValidationError(msg),
            AuthError::Code(code_err) => code_err.into(),
            AuthError::InvalidResetToken => {
                ApiError::ValidationError("Invalid or expired reset token".to_string())
            }
            AuthError::Database(msg) => ApiError::DatabaseError(msg),
            AuthError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<CodeError> for ApiError {
    fn from(err: CodeError) -> Self {
        match err {
            // Distinct messages: these reach admins debugging a code.
            CodeError::InvalidCode
            | CodeError::ExpiredCode
            | CodeError::RevokedCode
            | CodeError::ExhaustedCode => ApiError::ValidationError(err.to_string()),
            CodeError::NotFound(id) => ApiError::NotFound(format!("Code {id} not found")),
            CodeError::Validation(msg) => ApiError::ValidationError(msg),
            CodeError::Database(msg) => ApiError::DatabaseError(msg),
            CodeError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::NotFound(id) => ApiError::NotFound(format!("Client {id} not found")),
            ClientError::SourceNotFound(id) => {
                ApiError::NotFound(format!("Source {id} not found"))
            }
            ClientError::DuplicateName(name) => {
                ApiError::Conflict(format!("A client named '{name}' already exists"))
            }
            ClientError::Validation(msg) => ApiError::ValidationError(msg),
            ClientError::Database(msg) => ApiError::DatabaseError(msg),
            ClientError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<KeywordError> for ApiError {
    fn from(err: KeywordError) -> Self {
        match err {
            KeywordError::NotFound(id) => ApiError::NotFound(format!("Keyword {id} not found")),
            KeywordError::DuplicateTerm(term) => {
                ApiError::Conflict(format!("A keyword '{term}' already exists"))
            }
            KeywordError::Validation(msg) => ApiError::ValidationError(msg),
            KeywordError::Database(msg) => ApiError::DatabaseError(msg),
            KeywordError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::NotFound(id) => ApiError::NotFound(format!("Job {id} not found")),
            JobError::ClientNotFound(id) => ApiError::NotFound(format!("Client {id} not found")),
            JobError::ClientInactive(id) => {
                ApiError::ValidationError(format!("Client {id} is inactive"))
            }
            JobError::InvalidTransition { job, from } => {
                ApiError::Conflict(format!("Job {job} cannot transition from {from}"))
            }
            JobError::ArtifactNotFound(id) => {
                ApiError::NotFound(format!("No artifact available for job {id}"))
            }
            JobError::Validation(msg) => ApiError::ValidationError(msg),
            JobError::Database(msg) => ApiError::DatabaseError(msg),
            JobError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::ValidationError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::InternalError(msg.into())
    }
}
