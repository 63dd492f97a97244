//! Server-wide error type
//!
//! Feature slices define their own error enums; [`AppError`] covers the
//! infrastructure paths (health, startup, shared extractors).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::response::ErrorResponse;

/// Result type alias for server operations
pub type ServerResult<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] predomics_common::CommonError),
}

impl From<crate::db::DbError> for AppError {
    fn from(err: crate::db::DbError) -> Self {
        match err {
            crate::db::DbError::Sqlx(e) => AppError::Database(e),
            crate::db::DbError::Migrate(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::Common(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_)
            | AppError::Internal(_)
            | AppError::Config(_)
            | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (code, message) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                ("INTERNAL_ERROR", "A database error occurred".to_string())
            },
            AppError::NotFound(message) => ("NOT_FOUND", message),
            AppError::Validation(message) => ("VALIDATION_ERROR", message),
            AppError::Common(e) => ("VALIDATION_ERROR", e.to_string()),
            AppError::Conflict(message) => ("CONFLICT", message),
            AppError::BadRequest(message) => ("BAD_REQUEST", message),
            AppError::Internal(ref message) => {
                tracing::error!("Internal error: {}", message);
                ("INTERNAL_ERROR", "An internal error occurred".to_string())
            },
            AppError::Config(ref message) => {
                tracing::error!("Configuration error: {}", message);
                ("INTERNAL_ERROR", "Server configuration error".to_string())
            },
            AppError::Io(ref e) => {
                tracing::error!("IO error: {:?}", e);
                ("INTERNAL_ERROR", "An IO error occurred".to_string())
            },
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}
