//! Error types shared across the workspace

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, CommonError>;

/// Errors raised by the pure helpers in this crate
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown file role: {0}")]
    InvalidRole(String),

    #[error("Unknown job status: {0}")]
    InvalidStatus(String),

    #[error("Illegal job status transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },

    #[error("Unreadable table: {0}")]
    Table(String),
}
