// Central Error Type for the Client

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Job, output or owning workspace no longer exists
    #[error("Not found: {0}")]
    NotFound(String),

    /// Session invalid or lacks access to the workspace
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Action attempted in a state that does not allow it
    #[error("Not ready: {0}")]
    NotReady(String),

    /// Network failure or timeout; the next poll tick is the only retry
    #[error("Transient error: {0}")]
    Transient(String),

    #[error("Server error ({status}): {detail}")]
    ServerError { status: u16, detail: String },

    /// Request refused by the server for any other 4xx reason
    #[error("Request rejected ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("Lost connection after {failures} consecutive failed polls: {last_error}")]
    LostConnection { failures: u32, last_error: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Errors after which polling a job can never succeed
    pub fn is_fatal_for_polling(&self) -> bool {
        matches!(self, AppError::NotFound(_) | AppError::Unauthorized(_))
    }

    pub fn not_ready(action: &str, status: impl std::fmt::Display) -> Self {
        AppError::NotReady(format!("cannot {} a job that is {}", action, status))
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
