//! Error types for Newsdesk

use thiserror::Error;

/// Workspace-wide error type
#[derive(Error, Debug)]
pub enum NewsdeskError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl NewsdeskError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        NewsdeskError::InvalidInput(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        NewsdeskError::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        NewsdeskError::Internal(msg.into())
    }

    /// Whether the caller is responsible for this error
    pub fn is_caller_error(&self) -> bool {
        matches!(self, NewsdeskError::InvalidInput(_))
    }
}

/// Result type alias for newsdesk operations
pub type NewsdeskResult<T> = Result<T, NewsdeskError>;
