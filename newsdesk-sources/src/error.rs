//! Error types for the sources module

use thiserror::Error;

use newsdesk_core::NewsdeskError;

/// Errors that can occur while harvesting a source
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP request failed (network, timeout)
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Upstream returned a non-success status
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Upstream returned a body of the wrong kind
    #[error("Unexpected content type {content_type} for {url}")]
    UnexpectedContentType {
        url: String,
        content_type: String,
    },

    /// Failed to parse a document or page
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<SourceError> for NewsdeskError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::InvalidConfig(msg) => NewsdeskError::config(msg),
            other => NewsdeskError::internal(other.to_string()),
        }
    }
}
