//! Error types for snipflow
//!
//! Provides standardized error handling across the crate.

use thiserror::Error;

/// Errors that can occur in snipflow
#[derive(Debug, Error)]
pub enum SnipflowError {
    /// Storage read/write errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Clipboard operation errors
    #[error("Clipboard error: {0}")]
    Clipboard(String),

    /// Cross-context messaging errors
    #[error("Messaging error: {0}")]
    Messaging(String),

    /// HTTP errors from the snippet store
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for snipflow operations
pub type SnipflowResult<T> = Result<T, SnipflowError>;
