//! Error types for the share store.

use thiserror::Error;

/// Errors that can occur when publishing or looking up a share.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShareError {
    /// A required field was missing or empty.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No live share exists under the identifier.
    #[error("share not found or expired: {0}")]
    NotFound(String),

    /// Something went wrong inside the store itself.
    #[error("internal share store error: {0}")]
    Internal(String),
}

impl ShareError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a not found error for the given identifier.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Result type for share store operations.
pub type ShareResult<T> = Result<T, ShareError>;
