//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The key cannot be stored by this gateway.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    /// The stored data could not be interpreted by the gateway itself.
    #[error("storage corrupted: {0}")]
    Corrupted(String),

    /// The backing store is temporarily unreachable.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The gateway does not implement this operation.
    #[error("operation not supported by this gateway: {0}")]
    Unsupported(&'static str),
}

impl StorageError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}
