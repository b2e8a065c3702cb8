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

    /// The document name is not a safe relative path.
    #[error("invalid document name: {0:?}")]
    InvalidName(String),

    /// Another process holds the directory lock.
    #[error("storage locked: {0}")]
    Locked(String),
}
