//! CLI error type.

use tabula_auth::AuthError;
use tabula_core::CoreError;
use tabula_storage::StorageError;
use thiserror::Error;

/// Result type for CLI operations.
pub(crate) type CliResult<T> = Result<T, CliError>;

/// Failures that prevent a command from producing a response.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// Engine error while opening the data directory.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Account store error.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Storage backend error.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Session document encoding or decoding error.
    #[error("session codec error: {0}")]
    Codec(#[from] serde_json::Error),
}
