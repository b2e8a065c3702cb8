//! Storage backend trait definition.

use crate::error::{StorageError, StorageResult};

/// A named-document store for Tabula.
///
/// Backends are **opaque byte stores** keyed by relative document names.
/// The engine decides what goes into each document; backends only keep
/// the bytes.
///
/// # Invariants
///
/// - `read` returns exactly the bytes of the last successful `write`
/// - a failed `write` leaves the previous document intact
/// - `remove` of an absent document succeeds
/// - Backends must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For persistent storage
pub trait StorageBackend: Send + Sync {
    /// Reads a whole document.
    ///
    /// Returns `Ok(None)` if the document does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or an I/O error occurs.
    fn read(&self, name: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Replaces a document with `data`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or an I/O error occurs.
    fn write(&self, name: &str, data: &[u8]) -> StorageResult<()>;

    /// Removes a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or an I/O error occurs.
    fn remove(&self, name: &str) -> StorageResult<()>;

    /// Lists document names starting with `prefix`, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;
}

/// Checks that a document name is a safe relative path.
///
/// Names are `/`-separated segments of ASCII alphanumerics, `_`, `-`
/// and `.`; empty segments, `.` and `..` are rejected.
pub fn validate_document_name(name: &str) -> StorageResult<()> {
    let valid = !name.is_empty()
        && name.split('/').all(|segment| {
            !segment.is_empty()
                && segment != "."
                && segment != ".."
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        });

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidName(name.to_string()))
    }
}
