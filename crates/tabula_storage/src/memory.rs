//! In-memory storage backend for testing.

use crate::backend::{validate_document_name, StorageBackend};
use crate::error::StorageResult;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// An in-memory storage backend.
///
/// This backend stores all documents in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral databases that don't need persistence
///
/// # Thread Safety
///
/// This backend is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use tabula_storage::{StorageBackend, InMemoryBackend};
///
/// let backend = InMemoryBackend::new();
/// backend.write("rows/users.json", b"{}").unwrap();
/// assert_eq!(backend.list("rows/").unwrap(), vec!["rows/users.json".to_string()]);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    documents: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Returns true if no documents are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    /// Removes every document.
    pub fn clear(&self) {
        self.documents.write().clear();
    }
}

impl StorageBackend for InMemoryBackend {
    fn read(&self, name: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_document_name(name)?;
        Ok(self.documents.read().get(name).cloned())
    }

    fn write(&self, name: &str, data: &[u8]) -> StorageResult<()> {
        validate_document_name(name)?;
        self.documents.write().insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn remove(&self, name: &str) -> StorageResult<()> {
        validate_document_name(name)?;
        self.documents.write().remove(name);
        Ok(())
    }

    fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .documents
            .read()
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }
}
