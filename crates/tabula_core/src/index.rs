//! Primary-key index.

use crate::error::{CoreError, CoreResult};
use crate::record::RecordStore;
use crate::types::RecordId;
use crate::value::Value;
use std::collections::HashMap;

/// Hash index from primary-key value to record ID.
///
/// Owned by exactly one table. The index is the only path from a primary
/// key to a record: there is no fallback scan, so it must hold exactly one
/// entry per live record at the end of every operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrimaryKeyIndex {
    entries: HashMap<Value, RecordId>,
}

impl PrimaryKeyIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the index from the rows of a store.
    ///
    /// # Errors
    ///
    /// Returns a corrupt data error if two rows share a key.
    pub fn rebuild(store: &RecordStore) -> CoreResult<Self> {
        let mut index = Self::new();
        for (id, row) in store.select_all() {
            let key = row
                .first()
                .cloned()
                .ok_or_else(|| CoreError::corrupt(format!("record {id} has no primary key")))?;
            if index.entries.insert(key.clone(), id).is_some() {
                return Err(CoreError::corrupt(format!(
                    "primary key {key} appears more than once"
                )));
            }
        }
        Ok(index)
    }

    /// Maps `key` to `id`.
    ///
    /// # Errors
    ///
    /// Returns an invalid operation error if the key already maps to a
    /// different record. Tables check [`PrimaryKeyIndex::find`] first and
    /// report duplicates as conflicts, so this only fires on a logic error.
    pub fn insert(&mut self, key: Value, id: RecordId) -> CoreResult<()> {
        match self.entries.get(&key) {
            Some(existing) if *existing != id => Err(CoreError::invalid_operation(format!(
                "primary key {key} already maps to {existing}"
            ))),
            _ => {
                self.entries.insert(key, id);
                Ok(())
            }
        }
    }

    /// Looks up the record ID for `key`.
    #[must_use]
    pub fn find(&self, key: &Value) -> Option<RecordId> {
        self.entries.get(key).copied()
    }

    /// Removes `key`, returning the record ID it mapped to.
    pub fn remove(&mut self, key: &Value) -> Option<RecordId> {
        self.entries.remove(key)
    }

    /// Checks whether `key` is indexed.
    #[must_use]
    pub fn contains(&self, key: &Value) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the number of indexed keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no keys are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
