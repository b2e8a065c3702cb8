//! Record storage for one table.

use crate::error::{CoreError, CoreResult};
use crate::types::RecordId;
use crate::value::Value;
use std::collections::BTreeMap;
use tabula_storage::StorageBackend;

/// Row values in column order.
pub type Row = Vec<Value>;

/// Mapping from record ID to row for one table.
///
/// IDs come from a counter that only moves forward: it starts at 1,
/// advances on every insert, and resumes at `max(id) + 1` when loaded.
/// Removing a row never frees its ID.
///
/// The store does no validation of its own; callers validate rows against
/// the schema and the primary-key index before inserting.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordStore {
    rows: BTreeMap<RecordId, Row>,
    next_id: RecordId,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: RecordId::FIRST,
        }
    }

    /// Creates a store from existing rows, resuming the ID counter.
    #[must_use]
    pub fn from_rows(rows: BTreeMap<RecordId, Row>) -> Self {
        let next_id = rows
            .keys()
            .next_back()
            .map_or(RecordId::FIRST, |last| last.next());
        Self { rows, next_id }
    }

    /// Stores a row under a freshly allocated ID.
    pub fn insert(&mut self, row: Row) -> RecordId {
        let id = self.next_id;
        self.next_id = id.next();
        self.rows.insert(id, row);
        id
    }

    /// Stores a row under a previously allocated ID.
    ///
    /// Used to undo a delete. The counter is never moved backwards.
    ///
    /// # Errors
    ///
    /// Returns an error if a row already uses the ID.
    pub fn restore(&mut self, id: RecordId, row: Row) -> CoreResult<()> {
        if self.rows.contains_key(&id) {
            return Err(CoreError::invalid_operation(format!(
                "record {id} is already live"
            )));
        }
        if id >= self.next_id {
            self.next_id = id.next();
        }
        self.rows.insert(id, row);
        Ok(())
    }

    /// Returns the row stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns `MissingRecord` if the ID is absent.
    pub fn get(&self, id: RecordId) -> CoreResult<&Row> {
        self.rows.get(&id).ok_or(CoreError::MissingRecord { id })
    }

    /// Replaces the row stored under `id`, returning the previous row.
    ///
    /// # Errors
    ///
    /// Returns `MissingRecord` if the ID is absent.
    pub fn replace(&mut self, id: RecordId, row: Row) -> CoreResult<Row> {
        match self.rows.get_mut(&id) {
            Some(slot) => Ok(std::mem::replace(slot, row)),
            None => Err(CoreError::MissingRecord { id }),
        }
    }

    /// Removes the row stored under `id`, returning it.
    ///
    /// # Errors
    ///
    /// Returns `MissingRecord` if the ID is absent.
    pub fn remove(&mut self, id: RecordId) -> CoreResult<Row> {
        self.rows.remove(&id).ok_or(CoreError::MissingRecord { id })
    }

    /// Iterates over all live rows in ID order.
    pub fn select_all(&self) -> impl Iterator<Item = (RecordId, &Row)> + '_ {
        self.rows.iter().map(|(&id, row)| (id, row))
    }

    /// Checks whether any live row other than `exclude` holds `value` at
    /// column `position`.
    #[must_use]
    pub fn holds_value(&self, position: usize, value: &Value, exclude: Option<RecordId>) -> bool {
        self.rows
            .iter()
            .any(|(&id, row)| Some(id) != exclude && row.get(position) == Some(value))
    }

    /// Returns the number of live rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if no rows are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the ID the next insert will receive.
    #[must_use]
    pub fn next_id(&self) -> RecordId {
        self.next_id
    }

    /// Serializes the full ID-to-row mapping.
    ///
    /// # Errors
    ///
    /// Returns a codec error if serialization fails.
    pub fn encode(&self, pretty: bool) -> CoreResult<Vec<u8>> {
        let bytes = if pretty {
            serde_json::to_vec_pretty(&self.rows)?
        } else {
            serde_json::to_vec(&self.rows)?
        };
        Ok(bytes)
    }

    /// Deserializes a mapping written by [`RecordStore::encode`].
    ///
    /// # Errors
    ///
    /// Returns a codec error if the document is malformed.
    pub fn decode(data: &[u8]) -> CoreResult<Self> {
        let rows: BTreeMap<RecordId, Row> = serde_json::from_slice(data)?;
        Ok(Self::from_rows(rows))
    }

    /// Writes the store to `document` in `backend`.
    ///
    /// # Errors
    ///
    /// Returns a storage or codec error; failures are never swallowed.
    pub fn save(&self, backend: &dyn StorageBackend, document: &str, pretty: bool) -> CoreResult<()> {
        backend.write(document, &self.encode(pretty)?)?;
        Ok(())
    }

    /// Reads a store from `document`; an absent document is an empty store.
    ///
    /// # Errors
    ///
    /// Returns a storage or codec error.
    pub fn load(backend: &dyn StorageBackend, document: &str) -> CoreResult<Self> {
        match backend.read(document)? {
            Some(data) => Self::decode(&data),
            None => Ok(Self::new()),
        }
    }
}
