//! Tables: schema, record store and primary-key index as one unit.

use crate::error::{CoreError, CoreResult};
use crate::index::PrimaryKeyIndex;
use crate::record::{RecordStore, Row};
use crate::schema::{validate_name, Constraint, ConstraintMap, Schema};
use crate::transaction::LogEntry;
use crate::types::RecordId;
use crate::value::{DataType, Value};
use tabula_storage::StorageBackend;

/// Returns the document name holding a table's rows.
#[must_use]
pub fn rows_document(table: &str) -> String {
    format!("rows/{table}.json")
}

/// Result of a successful insert.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertOutcome {
    /// ID allocated to the new record.
    pub record_id: RecordId,
    /// Primary key of the new record.
    pub key: Value,
}

/// Result of a successful update.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    /// ID of the updated record (unchanged by the update).
    pub record_id: RecordId,
    /// Row image before the update.
    pub original: Row,
    /// Row image after the update.
    pub updated: Row,
    /// Primary key before the update.
    pub old_key: Value,
    /// Primary key after the update.
    pub new_key: Value,
}

/// Result of a successful delete.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteOutcome {
    /// ID of the removed record.
    pub record_id: RecordId,
    /// The removed row.
    pub record: Row,
    /// Primary key the record was addressed by.
    pub key: Value,
}

/// A named table.
///
/// Every mutation validates fully before touching anything, then changes
/// the record store and the primary-key index together. A failed call
/// leaves both exactly as they were.
///
/// Tables only mutate memory. Persisting rows and undoing completed
/// mutations is driven by the owning database through its transaction log.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    schema: Schema,
    store: RecordStore,
    index: PrimaryKeyIndex,
}

impl Table {
    /// Creates an empty table with the given schema.
    ///
    /// # Errors
    ///
    /// Returns a schema error if the name is invalid.
    pub fn new(name: &str, schema: Schema) -> CoreResult<Self> {
        validate_name("table", name)?;
        Ok(Self {
            name: name.to_string(),
            schema,
            store: RecordStore::new(),
            index: PrimaryKeyIndex::new(),
        })
    }

    /// Creates an empty table, defining its columns.
    ///
    /// Column 0 becomes the primary key.
    ///
    /// # Errors
    ///
    /// Returns a schema error if the definition is malformed.
    pub fn create<S: AsRef<str>>(
        name: &str,
        columns: &[S],
        datatypes: &[DataType],
        constraints: &ConstraintMap,
    ) -> CoreResult<Self> {
        Self::new(name, Schema::define(columns, datatypes, constraints)?)
    }

    /// Reassembles a table from a schema and loaded rows.
    ///
    /// # Errors
    ///
    /// Returns a corrupt data error if a row does not fit the schema or
    /// two rows share a primary key.
    pub fn from_parts(name: &str, schema: Schema, store: RecordStore) -> CoreResult<Self> {
        validate_name("table", name)?;
        for (id, row) in store.select_all() {
            check_stored_row(name, &schema, id, row)?;
        }
        let index = PrimaryKeyIndex::rebuild(&store)?;
        Ok(Self {
            name: name.to_string(),
            schema,
            store,
            index,
        })
    }

    /// Loads a table's rows from `backend`.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the rows cannot be read or do not
    /// fit the schema.
    pub fn load(name: &str, schema: Schema, backend: &dyn StorageBackend) -> CoreResult<Self> {
        let store = RecordStore::load(backend, &rows_document(name))?;
        Self::from_parts(name, schema, store)
    }

    /// Writes the table's rows to `backend`.
    ///
    /// # Errors
    ///
    /// Returns a storage or codec error.
    pub fn save_rows(&self, backend: &dyn StorageBackend, pretty: bool) -> CoreResult<()> {
        self.store.save(backend, &rows_document(&self.name), pretty)
    }

    /// Returns the table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the number of live records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns true if the table has no live records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Returns the ID the next insert will receive.
    #[must_use]
    pub fn next_record_id(&self) -> RecordId {
        self.store.next_id()
    }

    /// Returns all live rows in record-ID order.
    #[must_use]
    pub fn select(&self) -> Vec<Row> {
        self.store.select_all().map(|(_, row)| row.clone()).collect()
    }

    /// Returns all live records with their IDs, in record-ID order.
    #[must_use]
    pub fn records(&self) -> Vec<(RecordId, Row)> {
        self.store
            .select_all()
            .map(|(id, row)| (id, row.clone()))
            .collect()
    }

    /// Returns the primary keys of all live records, in record-ID order.
    #[must_use]
    pub fn primary_keys(&self) -> Vec<Value> {
        self.store
            .select_all()
            .map(|(_, row)| row[0].clone())
            .collect()
    }

    /// Looks up a record by primary key.
    #[must_use]
    pub fn find(&self, key: &Value) -> Option<(RecordId, &Row)> {
        let key = self.schema.coerce_key(key)?;
        let id = self.index.find(&key)?;
        self.store.get(id).ok().map(|row| (id, row))
    }

    /// Validates and inserts a record.
    ///
    /// # Errors
    ///
    /// Returns a validation error, or `DuplicateKey` if the primary key is
    /// already live. Nothing changes on failure.
    pub fn insert(&mut self, content: &[Value]) -> CoreResult<InsertOutcome> {
        let row = self.schema.validate_row(content, &self.store, None)?;
        let key = row[0].clone();
        if self.index.contains(&key) {
            return Err(CoreError::DuplicateKey {
                table: self.name.clone(),
                key,
            });
        }

        let record_id = self.store.insert(row);
        if let Err(e) = self.index.insert(key.clone(), record_id) {
            self.store.remove(record_id)?;
            return Err(e);
        }

        Ok(InsertOutcome { record_id, key })
    }

    /// Validates and applies an update to the record addressed by `key`.
    ///
    /// The record keeps its ID. If the primary key changes, the old key is
    /// released and the new key reserved.
    ///
    /// # Errors
    ///
    /// Returns `RecordNotFound` if no live record has `key`, a validation
    /// error, or `DuplicateKey` if the new key belongs to another record.
    /// Nothing changes on failure.
    pub fn update(&mut self, key: &Value, content: &[Value]) -> CoreResult<UpdateOutcome> {
        let (record_id, old_key) = self.resolve(key)?;
        let row = self
            .schema
            .validate_row(content, &self.store, Some(record_id))?;
        let new_key = row[0].clone();

        if new_key != old_key && self.index.contains(&new_key) {
            return Err(CoreError::DuplicateKey {
                table: self.name.clone(),
                key: new_key,
            });
        }

        let original = self.store.replace(record_id, row.clone())?;
        if new_key != old_key {
            self.index.remove(&old_key);
            self.index.insert(new_key.clone(), record_id)?;
        }

        Ok(UpdateOutcome {
            record_id,
            original,
            updated: row,
            old_key,
            new_key,
        })
    }

    /// Removes the record addressed by `key`.
    ///
    /// # Errors
    ///
    /// Returns `RecordNotFound` if no live record has `key`.
    pub fn delete(&mut self, key: &Value) -> CoreResult<DeleteOutcome> {
        let (record_id, key) = self.resolve(key)?;
        let record = self.store.remove(record_id)?;
        self.index.remove(&key);
        Ok(DeleteOutcome {
            record_id,
            record,
            key,
        })
    }

    /// Reverses a logged mutation directly against the store and index.
    pub(crate) fn undo(&mut self, entry: &LogEntry) -> CoreResult<()> {
        match entry {
            LogEntry::Insert { record_id, key, .. } => {
                self.store.remove(*record_id)?;
                self.index.remove(key);
            }
            LogEntry::Update {
                record_id,
                before,
                old_key,
                new_key,
                ..
            } => {
                self.store.replace(*record_id, before.clone())?;
                if old_key != new_key {
                    self.index.remove(new_key);
                    self.index.insert(old_key.clone(), *record_id)?;
                }
            }
            LogEntry::Delete {
                record_id,
                before,
                key,
                ..
            } => {
                self.store.restore(*record_id, before.clone())?;
                self.index.insert(key.clone(), *record_id)?;
            }
        }
        Ok(())
    }

    fn resolve(&self, key: &Value) -> CoreResult<(RecordId, Value)> {
        let not_found = || CoreError::RecordNotFound {
            table: self.name.clone(),
            key: key.clone(),
        };
        let coerced = self.schema.coerce_key(key).ok_or_else(not_found)?;
        let id = self.index.find(&coerced).ok_or_else(not_found)?;
        Ok((id, coerced))
    }

    #[cfg(test)]
    pub(crate) fn index(&self) -> &PrimaryKeyIndex {
        &self.index
    }
}

/// Checks that a loaded row is exactly what validation would have stored.
fn check_stored_row(table: &str, schema: &Schema, id: RecordId, row: &Row) -> CoreResult<()> {
    if row.len() != schema.len() {
        return Err(CoreError::corrupt(format!(
            "record {id} of table {table} has {} values, schema has {} columns",
            row.len(),
            schema.len()
        )));
    }

    for (position, (column, value)) in schema.columns().iter().zip(row).enumerate() {
        if column.data_type().coerce(value).as_ref() != Some(value) {
            return Err(CoreError::corrupt(format!(
                "record {id} of table {table} holds {value} in {} column {}",
                column.data_type(),
                column.name()
            )));
        }
        if value.is_missing() && (position == 0 || column.has(Constraint::NotNull)) {
            return Err(CoreError::corrupt(format!(
                "record {id} of table {table} has no value for column {}",
                column.name()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ValidationError};
    use tabula_storage::InMemoryBackend;

    fn users() -> Table {
        let mut constraints = ConstraintMap::new();
        constraints.insert("id".into(), vec![Constraint::Unique, Constraint::NotNull]);
        constraints.insert("email".into(), vec![Constraint::Unique]);
        Table::create(
            "users",
            &["id", "name", "email"],
            &[DataType::Integer, DataType::Text, DataType::Text],
            &constraints,
        )
        .unwrap()
    }

    fn user(id: i64, name: &str, email: &str) -> Vec<Value> {
        vec![Value::Integer(id), name.into(), email.into()]
    }

    fn assert_consistent(table: &Table) {
        assert_eq!(table.index().len(), table.len());
        for (id, row) in table.records() {
            assert_eq!(table.index().find(&row[0]), Some(id));
        }
    }

    #[test]
    fn insert_then_select() {
        let mut table = users();
        let outcome = table.insert(&user(1, "Alice", "a@x.io")).unwrap();

        assert_eq!(outcome.record_id, RecordId::FIRST);
        assert_eq!(outcome.key, Value::Integer(1));
        assert_eq!(table.select(), vec![user(1, "Alice", "a@x.io")]);
        assert_consistent(&table);
    }

    #[test]
    fn duplicate_primary_key_conflicts() {
        let mut table = users();
        table.insert(&user(1, "Alice", "a@x.io")).unwrap();

        let err = table.insert(&user(1, "Bob", "b@x.io")).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateKey { .. }));
        assert_eq!(table.len(), 1);
        assert_eq!(table.next_record_id(), RecordId::new(2));
    }

    #[test]
    fn arity_failure_changes_nothing() {
        let mut table = users();
        let err = table.insert(&[Value::Integer(1)]).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::ArityMismatch { .. })
        ));
        assert!(table.is_empty());
        assert_eq!(table.next_record_id(), RecordId::FIRST);
    }

    #[test]
    fn update_in_place_keeps_record_id() {
        let mut table = users();
        let inserted = table.insert(&user(1, "Alice", "a@x.io")).unwrap();

        let outcome = table
            .update(&Value::Integer(1), &user(1, "Alicia", "a@x.io"))
            .unwrap();
        assert_eq!(outcome.record_id, inserted.record_id);
        assert_eq!(outcome.original, user(1, "Alice", "a@x.io"));
        assert_eq!(outcome.old_key, outcome.new_key);
        assert_eq!(table.select(), vec![user(1, "Alicia", "a@x.io")]);
    }

    #[test]
    fn update_moves_primary_key() {
        let mut table = users();
        let inserted = table.insert(&user(1, "Alice", "a@x.io")).unwrap();

        table
            .update(&Value::Integer(1), &user(5, "Alice", "a@x.io"))
            .unwrap();
        assert!(table.find(&Value::Integer(1)).is_none());
        assert_eq!(
            table.find(&Value::Integer(5)).map(|(id, _)| id),
            Some(inserted.record_id)
        );
        assert_consistent(&table);
    }

    #[test]
    fn update_to_taken_key_fails_without_changes() {
        let mut table = users();
        table.insert(&user(1, "Alice", "a@x.io")).unwrap();
        table.insert(&user(2, "Bob", "b@x.io")).unwrap();
        let before = table.records();

        let err = table
            .update(&Value::Integer(1), &user(2, "Alice", "a@x.io"))
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateKey { .. }));
        assert_eq!(table.records(), before);
        assert_consistent(&table);
    }

    #[test]
    fn update_unique_conflict_with_other_row() {
        let mut table = users();
        table.insert(&user(1, "Alice", "a@x.io")).unwrap();
        table.insert(&user(2, "Bob", "b@x.io")).unwrap();

        let err = table
            .update(&Value::Integer(2), &user(2, "Bob", "a@x.io"))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::UniqueViolation { .. })
        ));
    }

    #[test]
    fn update_missing_key_is_not_found() {
        let mut table = users();
        let err = table
            .update(&Value::Integer(9), &user(9, "X", "x@x.io"))
            .unwrap_err();
        assert!(matches!(err, CoreError::RecordNotFound { .. }));

        // Keys that cannot be coerced cannot exist either.
        let err = table.delete(&"nine".into()).unwrap_err();
        assert!(matches!(err, CoreError::RecordNotFound { .. }));
    }

    #[test]
    fn textual_keys_are_coerced() {
        let mut table = users();
        table.insert(&user(1, "Alice", "a@x.io")).unwrap();
        let outcome = table.delete(&"1".into()).unwrap();
        assert_eq!(outcome.key, Value::Integer(1));
    }

    #[test]
    fn delete_frees_key_but_not_id() {
        let mut table = users();
        let first = table.insert(&user(1, "Alice", "a@x.io")).unwrap();
        let deleted = table.delete(&Value::Integer(1)).unwrap();
        assert_eq!(deleted.record, user(1, "Alice", "a@x.io"));
        assert!(table.is_empty());

        let second = table.insert(&user(1, "Carol", "c@x.io")).unwrap();
        assert!(second.record_id > first.record_id);
        assert_consistent(&table);
    }

    #[test]
    fn undo_reverses_each_mutation() {
        let mut table = users();
        let pristine = table.insert(&user(1, "Alice", "a@x.io")).unwrap();
        let snapshot = table.records();

        let inserted = table.insert(&user(2, "Bob", "b@x.io")).unwrap();
        table
            .undo(&LogEntry::insert("users", &inserted))
            .unwrap();
        assert_eq!(table.records(), snapshot);

        let updated = table
            .update(&Value::Integer(1), &user(7, "Al", "al@x.io"))
            .unwrap();
        table.undo(&LogEntry::update("users", &updated)).unwrap();
        assert_eq!(table.records(), snapshot);
        assert_eq!(
            table.find(&Value::Integer(1)).map(|(id, _)| id),
            Some(pristine.record_id)
        );

        let deleted = table.delete(&Value::Integer(1)).unwrap();
        table.undo(&LogEntry::delete("users", &deleted)).unwrap();
        assert_eq!(table.records(), snapshot);
        assert_consistent(&table);
    }

    #[test]
    fn rows_round_trip_through_backend() {
        let backend = InMemoryBackend::new();
        let mut table = users();
        table.insert(&user(1, "Alice", "a@x.io")).unwrap();
        table.insert(&user(2, "Bob", "b@x.io")).unwrap();
        table.save_rows(&backend, false).unwrap();

        let loaded = Table::load("users", table.schema().clone(), &backend).unwrap();
        assert_eq!(loaded.records(), table.records());
        assert_eq!(loaded.next_record_id(), RecordId::new(3));
        assert_consistent(&loaded);
    }

    #[test]
    fn from_parts_rejects_misfit_rows() {
        let mut store = RecordStore::new();
        store.insert(vec![Value::Integer(1)]);
        let err = Table::from_parts("users", users().schema().clone(), store).unwrap_err();
        assert!(matches!(err, CoreError::Corrupt { .. }));
    }

    #[test]
    fn from_parts_rejects_mistyped_cells() {
        let schema = users().schema().clone();

        let mut store = RecordStore::new();
        store.insert(vec!["abc".into(), "Alice".into(), "a@x.io".into()]);
        let err = Table::from_parts("users", schema.clone(), store).unwrap_err();
        assert!(matches!(err, CoreError::Corrupt { .. }));
        assert_eq!(err.kind(), ErrorKind::Persistence);

        let mut store = RecordStore::new();
        store.insert(vec![Value::Null, "Alice".into(), "a@x.io".into()]);
        let err = Table::from_parts("users", schema, store).unwrap_err();
        assert!(matches!(err, CoreError::Corrupt { .. }));
    }

    #[test]
    fn invalid_update_changes_nothing() {
        let mut constraints = ConstraintMap::new();
        constraints.insert("name".into(), vec![Constraint::NotNull]);
        let mut table = Table::create(
            "people",
            &["id", "name", "age"],
            &[DataType::Integer, DataType::Text, DataType::Integer],
            &constraints,
        )
        .unwrap();
        let alice = vec![Value::Integer(1), "Alice".into(), Value::Integer(30)];
        let inserted = table.insert(&alice).unwrap();
        let before = table.records();

        let attempts: Vec<Vec<Value>> = vec![
            vec![Value::Integer(1), Value::Null, Value::Integer(30)],
            vec![Value::Integer(1), "   ".into(), Value::Integer(30)],
            vec![Value::Integer(1), "Alice".into(), "thirty".into()],
            vec![Value::Null, "Alice".into(), Value::Integer(30)],
            vec![Value::Integer(1), "Alice".into()],
            vec![
                Value::Integer(1),
                "Alice".into(),
                Value::Integer(30),
                Value::Integer(0),
            ],
        ];
        for attempt in &attempts {
            let err = table.update(&Value::Integer(1), attempt).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{attempt:?}");
            assert_eq!(table.records(), before);
            assert_consistent(&table);
        }

        let err = table
            .update(&Value::Integer(1), &[Value::Integer(1), Value::Null, Value::Integer(30)])
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::NullViolation { .. })
        ));
        assert_eq!(
            table.find(&Value::Integer(1)).map(|(id, _)| id),
            Some(inserted.record_id)
        );
    }

    #[test]
    fn invalid_table_name() {
        let schema = users().schema().clone();
        assert!(Table::new("../etc", schema).is_err());
    }
}
