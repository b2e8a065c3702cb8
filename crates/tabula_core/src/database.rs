//! Database: the table catalog and transactional mutations.

use crate::access::Principal;
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::metadata::{Metadata, TableMetadata};
use crate::record::Row;
use crate::schema::{validate_name, ConstraintMap, Schema};
use crate::table::{rows_document, DeleteOutcome, InsertOutcome, Table, UpdateOutcome};
use crate::transaction::{LogEntry, LogOperation, TransactionLog};
use crate::types::{RecordId, TransactionId};
use crate::value::{DataType, Value};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tabula_storage::StorageBackend;
use tracing::{debug, error, info, warn};

/// A table together with its transaction log.
///
/// Both sit behind one lock, so transactions on a table are serialized
/// while different tables proceed independently.
#[derive(Debug)]
struct TableSlot {
    table: Table,
    log: TransactionLog,
}

impl TableSlot {
    fn new(table: Table) -> Self {
        Self {
            table,
            log: TransactionLog::new(),
        }
    }
}

/// A named collection of tables with one owner.
///
/// Every mutating call is one transaction:
///
/// 1. open the table's transaction log
/// 2. apply the mutation in memory and log it
/// 3. persist the table's rows, then the metadata document
/// 4. commit
///
/// If any step after the mutation fails, the log is replayed in reverse,
/// the restored state is persisted again and the original error is
/// returned. Callers never observe a half-applied mutation.
///
/// Locks are taken in the order table map, table slot, catalog.
pub struct Database {
    name: String,
    owner: Principal,
    config: Config,
    backend: Arc<dyn StorageBackend>,
    tables: RwLock<BTreeMap<String, Arc<RwLock<TableSlot>>>>,
    catalog: Mutex<Metadata>,
    next_txid: AtomicU64,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("tables", &self.table_names())
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Creates a new, empty database owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseExists` if `backend` already holds a database, a
    /// schema error for an invalid name, or a persistence error.
    pub fn create(
        name: &str,
        owner: &Principal,
        backend: Arc<dyn StorageBackend>,
        config: Config,
    ) -> CoreResult<Self> {
        validate_name("database", name)?;
        if Metadata::load(backend.as_ref())?.is_some() {
            return Err(CoreError::DatabaseExists {
                name: name.to_string(),
            });
        }

        let metadata = Metadata::new(owner.as_str());
        metadata.save(backend.as_ref(), config.pretty_documents)?;
        info!(database = name, owner = %owner, "database created");

        Ok(Self::assemble(name, metadata, BTreeMap::new(), backend, config))
    }

    /// Opens an existing database, loading every table.
    ///
    /// Row data is authoritative: if the primary keys recorded in the
    /// metadata disagree with the loaded rows, a warning is logged and the
    /// metadata entry is rebuilt from the rows.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseNotFound` if `backend` holds no metadata, or a
    /// persistence error if a document is unreadable or inconsistent.
    pub fn open(name: &str, backend: Arc<dyn StorageBackend>, config: Config) -> CoreResult<Self> {
        validate_name("database", name)?;
        let mut metadata =
            Metadata::load(backend.as_ref())?.ok_or_else(|| CoreError::DatabaseNotFound {
                name: name.to_string(),
            })?;

        let mut tables = BTreeMap::new();
        for (table_name, entry) in &mut metadata.tables {
            let table = Table::load(table_name, entry.schema()?, backend.as_ref())?;

            let recorded: HashSet<&Value> = entry.primary_key_values.iter().collect();
            let loaded = table.primary_keys();
            if recorded.len() != loaded.len() || !loaded.iter().all(|k| recorded.contains(k)) {
                warn!(
                    database = name,
                    table = %table_name,
                    recorded = entry.primary_key_values.len(),
                    loaded = loaded.len(),
                    "metadata primary keys disagree with row data, using row data"
                );
                entry.primary_key_values = loaded;
            }

            debug!(database = name, table = %table_name, rows = table.len(), "table loaded");
            tables.insert(table_name.clone(), Arc::new(RwLock::new(TableSlot::new(table))));
        }

        info!(
            database = name,
            owner = %metadata.owner,
            tables = tables.len(),
            "database opened"
        );
        Ok(Self::assemble(name, metadata, tables, backend, config))
    }

    fn assemble(
        name: &str,
        metadata: Metadata,
        tables: BTreeMap<String, Arc<RwLock<TableSlot>>>,
        backend: Arc<dyn StorageBackend>,
        config: Config,
    ) -> Self {
        Self {
            name: name.to_string(),
            owner: Principal::new(metadata.owner.clone()),
            config,
            backend,
            tables: RwLock::new(tables),
            catalog: Mutex::new(metadata),
            next_txid: AtomicU64::new(1),
        }
    }

    /// Returns the database name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the owning principal.
    #[must_use]
    pub fn owner(&self) -> &Principal {
        &self.owner
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Checks that `principal` may mutate this database.
    ///
    /// # Errors
    ///
    /// Returns `AccessDenied` unless `principal` is the owner.
    pub fn authorize(&self, principal: &Principal) -> CoreResult<()> {
        if *principal == self.owner {
            Ok(())
        } else {
            Err(CoreError::AccessDenied {
                principal: principal.to_string(),
                database: self.name.clone(),
            })
        }
    }

    /// Returns the table names in sorted order.
    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        self.tables.read().keys().cloned().collect()
    }

    /// Checks whether a table exists.
    #[must_use]
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.read().contains_key(name)
    }

    /// Returns a snapshot of the metadata document.
    #[must_use]
    pub fn metadata(&self) -> Metadata {
        self.catalog.lock().clone()
    }

    /// Creates a table from column names, datatypes and constraints.
    ///
    /// Column 0 becomes the primary key.
    ///
    /// # Errors
    ///
    /// Returns a schema error, `TableExists`, or a persistence error. On
    /// failure no table is created.
    pub fn create_table<S: AsRef<str>>(
        &self,
        name: &str,
        columns: &[S],
        datatypes: &[DataType],
        constraints: &ConstraintMap,
    ) -> CoreResult<()> {
        self.create_table_with_schema(name, Schema::define(columns, datatypes, constraints)?)
    }

    /// Creates a table from an already defined schema.
    ///
    /// # Errors
    ///
    /// See [`Database::create_table`].
    pub fn create_table_with_schema(&self, name: &str, schema: Schema) -> CoreResult<()> {
        let table = Table::new(name, schema)?;
        let pretty = self.config.pretty_documents;

        let mut tables = self.tables.write();
        if tables.contains_key(name) {
            return Err(CoreError::TableExists {
                name: name.to_string(),
            });
        }

        let mut catalog = self.catalog.lock();
        table.save_rows(self.backend.as_ref(), pretty)?;
        catalog
            .tables
            .insert(name.to_string(), TableMetadata::describe(&table));
        if let Err(e) = catalog.save(self.backend.as_ref(), pretty) {
            catalog.tables.remove(name);
            if let Err(cleanup) = self.backend.remove(&rows_document(name)) {
                warn!(database = %self.name, table = name, error = %cleanup, "failed to remove rows document");
            }
            return Err(e);
        }
        drop(catalog);

        info!(
            database = %self.name,
            table = name,
            columns = table.schema().len(),
            "table created"
        );
        tables.insert(name.to_string(), Arc::new(RwLock::new(TableSlot::new(table))));
        Ok(())
    }

    /// Drops a table and its persisted rows.
    ///
    /// Waits for in-flight transactions on the table. A table created
    /// later under the same name starts empty with a fresh ID counter.
    ///
    /// # Errors
    ///
    /// Returns `TableNotFound` or a persistence error. On failure the
    /// table is left in place.
    pub fn drop_table(&self, name: &str) -> CoreResult<()> {
        let pretty = self.config.pretty_documents;
        let mut tables = self.tables.write();
        let slot = tables
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::table_not_found(name))?;
        let slot = slot.write();

        let mut catalog = self.catalog.lock();
        self.backend.remove(&rows_document(name))?;
        let removed = catalog.tables.remove(name);
        if let Err(e) = catalog.save(self.backend.as_ref(), pretty) {
            if let Some(entry) = removed {
                catalog.tables.insert(name.to_string(), entry);
            }
            if let Err(restore) = slot.table.save_rows(self.backend.as_ref(), pretty) {
                error!(database = %self.name, table = name, error = %restore, "failed to restore rows document");
            }
            return Err(e);
        }
        drop(catalog);
        drop(slot);

        tables.remove(name);
        info!(database = %self.name, table = name, "table dropped");
        Ok(())
    }

    /// Returns a table's schema.
    ///
    /// # Errors
    ///
    /// Returns `TableNotFound`.
    pub fn schema(&self, table: &str) -> CoreResult<Schema> {
        Ok(self.slot(table)?.read().table.schema().clone())
    }

    /// Returns all live rows of a table in record-ID order.
    ///
    /// # Errors
    ///
    /// Returns `TableNotFound`.
    pub fn select(&self, table: &str) -> CoreResult<Vec<Row>> {
        Ok(self.slot(table)?.read().table.select())
    }

    /// Returns all live records of a table with their IDs.
    ///
    /// # Errors
    ///
    /// Returns `TableNotFound`.
    pub fn records(&self, table: &str) -> CoreResult<Vec<(RecordId, Row)>> {
        Ok(self.slot(table)?.read().table.records())
    }

    /// Looks up one record by primary key.
    ///
    /// # Errors
    ///
    /// Returns `TableNotFound` or `RecordNotFound`.
    pub fn find(&self, table: &str, key: &Value) -> CoreResult<(RecordId, Row)> {
        let slot = self.slot(table)?;
        let guard = slot.read();
        guard
            .table
            .find(key)
            .map(|(id, row)| (id, row.clone()))
            .ok_or_else(|| CoreError::RecordNotFound {
                table: table.to_string(),
                key: key.clone(),
            })
    }

    /// Inserts a record.
    ///
    /// # Errors
    ///
    /// Returns `TableNotFound`, a validation error, `DuplicateKey`, or a
    /// persistence error. On failure nothing changes.
    pub fn insert(&self, table: &str, content: &[Value]) -> CoreResult<InsertOutcome> {
        self.transact(table, LogOperation::Insert, |t| {
            let outcome = t.insert(content)?;
            let entry = LogEntry::insert(t.name(), &outcome);
            Ok((outcome, entry))
        })
    }

    /// Updates the record addressed by `key`.
    ///
    /// # Errors
    ///
    /// Returns `TableNotFound`, `RecordNotFound`, a validation error,
    /// `DuplicateKey`, or a persistence error. On failure nothing changes.
    pub fn update(&self, table: &str, key: &Value, content: &[Value]) -> CoreResult<UpdateOutcome> {
        self.transact(table, LogOperation::Update, |t| {
            let outcome = t.update(key, content)?;
            let entry = LogEntry::update(t.name(), &outcome);
            Ok((outcome, entry))
        })
    }

    /// Deletes the record addressed by `key`.
    ///
    /// # Errors
    ///
    /// Returns `TableNotFound`, `RecordNotFound`, or a persistence error.
    /// On failure nothing changes.
    pub fn delete(&self, table: &str, key: &Value) -> CoreResult<DeleteOutcome> {
        self.transact(table, LogOperation::Delete, |t| {
            let outcome = t.delete(key)?;
            let entry = LogEntry::delete(t.name(), &outcome);
            Ok((outcome, entry))
        })
    }

    fn slot(&self, name: &str) -> CoreResult<Arc<RwLock<TableSlot>>> {
        self.tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::table_not_found(name))
    }

    fn next_transaction_id(&self) -> TransactionId {
        TransactionId::new(self.next_txid.fetch_add(1, Ordering::SeqCst))
    }

    fn transact<T, F>(&self, table_name: &str, operation: LogOperation, apply: F) -> CoreResult<T>
    where
        F: FnOnce(&mut Table) -> CoreResult<(T, LogEntry)>,
    {
        let slot = self.slot(table_name)?;
        let mut guard = slot.write();
        let TableSlot { table, log } = &mut *guard;

        let txid = self.next_transaction_id();
        log.begin(txid)?;
        debug!(database = %self.name, %txid, table = table_name, %operation, "transaction open");

        let result = apply(&mut *table).and_then(|(outcome, entry)| {
            log.record(entry)?;
            self.persist(table)?;
            Ok(outcome)
        });

        match result {
            Ok(outcome) => {
                let entries = log.commit()?;
                log.end();
                debug!(database = %self.name, %txid, entries, "transaction committed");
                Ok(outcome)
            }
            Err(e) => {
                self.roll_back(table, log, txid, &e);
                Err(e)
            }
        }
    }

    fn persist(&self, table: &Table) -> CoreResult<()> {
        let pretty = self.config.pretty_documents;
        table.save_rows(self.backend.as_ref(), pretty)?;

        let mut catalog = self.catalog.lock();
        catalog
            .tables
            .insert(table.name().to_string(), TableMetadata::describe(table));
        catalog.save(self.backend.as_ref(), pretty)
    }

    fn roll_back(
        &self,
        table: &mut Table,
        log: &mut TransactionLog,
        txid: TransactionId,
        cause: &CoreError,
    ) {
        match log.rollback(table) {
            Ok(0) => {
                debug!(database = %self.name, %txid, error = %cause, "transaction aborted");
            }
            Ok(undone) => {
                warn!(
                    database = %self.name,
                    %txid,
                    table = table.name(),
                    undone,
                    error = %cause,
                    "transaction rolled back"
                );
                if let Err(e) = self.persist(table) {
                    error!(
                        database = %self.name,
                        %txid,
                        table = table.name(),
                        error = %e,
                        "failed to persist rolled-back state"
                    );
                }
            }
            Err(e) => {
                error!(database = %self.name, %txid, error = %e, "rollback failed");
            }
        }
        log.end();
    }
}
