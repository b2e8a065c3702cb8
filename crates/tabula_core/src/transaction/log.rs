//! Transaction log.

use super::state::TransactionState;
use crate::error::{CoreError, CoreResult};
use crate::record::Row;
use crate::table::{DeleteOutcome, InsertOutcome, Table, UpdateOutcome};
use crate::types::{RecordId, TransactionId};
use crate::value::Value;
use std::fmt;
use tracing::{debug, warn};

/// Kind of a logged mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOperation {
    /// A record was inserted.
    Insert,
    /// A record was updated.
    Update,
    /// A record was deleted.
    Delete,
}

impl fmt::Display for LogOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// A completed mutation with enough data to reverse it.
#[derive(Debug, Clone, PartialEq)]
pub enum LogEntry {
    /// Reversed by removing the record and its key.
    Insert {
        /// Table name.
        table: String,
        /// ID the record received.
        record_id: RecordId,
        /// Primary key the record received.
        key: Value,
    },
    /// Reversed by writing `before` back and restoring `old_key`.
    Update {
        /// Table name.
        table: String,
        /// ID of the updated record.
        record_id: RecordId,
        /// Row image before the update.
        before: Row,
        /// Primary key before the update.
        old_key: Value,
        /// Primary key after the update.
        new_key: Value,
    },
    /// Reversed by restoring `before` under its original ID.
    Delete {
        /// Table name.
        table: String,
        /// ID of the removed record.
        record_id: RecordId,
        /// The removed row.
        before: Row,
        /// Primary key of the removed row.
        key: Value,
    },
}

impl LogEntry {
    /// Logs an insert.
    #[must_use]
    pub fn insert(table: &str, outcome: &InsertOutcome) -> Self {
        Self::Insert {
            table: table.to_string(),
            record_id: outcome.record_id,
            key: outcome.key.clone(),
        }
    }

    /// Logs an update.
    #[must_use]
    pub fn update(table: &str, outcome: &UpdateOutcome) -> Self {
        Self::Update {
            table: table.to_string(),
            record_id: outcome.record_id,
            before: outcome.original.clone(),
            old_key: outcome.old_key.clone(),
            new_key: outcome.new_key.clone(),
        }
    }

    /// Logs a delete.
    #[must_use]
    pub fn delete(table: &str, outcome: &DeleteOutcome) -> Self {
        Self::Delete {
            table: table.to_string(),
            record_id: outcome.record_id,
            before: outcome.record.clone(),
            key: outcome.key.clone(),
        }
    }

    /// Returns the kind of mutation.
    #[must_use]
    pub fn operation(&self) -> LogOperation {
        match self {
            Self::Insert { .. } => LogOperation::Insert,
            Self::Update { .. } => LogOperation::Update,
            Self::Delete { .. } => LogOperation::Delete,
        }
    }

    /// Returns the table the mutation applied to.
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::Insert { table, .. } | Self::Update { table, .. } | Self::Delete { table, .. } => {
                table
            }
        }
    }

    /// Returns the affected record ID.
    #[must_use]
    pub fn record_id(&self) -> RecordId {
        match self {
            Self::Insert { record_id, .. }
            | Self::Update { record_id, .. }
            | Self::Delete { record_id, .. } => *record_id,
        }
    }
}

/// Undo log for one transaction at a time.
///
/// Entries are only kept while the transaction is open; commit and
/// rollback both clear them.
#[derive(Debug, Default)]
pub struct TransactionLog {
    id: Option<TransactionId>,
    state: TransactionState,
    entries: Vec<LogEntry>,
}

impl TransactionLog {
    /// Creates an idle log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Returns the ID of the current or last transaction.
    #[must_use]
    pub fn id(&self) -> Option<TransactionId> {
        self.id
    }

    /// Returns the entries recorded so far.
    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Opens a transaction.
    ///
    /// # Errors
    ///
    /// Returns an invalid operation error if a transaction is already open.
    pub fn begin(&mut self, id: TransactionId) -> CoreResult<()> {
        if self.state == TransactionState::Open {
            return Err(CoreError::invalid_operation(format!(
                "cannot begin {id}: {} is still open",
                self.id.map_or_else(|| "a transaction".to_string(), |open| open.to_string())
            )));
        }
        self.id = Some(id);
        self.state = TransactionState::Open;
        self.entries.clear();
        Ok(())
    }

    /// Records a completed mutation.
    ///
    /// # Errors
    ///
    /// Returns an invalid operation error if no transaction is open.
    pub fn record(&mut self, entry: LogEntry) -> CoreResult<()> {
        self.state.ensure_open()?;
        debug!(
            txid = %self.display_id(),
            operation = %entry.operation(),
            table = entry.table(),
            record = %entry.record_id(),
            "logged mutation"
        );
        self.entries.push(entry);
        Ok(())
    }

    /// Commits the transaction, discarding its entries.
    ///
    /// Returns the number of entries committed.
    ///
    /// # Errors
    ///
    /// Returns an invalid operation error if no transaction is open.
    pub fn commit(&mut self) -> CoreResult<usize> {
        self.state.ensure_open()?;
        let count = self.entries.len();
        self.entries.clear();
        self.state = TransactionState::Committed;
        Ok(count)
    }

    /// Replays the entries newest-first against `table`.
    ///
    /// Every entry is attempted even if an earlier undo fails. Returns the
    /// number of entries replayed.
    ///
    /// # Errors
    ///
    /// Returns an invalid operation error if no transaction is open, or the
    /// first undo failure.
    pub fn rollback(&mut self, table: &mut Table) -> CoreResult<usize> {
        self.state.ensure_open()?;
        let entries = std::mem::take(&mut self.entries);
        self.state = TransactionState::RolledBack;

        let mut first_error = None;
        for entry in entries.iter().rev() {
            if entry.table() != table.name() {
                warn!(
                    txid = %self.display_id(),
                    table = entry.table(),
                    "skipping entry logged against another table"
                );
                continue;
            }
            if let Err(e) = table.undo(entry) {
                warn!(
                    txid = %self.display_id(),
                    operation = %entry.operation(),
                    record = %entry.record_id(),
                    error = %e,
                    "undo failed"
                );
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(entries.len()),
        }
    }

    /// Returns a finished log to idle.
    pub fn end(&mut self) {
        if self.state != TransactionState::Open {
            self.state = TransactionState::Idle;
        }
    }

    fn display_id(&self) -> String {
        self.id.map_or_else(|| "txn:-".to_string(), |id| id.to_string())
    }
}
