//! Per-table transaction logging with rollback.
//!
//! Every mutating call on a database runs as one transaction against one
//! table. The log records each completed in-memory mutation with the data
//! needed to reverse it. If a later step fails (persisting rows or
//! metadata) the entries are replayed newest-first to restore the table.

mod log;
mod state;

pub use log::{LogEntry, LogOperation, TransactionLog};
pub use state::TransactionState;
