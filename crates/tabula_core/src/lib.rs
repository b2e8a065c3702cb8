//! # Tabula Core
//!
//! Core record-store engine for Tabula.
//!
//! This crate provides:
//! - Typed schemas with `NOT NULL` and `UNIQUE` constraints
//! - Per-table record storage with monotonic record IDs
//! - A primary-key index kept consistent with the rows
//! - Per-call transactions with rollback on persistence failure
//! - A registry of owned databases and a request/response service layer
//!
//! ## Example
//!
//! ```rust
//! use tabula_core::{Config, ConstraintMap, DataType, Principal, Registry, Value};
//!
//! let registry = Registry::in_memory(Config::default());
//! let (db, _) = registry
//!     .select_database("shop", &Principal::new("alice"))
//!     .unwrap();
//!
//! db.create_table(
//!     "users",
//!     &["id", "name"],
//!     &[DataType::Integer, DataType::Text],
//!     &ConstraintMap::new(),
//! )
//! .unwrap();
//! db.insert("users", &[Value::Integer(1), Value::from("Alice")]).unwrap();
//!
//! assert_eq!(db.select("users").unwrap().len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod access;
mod config;
mod database;
mod error;
mod index;
mod metadata;
mod record;
mod registry;
mod schema;
mod service;
mod table;
mod transaction;
mod types;
mod value;

pub use access::{IdentityFailure, IdentityVerifier, Principal};
pub use config::Config;
pub use database::Database;
pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use index::PrimaryKeyIndex;
pub use metadata::{Metadata, TableMetadata, METADATA_DOCUMENT};
pub use record::{RecordStore, Row};
pub use registry::{Registry, Selection};
pub use schema::{Column, Constraint, ConstraintMap, Schema};
pub use service::{Response, Service};
pub use table::{rows_document, DeleteOutcome, InsertOutcome, Table, UpdateOutcome};
pub use transaction::{LogEntry, LogOperation, TransactionLog, TransactionState};
pub use types::{RecordId, TransactionId};
pub use value::{DataType, Value};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
