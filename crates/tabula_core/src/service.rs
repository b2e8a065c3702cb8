//! Request/response surface for front ends.
//!
//! Every operation takes a credential, resolves it through an
//! [`IdentityVerifier`], and returns a [`Response`] instead of an error so
//! adapters can render or serialize outcomes uniformly. Mutations require
//! the caller to own the database; reads only require a valid credential.

use crate::access::{IdentityVerifier, Principal};
use crate::database::Database;
use crate::error::{CoreError, CoreResult, ErrorKind};
use crate::record::Row;
use crate::registry::{Registry, Selection};
use crate::schema::Schema;
use crate::types::RecordId;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Outcome of a service operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Human-readable description.
    pub message: String,
    /// Error classification on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    /// Affected record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<RecordId>,
    /// Row image before an update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_record: Option<Row>,
    /// Primary key before an update or delete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_primary_key: Option<Value>,
    /// Primary key after an update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_primary_key: Option<Value>,
    /// Row removed by a delete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<Row>,
    /// Rows returned by a select.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Row>>,
}

impl Response {
    /// Creates a successful response.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            ..Self::default()
        }
    }

    /// Creates a failed response from an error.
    #[must_use]
    pub fn failure(error: &CoreError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            kind: Some(error.kind()),
            ..Self::default()
        }
    }
}

impl From<CoreError> for Response {
    fn from(error: CoreError) -> Self {
        Self::failure(&error)
    }
}

/// Front-end operations over a [`Registry`].
#[derive(Debug)]
pub struct Service<'a, V> {
    registry: &'a Registry,
    verifier: V,
}

impl<'a, V: IdentityVerifier> Service<'a, V> {
    /// Creates a service.
    pub fn new(registry: &'a Registry, verifier: V) -> Self {
        Self { registry, verifier }
    }

    /// Selects a database, creating it for the caller if missing.
    pub fn select_database(&self, credential: &str, db: &str) -> Response {
        respond("select_database", || {
            let principal = self.principal(credential)?;
            let (_, selection) = self.registry.select_database(db, &principal)?;
            Ok(match selection {
                Selection::Created => Response::ok(format!("Database {db} is created")),
                Selection::Selected => Response::ok(format!("Database {db} selected")),
            })
        })
    }

    /// Creates a table from textual column definitions.
    pub fn create_table<S: AsRef<str>, D: AsRef<str>>(
        &self,
        credential: &str,
        db: &str,
        table: &str,
        columns: &[S],
        datatypes: &[D],
        constraints: &BTreeMap<String, Vec<String>>,
    ) -> Response {
        respond("create_table", || {
            let database = self.owned(credential, db)?;
            let schema = Schema::parse(columns, datatypes, constraints)?;
            database.create_table_with_schema(table, schema)?;
            Ok(Response::ok("Table created successfully"))
        })
    }

    /// Inserts a record.
    pub fn insert_record(&self, credential: &str, db: &str, table: &str, content: &[Value]) -> Response {
        respond("insert_record", || {
            let outcome = self.owned(credential, db)?.insert(table, content)?;
            Ok(Response {
                record_id: Some(outcome.record_id),
                ..Response::ok("Record inserted successfully")
            })
        })
    }

    /// Returns every live row of a table in record-ID order.
    pub fn select_table(&self, credential: &str, db: &str, table: &str) -> Response {
        respond("select_table", || {
            self.principal(credential)?;
            let rows = self.registry.database(db)?.select(table)?;
            Ok(Response {
                rows: Some(rows),
                ..Response::ok(format!("Selected table {table}"))
            })
        })
    }

    /// Updates the record addressed by `key`.
    pub fn update_record(
        &self,
        credential: &str,
        db: &str,
        table: &str,
        key: &Value,
        new_record: &[Value],
    ) -> Response {
        respond("update_record", || {
            let outcome = self.owned(credential, db)?.update(table, key, new_record)?;
            Ok(Response {
                record_id: Some(outcome.record_id),
                original_record: Some(outcome.original),
                old_primary_key: Some(outcome.old_key),
                new_primary_key: Some(outcome.new_key),
                ..Response::ok("Record updated successfully")
            })
        })
    }

    /// Deletes the record addressed by `key`.
    pub fn delete_record(&self, credential: &str, db: &str, table: &str, key: &Value) -> Response {
        respond("delete_record", || {
            let outcome = self.owned(credential, db)?.delete(table, key)?;
            Ok(Response {
                record_id: Some(outcome.record_id),
                record: Some(outcome.record),
                old_primary_key: Some(outcome.key),
                ..Response::ok("Record deleted successfully")
            })
        })
    }

    /// Drops a table.
    pub fn drop_table(&self, credential: &str, db: &str, table: &str) -> Response {
        respond("drop_table", || {
            self.owned(credential, db)?.drop_table(table)?;
            Ok(Response::ok("Table dropped successfully"))
        })
    }

    fn principal(&self, credential: &str) -> CoreResult<Principal> {
        self.verifier
            .verify(credential)
            .map_err(CoreError::Unauthenticated)
    }

    fn owned(&self, credential: &str, db: &str) -> CoreResult<Arc<Database>> {
        let principal = self.principal(credential)?;
        let database = self.registry.database(db)?;
        database.authorize(&principal)?;
        Ok(database)
    }
}

fn respond(operation: &'static str, run: impl FnOnce() -> CoreResult<Response>) -> Response {
    run().unwrap_or_else(|e| {
        debug!(operation, kind = %e.kind(), error = %e, "request failed");
        Response::failure(&e)
    })
}
