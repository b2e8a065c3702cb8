//! Database metadata document.
//!
//! One document per database records its owner and, per table, the column
//! definitions and the primary keys of live records:
//!
//! ```json
//! {
//!   "owner": "alice",
//!   "tables": {
//!     "users": {
//!       "columns": ["id", "name"],
//!       "datatypes": ["integer", "text"],
//!       "constraints": {"id": ["UNIQUE"]},
//!       "primaryKeyValues": [1, 2]
//!     }
//!   }
//! }
//! ```

use crate::error::CoreResult;
use crate::schema::{ConstraintMap, Schema};
use crate::table::Table;
use crate::value::{DataType, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tabula_storage::StorageBackend;

/// Document name of the metadata within a database's storage.
pub const METADATA_DOCUMENT: &str = "metadata.json";

/// Persisted description of one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMetadata {
    /// Column names in declaration order.
    pub columns: Vec<String>,
    /// Column datatypes in declaration order.
    pub datatypes: Vec<DataType>,
    /// Constraints per column; unconstrained columns are omitted.
    #[serde(default)]
    pub constraints: ConstraintMap,
    /// Primary keys of live records in record-ID order.
    #[serde(default)]
    pub primary_key_values: Vec<Value>,
}

impl TableMetadata {
    /// Describes the current state of `table`.
    #[must_use]
    pub fn describe(table: &Table) -> Self {
        let schema = table.schema();
        Self {
            columns: schema.column_names(),
            datatypes: schema.datatypes(),
            constraints: schema.constraint_map(),
            primary_key_values: table.primary_keys(),
        }
    }

    /// Rebuilds the schema.
    ///
    /// # Errors
    ///
    /// Returns a schema error if the stored definition is malformed.
    pub fn schema(&self) -> CoreResult<Schema> {
        Schema::define(&self.columns, &self.datatypes, &self.constraints)
    }
}

/// Persisted description of a database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Name of the owning principal.
    pub owner: String,
    /// Tables by name.
    #[serde(default)]
    pub tables: BTreeMap<String, TableMetadata>,
}

impl Metadata {
    /// Creates metadata for an empty database.
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            tables: BTreeMap::new(),
        }
    }

    /// Reads the metadata document, if present.
    ///
    /// # Errors
    ///
    /// Returns a storage or codec error.
    pub fn load(backend: &dyn StorageBackend) -> CoreResult<Option<Self>> {
        match backend.read(METADATA_DOCUMENT)? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    /// Writes the metadata document.
    ///
    /// # Errors
    ///
    /// Returns a storage or codec error.
    pub fn save(&self, backend: &dyn StorageBackend, pretty: bool) -> CoreResult<()> {
        let bytes = if pretty {
            serde_json::to_vec_pretty(self)?
        } else {
            serde_json::to_vec(self)?
        };
        backend.write(METADATA_DOCUMENT, &bytes)?;
        Ok(())
    }
}
