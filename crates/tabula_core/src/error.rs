//! Error types for Tabula core.

use crate::access::IdentityFailure;
use crate::types::RecordId;
use crate::value::{DataType, Value};
use std::fmt;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Coarse classification of a [`CoreError`].
///
/// Adapters branch on the kind (for status codes, exit codes, retries)
/// instead of matching message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed column or datatype definition.
    Schema,
    /// Row rejected by arity, type or constraint checks.
    Validation,
    /// Database, table or record is absent.
    NotFound,
    /// Duplicate primary key.
    Conflict,
    /// Database or table name already taken.
    AlreadyExists,
    /// Failure saving or loading persisted documents.
    Persistence,
    /// Caller is not the owner.
    AccessDenied,
    /// Operation not permitted in the current state.
    InvalidOperation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Schema => "schema",
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::AlreadyExists => "already_exists",
            Self::Persistence => "persistence",
            Self::AccessDenied => "access_denied",
            Self::InvalidOperation => "invalid_operation",
        };
        f.write_str(name)
    }
}

/// A row rejected by schema validation.
///
/// Validation stops at the first violation, in column declaration order.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Wrong number of values for the table's columns.
    #[error("expected {expected} values, got {actual}")]
    ArityMismatch {
        /// Column count.
        expected: usize,
        /// Supplied value count.
        actual: usize,
    },

    /// A value cannot be coerced to the column's datatype.
    #[error("invalid value {value} for column {column}: expected {expected}")]
    TypeMismatch {
        /// Column name.
        column: String,
        /// Declared datatype.
        expected: DataType,
        /// The rejected input.
        value: Value,
    },

    /// Missing or empty value in a `NOT NULL` column.
    #[error("column {column} doesn't allow null values")]
    NullViolation {
        /// Column name.
        column: String,
    },

    /// Value already held by another live row in a `UNIQUE` column.
    #[error("column {column} only allows unique values, {value} already exists")]
    UniqueViolation {
        /// Column name.
        column: String,
        /// The duplicated value.
        value: Value,
    },
}

/// Errors that can occur in Tabula core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed schema definition.
    #[error("schema error: {message}")]
    Schema {
        /// Description of the problem.
        message: String,
    },

    /// Row validation failed.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Database not found.
    #[error("database {name} doesn't exist")]
    DatabaseNotFound {
        /// Database name.
        name: String,
    },

    /// Table not found.
    #[error("table {name} doesn't exist")]
    TableNotFound {
        /// Table name.
        name: String,
    },

    /// No live record holds the primary key.
    #[error("record with primary key {key} not found in table {table}")]
    RecordNotFound {
        /// Table name.
        table: String,
        /// The primary key searched.
        key: Value,
    },

    /// No stored row carries the record ID.
    #[error("record {id} not found")]
    MissingRecord {
        /// The record ID searched.
        id: RecordId,
    },

    /// Primary key already held by another live record.
    #[error("primary key {key} already exists in table {table}")]
    DuplicateKey {
        /// Table name.
        table: String,
        /// The duplicated key.
        key: Value,
    },

    /// Table name already taken.
    #[error("table {name} already exists")]
    TableExists {
        /// Table name.
        name: String,
    },

    /// Database name already taken.
    #[error("database {name} already exists")]
    DatabaseExists {
        /// Database name.
        name: String,
    },

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] tabula_storage::StorageError),

    /// Document encoding or decoding error.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Persisted data is inconsistent.
    #[error("corrupt data: {message}")]
    Corrupt {
        /// Description of the inconsistency.
        message: String,
    },

    /// Credential could not be verified.
    #[error("authentication failed: {0}")]
    Unauthenticated(IdentityFailure),

    /// Principal is not allowed to mutate the database.
    #[error("access denied: {principal} is not the owner of database {database}")]
    AccessDenied {
        /// Caller identity.
        principal: String,
        /// Database name.
        database: String,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates a schema error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Creates a corrupt data error.
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates a table not found error.
    pub fn table_not_found(name: impl Into<String>) -> Self {
        Self::TableNotFound { name: name.into() }
    }

    /// Returns the error's classification.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Schema { .. } => ErrorKind::Schema,
            Self::Validation(_) => ErrorKind::Validation,
            Self::DatabaseNotFound { .. }
            | Self::TableNotFound { .. }
            | Self::RecordNotFound { .. }
            | Self::MissingRecord { .. } => ErrorKind::NotFound,
            Self::DuplicateKey { .. } => ErrorKind::Conflict,
            Self::TableExists { .. } | Self::DatabaseExists { .. } => ErrorKind::AlreadyExists,
            Self::Storage(_) | Self::Codec(_) | Self::Corrupt { .. } => ErrorKind::Persistence,
            Self::Unauthenticated(_) | Self::AccessDenied { .. } => ErrorKind::AccessDenied,
            Self::InvalidOperation { .. } => ErrorKind::InvalidOperation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(CoreError::schema("x").kind(), ErrorKind::Schema);
        assert_eq!(CoreError::table_not_found("t").kind(), ErrorKind::NotFound);
        assert_eq!(
            CoreError::DuplicateKey {
                table: "t".into(),
                key: Value::Integer(1),
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(CoreError::corrupt("bad").kind(), ErrorKind::Persistence);
        assert_eq!(
            CoreError::Unauthenticated(IdentityFailure::Expired).kind(),
            ErrorKind::AccessDenied
        );
        assert_eq!(
            CoreError::from(ValidationError::ArityMismatch {
                expected: 2,
                actual: 1
            })
            .kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn validation_display() {
        let err = ValidationError::TypeMismatch {
            column: "age".into(),
            expected: DataType::Integer,
            value: Value::Text("old".into()),
        };
        assert_eq!(
            err.to_string(),
            "invalid value \"old\" for column age: expected integer"
        );
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::AccessDenied).unwrap();
        assert_eq!(json, "\"access_denied\"");
        assert_eq!(ErrorKind::NotFound.to_string(), "not_found");
    }
}
