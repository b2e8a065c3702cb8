//! Table schema and row validation.
//!
//! A schema is the ordered list of a table's columns. Column 0 is always
//! the primary key; no separate declaration exists.

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::record::{RecordStore, Row};
use crate::types::RecordId;
use crate::value::{DataType, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

/// A per-column rule enforced at insert and update time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Constraint {
    /// Rejects null and empty values.
    #[serde(rename = "NOT NULL")]
    NotNull,
    /// Rejects values held by another live row.
    #[serde(rename = "UNIQUE")]
    Unique,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotNull => f.write_str("NOT NULL"),
            Self::Unique => f.write_str("UNIQUE"),
        }
    }
}

impl FromStr for Constraint {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_')
            .collect::<String>()
            .to_ascii_uppercase();
        match normalized.as_str() {
            "NOTNULL" => Ok(Self::NotNull),
            "UNIQUE" => Ok(Self::Unique),
            _ => Err(CoreError::schema(format!("unsupported constraint {s:?}"))),
        }
    }
}

/// Constraints keyed by column name, as supplied by callers.
pub type ConstraintMap = BTreeMap<String, Vec<Constraint>>;

/// One column of a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    data_type: DataType,
    constraints: BTreeSet<Constraint>,
}

impl Column {
    /// Returns the column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared datatype.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Returns the constraint set.
    #[must_use]
    pub fn constraints(&self) -> &BTreeSet<Constraint> {
        &self.constraints
    }

    /// Checks whether the column carries a constraint.
    #[must_use]
    pub fn has(&self, constraint: Constraint) -> bool {
        self.constraints.contains(&constraint)
    }
}

/// Checks that a database, table or column name is usable.
///
/// Names are non-empty ASCII alphanumerics, `_` and `-`; table names end
/// up as file names on disk.
pub(crate) fn validate_name(kind: &str, name: &str) -> CoreResult<()> {
    if !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
    {
        Ok(())
    } else {
        Err(CoreError::schema(format!("invalid {kind} name {name:?}")))
    }
}

/// The ordered column definitions of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Defines a schema from parallel name and datatype lists.
    ///
    /// # Errors
    ///
    /// Returns a schema error if the lists differ in length, the list is
    /// empty, a name is invalid or repeated, or a constraint names an
    /// unknown column.
    pub fn define<S: AsRef<str>>(
        names: &[S],
        datatypes: &[DataType],
        constraints: &ConstraintMap,
    ) -> CoreResult<Self> {
        if names.len() != datatypes.len() {
            return Err(CoreError::schema(format!(
                "{} columns but {} datatypes",
                names.len(),
                datatypes.len()
            )));
        }
        if names.is_empty() {
            return Err(CoreError::schema("a table needs at least one column"));
        }

        let mut seen = HashSet::new();
        for name in names {
            let name = name.as_ref();
            validate_name("column", name)?;
            if !seen.insert(name) {
                return Err(CoreError::schema(format!("duplicate column {name:?}")));
            }
        }

        if let Some(unknown) = constraints.keys().find(|c| !seen.contains(c.as_str())) {
            return Err(CoreError::schema(format!(
                "constraint on unknown column {unknown:?}"
            )));
        }

        let columns = names
            .iter()
            .zip(datatypes)
            .map(|(name, &data_type)| {
                let name = name.as_ref().to_string();
                let constraints = constraints
                    .get(&name)
                    .map(|list| list.iter().copied().collect())
                    .unwrap_or_default();
                Column {
                    name,
                    data_type,
                    constraints,
                }
            })
            .collect();

        Ok(Self { columns })
    }

    /// Defines a schema from textual datatypes and constraint flags.
    ///
    /// Accepts the spellings adapters receive from users, such as `int`,
    /// `str` and `NOT NULL`.
    ///
    /// # Errors
    ///
    /// Returns a schema error for unknown datatypes or flags, and
    /// otherwise behaves like [`Schema::define`].
    pub fn parse<S: AsRef<str>, D: AsRef<str>>(
        names: &[S],
        datatypes: &[D],
        constraints: &BTreeMap<String, Vec<String>>,
    ) -> CoreResult<Self> {
        if names.len() != datatypes.len() {
            return Err(CoreError::schema(format!(
                "{} columns but {} datatypes",
                names.len(),
                datatypes.len()
            )));
        }

        let datatypes = datatypes
            .iter()
            .map(|d| d.as_ref().parse())
            .collect::<CoreResult<Vec<DataType>>>()?;

        let mut parsed = ConstraintMap::new();
        for (column, flags) in constraints {
            let flags = flags
                .iter()
                .map(|f| f.parse())
                .collect::<CoreResult<Vec<Constraint>>>()?;
            parsed.insert(column.clone(), flags);
        }

        Self::define(names, &datatypes, &parsed)
    }

    /// Returns the columns in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Always false; a schema has at least one column.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns the primary key column.
    #[must_use]
    pub fn primary_key(&self) -> &Column {
        &self.columns[0]
    }

    /// Returns the column names in order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Returns the datatypes in order.
    #[must_use]
    pub fn datatypes(&self) -> Vec<DataType> {
        self.columns.iter().map(|c| c.data_type).collect()
    }

    /// Returns the constraints of every constrained column.
    #[must_use]
    pub fn constraint_map(&self) -> ConstraintMap {
        self.columns
            .iter()
            .filter(|c| !c.constraints.is_empty())
            .map(|c| (c.name.clone(), c.constraints.iter().copied().collect()))
            .collect()
    }

    /// Coerces a caller-supplied primary key to the key column's type.
    ///
    /// Returns `None` if the key cannot be coerced or is missing; such a
    /// key cannot address any live record.
    #[must_use]
    pub fn coerce_key(&self, raw: &Value) -> Option<Value> {
        self.primary_key()
            .data_type
            .coerce(raw)
            .filter(|key| !key.is_missing())
    }

    /// Validates a raw row and returns it coerced to the column types.
    ///
    /// Checks arity first, then each column in declaration order: type
    /// coercion, nullability, then uniqueness against every live row
    /// except `exclude`. The first violation is returned.
    ///
    /// The primary key column rejects missing values. Its uniqueness is
    /// owned by the primary-key index and is not scanned here.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate_row(
        &self,
        raw: &[Value],
        store: &RecordStore,
        exclude: Option<RecordId>,
    ) -> Result<Row, ValidationError> {
        if raw.len() != self.columns.len() {
            return Err(ValidationError::ArityMismatch {
                expected: self.columns.len(),
                actual: raw.len(),
            });
        }

        let mut row = Vec::with_capacity(raw.len());
        for (position, (column, input)) in self.columns.iter().zip(raw).enumerate() {
            let value =
                column
                    .data_type
                    .coerce(input)
                    .ok_or_else(|| ValidationError::TypeMismatch {
                        column: column.name.clone(),
                        expected: column.data_type,
                        value: input.clone(),
                    })?;

            let missing = value.is_missing();
            if missing && (position == 0 || column.has(Constraint::NotNull)) {
                return Err(ValidationError::NullViolation {
                    column: column.name.clone(),
                });
            }

            if position > 0
                && !missing
                && column.has(Constraint::Unique)
                && store.holds_value(position, &value, exclude)
            {
                return Err(ValidationError::UniqueViolation {
                    column: column.name.clone(),
                    value,
                });
            }

            row.push(value);
        }

        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Schema {
        let mut constraints = ConstraintMap::new();
        constraints.insert("id".into(), vec![Constraint::Unique, Constraint::NotNull]);
        constraints.insert("email".into(), vec![Constraint::Unique]);
        constraints.insert("name".into(), vec![Constraint::NotNull]);
        Schema::define(
            &["id", "name", "email"],
            &[DataType::Integer, DataType::Text, DataType::Text],
            &constraints,
        )
        .unwrap()
    }

    #[test]
    fn define_rejects_length_mismatch() {
        let err = Schema::define(&["id", "name"], &[DataType::Integer], &ConstraintMap::new())
            .unwrap_err();
        assert!(matches!(err, CoreError::Schema { .. }));
    }

    #[test]
    fn define_rejects_duplicate_names() {
        let err = Schema::define(
            &["id", "id"],
            &[DataType::Integer, DataType::Text],
            &ConstraintMap::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate column"));
    }

    #[test]
    fn define_rejects_empty_and_unknown_constraint_column() {
        let none: [&str; 0] = [];
        assert!(Schema::define(&none, &[], &ConstraintMap::new()).is_err());

        let mut constraints = ConstraintMap::new();
        constraints.insert("ghost".into(), vec![Constraint::Unique]);
        assert!(Schema::define(&["id"], &[DataType::Integer], &constraints).is_err());
    }

    #[test]
    fn parse_textual_definition() {
        let mut constraints = BTreeMap::new();
        constraints.insert(
            "id".to_string(),
            vec!["UNIQUE".to_string(), "NOT NULL".to_string()],
        );
        let schema = Schema::parse(&["id", "name"], &["int", "str"], &constraints).unwrap();

        assert_eq!(schema.primary_key().name(), "id");
        assert_eq!(schema.datatypes(), vec![DataType::Integer, DataType::Text]);
        assert!(schema.primary_key().has(Constraint::NotNull));
        assert!(schema.columns()[1].constraints().is_empty());
    }

    #[test]
    fn parse_rejects_unknown_datatype() {
        let err = Schema::parse(&["id"], &["uuid"], &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, CoreError::Schema { .. }));
    }

    #[test]
    fn constraint_spellings() {
        assert_eq!("not null".parse::<Constraint>().unwrap(), Constraint::NotNull);
        assert_eq!("NOT_NULL".parse::<Constraint>().unwrap(), Constraint::NotNull);
        assert_eq!("unique".parse::<Constraint>().unwrap(), Constraint::Unique);
        assert!("CHECK".parse::<Constraint>().is_err());
    }

    #[test]
    fn validate_arity_first() {
        let schema = users();
        let err = schema
            .validate_row(&[Value::Integer(1)], &RecordStore::new(), None)
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::ArityMismatch {
                expected: 3,
                actual: 1
            }
        );
    }

    #[test]
    fn validate_coerces_values() {
        let schema = users();
        let row = schema
            .validate_row(
                &["7".into(), "Alice".into(), Value::Null],
                &RecordStore::new(),
                None,
            )
            .unwrap();
        assert_eq!(row, vec![Value::Integer(7), "Alice".into(), Value::Null]);
    }

    #[test]
    fn validate_reports_first_violation_in_column_order() {
        let schema = users();
        // Both name (null) and id (type) are wrong; id comes first.
        let err = schema
            .validate_row(&["x".into(), Value::Null, Value::Null], &RecordStore::new(), None)
            .unwrap_err();
        assert!(matches!(err, ValidationError::TypeMismatch { ref column, .. } if column == "id"));
    }

    #[test]
    fn validate_not_null_rejects_empty_text() {
        let schema = users();
        let err = schema
            .validate_row(&[Value::Integer(1), "".into(), Value::Null], &RecordStore::new(), None)
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::NullViolation {
                column: "name".into()
            }
        );
    }

    #[test]
    fn primary_key_is_implicitly_not_null() {
        let schema =
            Schema::define(&["k"], &[DataType::Text], &ConstraintMap::new()).unwrap();
        let err = schema
            .validate_row(&[Value::Null], &RecordStore::new(), None)
            .unwrap_err();
        assert!(matches!(err, ValidationError::NullViolation { .. }));
    }

    #[test]
    fn validate_unique_excludes_self() {
        let schema = users();
        let mut store = RecordStore::new();
        let id = store.insert(vec![Value::Integer(1), "Alice".into(), "a@x.io".into()]);

        let err = schema
            .validate_row(&[Value::Integer(2), "Bob".into(), "a@x.io".into()], &store, None)
            .unwrap_err();
        assert!(matches!(err, ValidationError::UniqueViolation { .. }));

        assert!(schema
            .validate_row(&[Value::Integer(1), "Alicia".into(), "a@x.io".into()], &store, Some(id))
            .is_ok());
    }

    #[test]
    fn unique_ignores_nulls() {
        let schema = users();
        let mut store = RecordStore::new();
        store.insert(vec![Value::Integer(1), "Alice".into(), Value::Null]);
        assert!(schema
            .validate_row(&[Value::Integer(2), "Bob".into(), Value::Null], &store, None)
            .is_ok());
    }

    #[test]
    fn coerce_key_uses_primary_key_type() {
        let schema = users();
        assert_eq!(schema.coerce_key(&"12".into()), Some(Value::Integer(12)));
        assert_eq!(schema.coerce_key(&"abc".into()), None);
        assert_eq!(schema.coerce_key(&Value::Null), None);
    }

    #[test]
    fn constraint_map_round_trips_through_define() {
        let schema = users();
        let rebuilt = Schema::define(
            &schema.column_names(),
            &schema.datatypes(),
            &schema.constraint_map(),
        )
        .unwrap();
        assert_eq!(rebuilt, schema);
    }
}
