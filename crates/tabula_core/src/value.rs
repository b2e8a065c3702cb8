//! Column datatypes and cell values.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Declared datatype of a column.
///
/// The set is closed; every conversion into a datatype goes through
/// [`DataType::coerce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// 64-bit signed integer.
    Integer,
    /// 64-bit float.
    Float,
    /// UTF-8 text.
    Text,
}

impl DataType {
    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Text => "text",
        }
    }

    /// Converts a raw input value into this datatype.
    ///
    /// Returns `None` when no conversion exists. Null passes through
    /// unchanged, and blank text counts as null for numeric types;
    /// nullability is checked separately by the schema.
    #[must_use]
    pub fn coerce(self, raw: &Value) -> Option<Value> {
        match (self, raw) {
            (_, Value::Null) => Some(Value::Null),

            (Self::Integer, Value::Integer(i)) => Some(Value::Integer(*i)),
            (Self::Integer, Value::Float(f)) => float_to_integer(*f).map(Value::Integer),
            (Self::Integer, Value::Text(s)) => {
                let s = s.trim();
                if s.is_empty() {
                    Some(Value::Null)
                } else {
                    s.parse::<i64>().ok().map(Value::Integer)
                }
            }

            (Self::Float, Value::Float(f)) => {
                Some(*f).filter(|f| f.is_finite()).map(Value::Float)
            }
            #[allow(clippy::cast_precision_loss)]
            (Self::Float, Value::Integer(i)) => Some(Value::Float(*i as f64)),
            (Self::Float, Value::Text(s)) => {
                let s = s.trim();
                if s.is_empty() {
                    Some(Value::Null)
                } else {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(Value::Float)
                }
            }

            (Self::Text, Value::Text(s)) => Some(Value::Text(s.clone())),
            (Self::Text, Value::Integer(i)) => Some(Value::Text(i.to_string())),
            (Self::Text, Value::Float(f)) => Some(Value::Text(f.to_string())),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn float_to_integer(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is itself out of range.
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" => Ok(Self::Integer),
            "float" | "real" | "double" => Ok(Self::Float),
            "str" | "string" | "text" => Ok(Self::Text),
            other => Err(CoreError::schema(format!(
                "unsupported datatype {other:?}, expected one of integer, float, text"
            ))),
        }
    }
}

/// A single cell value.
///
/// Serialized untagged, so a persisted row is a plain JSON array such as
/// `[1, "Alice", 3.5, null]`.
///
/// Equality and hashing treat floats by canonical bit pattern (`-0.0`
/// equals `0.0`, all NaNs are equal) so values can key a hash index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent value.
    Null,
    /// Integer value.
    Integer(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
}

impl Value {
    /// Returns true for null and for blank text.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Integer(_) | Self::Float(_) => false,
        }
    }

}

fn canonical_bits(f: f64) -> u64 {
    if f == 0.0 {
        0.0f64.to_bits()
    } else if f.is_nan() {
        f64::NAN.to_bits()
    } else {
        f.to_bits()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => canonical_bits(*a) == canonical_bits(*b),
            (Self::Text(a), Self::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Integer(i) => i.hash(state),
            Self::Float(f) => canonical_bits(*f).hash(state),
            Self::Text(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn parse_datatype_aliases() {
        assert_eq!("int".parse::<DataType>().unwrap(), DataType::Integer);
        assert_eq!("INTEGER".parse::<DataType>().unwrap(), DataType::Integer);
        assert_eq!("str".parse::<DataType>().unwrap(), DataType::Text);
        assert_eq!(" Real ".parse::<DataType>().unwrap(), DataType::Float);
        assert!("blob".parse::<DataType>().is_err());
    }

    #[test]
    fn integer_coercion() {
        let t = DataType::Integer;
        assert_eq!(t.coerce(&Value::Integer(5)), Some(Value::Integer(5)));
        assert_eq!(t.coerce(&"42".into()), Some(Value::Integer(42)));
        assert_eq!(t.coerce(&Value::Float(3.0)), Some(Value::Integer(3)));
        assert_eq!(t.coerce(&Value::Float(3.5)), None);
        assert_eq!(t.coerce(&"abc".into()), None);
        assert_eq!(t.coerce(&"  ".into()), Some(Value::Null));
        assert_eq!(t.coerce(&Value::Float(f64::INFINITY)), None);
    }

    #[test]
    fn float_coercion() {
        let t = DataType::Float;
        assert_eq!(t.coerce(&Value::Integer(2)), Some(Value::Float(2.0)));
        assert_eq!(t.coerce(&"2.5".into()), Some(Value::Float(2.5)));
        assert_eq!(t.coerce(&"NaN".into()), None);
        assert_eq!(t.coerce(&"x".into()), None);
    }

    #[test]
    fn non_finite_floats_rejected() {
        let t = DataType::Float;
        assert_eq!(t.coerce(&Value::Float(f64::INFINITY)), None);
        assert_eq!(t.coerce(&Value::Float(f64::NEG_INFINITY)), None);
        assert_eq!(t.coerce(&Value::Float(f64::NAN)), None);
        assert_eq!(t.coerce(&Value::Float(-1.5)), Some(Value::Float(-1.5)));
    }

    #[test]
    fn text_coercion() {
        let t = DataType::Text;
        assert_eq!(t.coerce(&Value::Integer(7)), Some(Value::Text("7".into())));
        assert_eq!(t.coerce(&"".into()), Some(Value::Text(String::new())));
        assert_eq!(t.coerce(&Value::Null), Some(Value::Null));
    }

    #[test]
    fn float_keys_hash_consistently() {
        let mut set = HashSet::new();
        set.insert(Value::Float(0.0));
        assert!(set.contains(&Value::Float(-0.0)));
        assert_ne!(Value::Integer(1), Value::Float(1.0));
    }

    #[test]
    fn untagged_json_shape() {
        let row = vec![
            Value::Integer(1),
            Value::Text("Alice".into()),
            Value::Float(2.5),
            Value::Null,
        ];
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"[1,"Alice",2.5,null]"#);

        let back: Vec<Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn missing_values() {
        assert!(Value::Null.is_missing());
        assert!(Value::from(" ").is_missing());
        assert!(!Value::Integer(0).is_missing());
    }
}
