//! Canonical column types, storage mapping and typed scalar values

use std::fmt;

use chrono::NaiveDateTime;
use duckdb::ToSql;
use duckdb::types::{ToSqlOutput, Value};
use serde::{Deserialize, Serialize};

/// Canonical type of a column, independent of the storage engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalType {
    Float,
    Integer,
    String,
    Datetime,
}

impl CanonicalType {
    /// Map to the storage type. `width` only matters for strings.
    pub fn storage_type(self, width: usize) -> StorageType {
        match self {
            CanonicalType::Float => StorageType::Double,
            CanonicalType::Integer => StorageType::BigInt,
            CanonicalType::String => StorageType::Varchar(width.max(1)),
            CanonicalType::Datetime => StorageType::Timestamp,
        }
    }

    pub fn type_name(self) -> &'static str {
        match self {
            CanonicalType::Float => "float",
            CanonicalType::Integer => "integer",
            CanonicalType::String => "string",
            CanonicalType::Datetime => "datetime",
        }
    }
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Column type as declared in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    Double,
    BigInt,
    Varchar(usize),
    Timestamp,
}

impl StorageType {
    /// Render the DuckDB type name
    pub fn sql(&self) -> String {
        match self {
            StorageType::Double => "DOUBLE".to_string(),
            StorageType::BigInt => "BIGINT".to_string(),
            StorageType::Varchar(width) => format!("VARCHAR({width})"),
            StorageType::Timestamp => "TIMESTAMP".to_string(),
        }
    }
}

/// Observed kind of a single raw value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Integer,
    Fractional,
    Text,
}

impl ValueKind {
    /// Classify a raw value. Returns `None` for JSON null.
    ///
    /// Numbers keep their native kind; strings are classified by their
    /// lexical form.
    pub fn of(value: &serde_json::Value) -> Option<ValueKind> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::Number(n) => {
                if n.is_i64() || n.is_u64() {
                    Some(ValueKind::Integer)
                } else {
                    Some(ValueKind::Fractional)
                }
            }
            serde_json::Value::String(s) => Some(ValueKind::of_token(s)),
            _ => Some(ValueKind::Text),
        }
    }

    /// Classify a string token lexically
    pub fn of_token(token: &str) -> ValueKind {
        let token = token.trim();
        if token.parse::<i64>().is_ok() {
            return ValueKind::Integer;
        }
        // Rust also parses "inf" and "NaN"; those are text here
        let numeric_chars = token
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));
        if numeric_chars
            && token.chars().any(|c| c.is_ascii_digit())
            && token.parse::<f64>().is_ok()
        {
            return ValueKind::Fractional;
        }
        ValueKind::Text
    }
}

/// A typed value in a canonical row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Float(f64),
    Integer(i64),
    Text(String),
    Datetime(NaiveDateTime),
}

impl ScalarValue {
    pub fn canonical_type(&self) -> CanonicalType {
        match self {
            ScalarValue::Float(_) => CanonicalType::Float,
            ScalarValue::Integer(_) => CanonicalType::Integer,
            ScalarValue::Text(_) => CanonicalType::String,
            ScalarValue::Datetime(_) => CanonicalType::Datetime,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ScalarValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Float(v) => Some(*v),
            ScalarValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Float(v) => write!(f, "{v}"),
            ScalarValue::Integer(v) => write!(f, "{v}"),
            ScalarValue::Text(v) => f.write_str(v),
            ScalarValue::Datetime(v) => write!(f, "{}", v.format(DATETIME_SQL_FORMAT)),
        }
    }
}

/// Format used when handing datetimes to the store
pub const DATETIME_SQL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl ToSql for ScalarValue {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        let value = match self {
            ScalarValue::Float(v) => Value::Double(*v),
            ScalarValue::Integer(v) => Value::BigInt(*v),
            ScalarValue::Text(v) => Value::Text(v.clone()),
            // Bound as text; insert statements cast it to TIMESTAMP
            ScalarValue::Datetime(v) => Value::Text(v.format(DATETIME_SQL_FORMAT).to_string()),
        };
        Ok(ToSqlOutput::Owned(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_storage_mapping() {
        assert_eq!(CanonicalType::Float.storage_type(0).sql(), "DOUBLE");
        assert_eq!(CanonicalType::Integer.storage_type(0).sql(), "BIGINT");
        assert_eq!(CanonicalType::String.storage_type(12).sql(), "VARCHAR(12)");
        assert_eq!(CanonicalType::String.storage_type(0).sql(), "VARCHAR(1)");
        assert_eq!(CanonicalType::Datetime.storage_type(0).sql(), "TIMESTAMP");
    }

    #[test]
    fn test_value_kind_of_json() {
        assert_eq!(ValueKind::of(&json!(3)), Some(ValueKind::Integer));
        assert_eq!(ValueKind::of(&json!(3.5)), Some(ValueKind::Fractional));
        assert_eq!(ValueKind::of(&json!("abc")), Some(ValueKind::Text));
        assert_eq!(ValueKind::of(&json!(true)), Some(ValueKind::Text));
        assert_eq!(ValueKind::of(&json!(null)), None);
    }

    #[test]
    fn test_value_kind_of_token() {
        assert_eq!(ValueKind::of_token("42"), ValueKind::Integer);
        assert_eq!(ValueKind::of_token("-7"), ValueKind::Integer);
        assert_eq!(ValueKind::of_token("4.25"), ValueKind::Fractional);
        assert_eq!(ValueKind::of_token("1e-3"), ValueKind::Fractional);
        assert_eq!(ValueKind::of_token("inf"), ValueKind::Text);
        assert_eq!(ValueKind::of_token("NaN"), ValueKind::Text);
        assert_eq!(ValueKind::of_token("GL-001"), ValueKind::Text);
        assert_eq!(ValueKind::of_token("1-2"), ValueKind::Text);
    }

    #[test]
    fn test_scalar_display() {
        let dt = chrono::NaiveDate::from_ymd_opt(2023, 4, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(ScalarValue::Datetime(dt).to_string(), "2023-04-15 00:00:00");
        assert_eq!(ScalarValue::Integer(7).to_string(), "7");
    }
}
