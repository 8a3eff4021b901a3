//! Logical types and dynamically-typed scalar values.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Logical column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Float64,
    Int32,
    Utf8,
    Boolean,
    /// Milliseconds since the Unix epoch, UTC.
    Date,
    /// Opaque values (lists, JSON documents, mixed types).
    Object,
}

impl DataType {
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Float64 => "float64",
            DataType::Int32 => "int32",
            DataType::Utf8 => "utf8",
            DataType::Boolean => "bool",
            DataType::Date => "date",
            DataType::Object => "object",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Float64 | DataType::Int32)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Float64(f64),
    Int32(i32),
    Utf8(String),
    Boolean(bool),
    Date(i64),
    List(Vec<Value>),
    Object(serde_json::Value),
}

impl Value {
    /// Logical type of this value; `None` for null.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Float64(_) => Some(DataType::Float64),
            Value::Int32(_) => Some(DataType::Int32),
            Value::Utf8(_) => Some(DataType::Utf8),
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Date(_) => Some(DataType::Date),
            Value::List(_) | Value::Object(_) => Some(DataType::Object),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(v) => Some(*v),
            Value::Int32(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Utf8(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn date_from_ymd(year: i32, month: u32, day: u32) -> Option<Value> {
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let ms = date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis();
        Some(Value::Date(ms))
    }

    /// Ordering between comparable values. Int32 and Float64 compare
    /// numerically; other cross-type pairs are unordered.
    pub fn partial_cmp_value(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int32(a), Value::Int32(b)) => Some(a.cmp(b)),
            (Value::Utf8(a), Value::Utf8(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Float64(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Int32(v) => serde_json::Value::from(*v),
            Value::Utf8(s) => serde_json::Value::String(s.clone()),
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Date(ms) => match DateTime::from_timestamp_millis(*ms) {
                Some(dt) => serde_json::Value::String(dt.to_rfc3339()),
                None => serde_json::Value::from(*ms),
            },
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(v) => v.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Utf8(s) => f.write_str(s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Date(ms) => match DateTime::from_timestamp_millis(*ms) {
                Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.3fZ")),
                None => write!(f, "{}", ms),
            },
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Object(v) => write!(f, "{}", v),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Utf8(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Utf8(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Object(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_data_type() {
        assert_eq!(Value::Int32(42).data_type(), Some(DataType::Int32));
        assert_eq!(Value::from("x").data_type(), Some(DataType::Utf8));
        assert_eq!(Value::Null.data_type(), None);
        assert_eq!(Value::List(vec![]).data_type(), Some(DataType::Object));
    }

    #[test]
    fn test_mixed_numeric_ordering() {
        assert_eq!(
            Value::Int32(2).partial_cmp_value(&Value::Float64(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(Value::from("a").partial_cmp_value(&Value::Int32(1)), None);
    }

    #[test]
    fn test_date_display() {
        let d = Value::date_from_ymd(2024, 3, 9).unwrap();
        assert_eq!(d.to_string(), "2024-03-09T00:00:00.000Z");
        assert_eq!(d.to_json(), serde_json::json!("2024-03-09T00:00:00+00:00"));
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some(1.5)), Value::Float64(1.5));
    }
}
