//! SQL type hints.

use crate::Result;
use crate::error::{Error, TypeError};
use crate::value::Value;

/// SQL data types a property or statement parameter can be declared as.
///
/// A NULL carries no type of its own, so statements that bind NULLs take an
/// explicit hint; the driver uses it to pick the bind call and to coerce
/// non-null values into the declared storage class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Boolean,
    Integer,
    BigInt,
    Double,
    Text,
    Blob,
    Json,
}

impl SqlType {
    /// Get the SQL type name for this type.
    pub const fn sql_name(self) -> &'static str {
        match self {
            SqlType::Boolean => "BOOLEAN",
            SqlType::Integer => "INTEGER",
            SqlType::BigInt => "BIGINT",
            SqlType::Double => "DOUBLE",
            SqlType::Text => "TEXT",
            SqlType::Blob => "BLOB",
            SqlType::Json => "JSON",
        }
    }

    /// Check if this type is numeric.
    pub const fn is_numeric(self) -> bool {
        matches!(self, SqlType::Integer | SqlType::BigInt | SqlType::Double)
    }

    /// Convert `value` into the representation this type binds as.
    ///
    /// NULL passes through unchanged.
    pub fn coerce(self, value: Value) -> Result<Value> {
        let coerced = match (self, value) {
            (_, Value::Null) => Some(Value::Null),
            (SqlType::Boolean, v) => v.as_bool().map(Value::Bool),
            (SqlType::Integer, Value::Int(v)) => Some(Value::Int(v)),
            (SqlType::Integer, v) => v
                .as_i64()
                .and_then(|i| i32::try_from(i).ok())
                .map(Value::Int),
            (SqlType::BigInt, v) => v.as_i64().map(Value::BigInt),
            (SqlType::Double, v) => v.as_f64().map(Value::Double),
            (SqlType::Text, Value::Text(s)) => Some(Value::Text(s)),
            (SqlType::Text, Value::Json(j)) => Some(Value::Text(j.to_string())),
            (SqlType::Text, Value::Int(i)) => Some(Value::Text(i.to_string())),
            (SqlType::Text, Value::BigInt(i)) => Some(Value::Text(i.to_string())),
            (SqlType::Text, Value::Double(d)) => Some(Value::Text(d.to_string())),
            (SqlType::Text, _) => None,
            (SqlType::Blob, Value::Bytes(b)) => Some(Value::Bytes(b)),
            (SqlType::Blob, Value::Text(s)) => Some(Value::Bytes(s.into_bytes())),
            (SqlType::Blob, _) => None,
            (SqlType::Json, Value::Json(j)) => Some(Value::Json(j)),
            (SqlType::Json, Value::Text(s)) => {
                return serde_json::from_str(&s).map(Value::Json).map_err(|e| {
                    Error::Type(TypeError {
                        expected: "JSON",
                        actual: format!("invalid JSON text: {}", e),
                        column: None,
                    })
                });
            }
            (SqlType::Json, _) => None,
        };
        coerced.ok_or_else(|| {
            Error::Type(TypeError {
                expected: self.sql_name(),
                actual: "incompatible value".to_string(),
                column: None,
            })
        })
    }
}
