//! Stock single-column codecs. Each stores its value in one `value` column.

use crate::codec::ValueCodec;
use crate::core::{AttrError, Result, SqlValue, Value};
use chrono::DateTime;

const SINGLE_COLUMN: &[&str] = &["value"];

fn first_column<'a>(codec: &dyn ValueCodec, columns: &'a [SqlValue]) -> Result<&'a SqlValue> {
    columns
        .first()
        .ok_or_else(|| AttrError::unexpected_value(codec.logical_name(), "missing column"))
}

/// `i64` values in an INTEGER column.
pub struct LongCodec;

impl ValueCodec for LongCodec {
    fn logical_name(&self) -> &str {
        "Long"
    }

    fn column_names(&self) -> &[&str] {
        SINGLE_COLUMN
    }

    fn bind(&self, value: &Value) -> Result<Vec<SqlValue>> {
        match value {
            Value::Long(v) => Ok(vec![SqlValue::Integer(*v)]),
            other => Err(AttrError::unexpected_value("Long", other.type_name())),
        }
    }

    fn decode(&self, columns: &[SqlValue]) -> Result<Value> {
        let column = first_column(self, columns)?;
        column
            .as_i64()
            .map(Value::Long)
            .ok_or_else(|| AttrError::unexpected_value("Long", column.type_name()))
    }
}

/// String values in a TEXT column. Logical name `String` for table naming.
pub struct TextCodec;

impl ValueCodec for TextCodec {
    fn logical_name(&self) -> &str {
        "String"
    }

    fn column_names(&self) -> &[&str] {
        SINGLE_COLUMN
    }

    fn bind(&self, value: &Value) -> Result<Vec<SqlValue>> {
        match value {
            Value::Text(v) => Ok(vec![SqlValue::Text(v.clone())]),
            other => Err(AttrError::unexpected_value("String", other.type_name())),
        }
    }

    fn decode(&self, columns: &[SqlValue]) -> Result<Value> {
        let column = first_column(self, columns)?;
        column
            .as_str()
            .map(|s| Value::Text(s.to_string()))
            .ok_or_else(|| AttrError::unexpected_value("String", column.type_name()))
    }
}

/// Timestamps stored as seconds since epoch. Sub-second precision is
/// truncated on write.
pub struct InstantSecondsCodec;

impl ValueCodec for InstantSecondsCodec {
    fn logical_name(&self) -> &str {
        "Instant"
    }

    fn column_names(&self) -> &[&str] {
        SINGLE_COLUMN
    }

    fn bind(&self, value: &Value) -> Result<Vec<SqlValue>> {
        match value {
            Value::Instant(v) => Ok(vec![SqlValue::Integer(v.timestamp())]),
            other => Err(AttrError::unexpected_value("Instant", other.type_name())),
        }
    }

    fn decode(&self, columns: &[SqlValue]) -> Result<Value> {
        let column = first_column(self, columns)?;
        let seconds = column
            .as_i64()
            .ok_or_else(|| AttrError::unexpected_value("Instant", column.type_name()))?;
        DateTime::from_timestamp(seconds, 0)
            .map(Value::Instant)
            .ok_or_else(|| AttrError::unexpected_value("Instant", "timestamp out of range"))
    }
}

/// Timestamps stored as milliseconds since epoch.
pub struct InstantMillisCodec;

impl ValueCodec for InstantMillisCodec {
    fn logical_name(&self) -> &str {
        "InstantMillis"
    }

    fn column_names(&self) -> &[&str] {
        SINGLE_COLUMN
    }

    fn bind(&self, value: &Value) -> Result<Vec<SqlValue>> {
        match value {
            Value::Instant(v) => Ok(vec![SqlValue::Integer(v.timestamp_millis())]),
            other => Err(AttrError::unexpected_value("InstantMillis", other.type_name())),
        }
    }

    fn decode(&self, columns: &[SqlValue]) -> Result<Value> {
        let column = first_column(self, columns)?;
        let millis = column
            .as_i64()
            .ok_or_else(|| AttrError::unexpected_value("InstantMillis", column.type_name()))?;
        DateTime::from_timestamp_millis(millis)
            .map(Value::Instant)
            .ok_or_else(|| AttrError::unexpected_value("InstantMillis", "timestamp out of range"))
    }
}

/// JSON documents serialized into a TEXT column.
pub struct JsonCodec;

impl ValueCodec for JsonCodec {
    fn logical_name(&self) -> &str {
        "Json"
    }

    fn column_names(&self) -> &[&str] {
        SINGLE_COLUMN
    }

    fn bind(&self, value: &Value) -> Result<Vec<SqlValue>> {
        match value {
            Value::Json(v) => {
                let text = serde_json::to_string(v)
                    .map_err(|_| AttrError::unexpected_value("Json", "unserializable document"))?;
                Ok(vec![SqlValue::Text(text)])
            }
            other => Err(AttrError::unexpected_value("Json", other.type_name())),
        }
    }

    fn decode(&self, columns: &[SqlValue]) -> Result<Value> {
        let column = first_column(self, columns)?;
        let text = column
            .as_str()
            .ok_or_else(|| AttrError::unexpected_value("Json", column.type_name()))?;
        serde_json::from_str(text)
            .map(Value::Json)
            .map_err(|_| AttrError::unexpected_value("Json", "malformed document"))
    }
}
