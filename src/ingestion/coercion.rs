//! Narrowing raw JSON records to a [`Schema`].
//!
//! Coercion never fails: each field is handled on its own, and anything that cannot be converted
//! becomes [`Value::Null`] without affecting the other fields of the row.

use serde_json::{Map, Value as JsonValue};

use crate::types::{Schema, TypedRow, Value};

/// How non-numeric, non-boolean JSON values are turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// Serialize every such value to JSON text.
    ///
    /// Strings keep their quotes (`"x"` is stored as `"\"x\""`) and JSON `null` is stored as the
    /// text `null`.
    #[default]
    Json,
    /// Store strings verbatim and JSON `null` as SQL NULL; objects and arrays are still
    /// serialized to JSON text.
    Native,
}

/// Options controlling record coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoercionOptions {
    pub text_encoding: TextEncoding,
}

/// Coerce one raw record into a row matching `schema`.
///
/// Fields missing from `record` become [`Value::Null`]; keys not in `schema` are dropped.
pub fn coerce_record(
    schema: &Schema,
    record: &Map<String, JsonValue>,
    options: &CoercionOptions,
) -> TypedRow {
    let mut row = TypedRow::with_capacity(schema.len());
    for field in &schema.fields {
        let value = match record.get(&field.name) {
            Some(raw) => coerce_value(raw, options.text_encoding).unwrap_or(Value::Null),
            None => Value::Null,
        };
        row.push(field.name.clone(), value);
    }
    row
}

/// Coerce a single JSON value. Numbers are not narrowed to the column's declared type.
pub fn coerce_value(raw: &JsonValue, encoding: TextEncoding) -> Result<Value, serde_json::Error> {
    let value = match raw {
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            // u64 beyond i64::MAX keeps its magnitude as a double.
            None => n.as_f64().map_or(Value::Null, Value::Real),
        },
        JsonValue::Bool(b) => Value::Integer(i64::from(*b)),
        JsonValue::String(s) if encoding == TextEncoding::Native => Value::Text(s.clone()),
        JsonValue::Null if encoding == TextEncoding::Native => Value::Null,
        other => Value::Text(serde_json::to_string(other)?),
    };
    Ok(value)
}
