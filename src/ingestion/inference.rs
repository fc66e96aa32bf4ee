//! Schema inference from a sample record.
//!
//! The default strategy, [`SampleBasedInference`], looks at the first record of one file and
//! nothing else. Keys that only appear in later records never become columns, and a later record
//! whose values have different types is coerced rather than used to widen the schema.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde_json::{Map, Value as JsonValue};

use crate::error::{IngestionError, IngestionResult};
use crate::types::{DataType, Field, Schema};

/// Strategy for deriving a table [`Schema`] from a sample file.
///
/// Implementations other than [`SampleBasedInference`] (e.g. a union over many records) can be
/// plugged into [`crate::pipeline::Pipeline::with_inferencer`] without touching the ingestion loop.
pub trait SchemaInferencer: Send + Sync {
    /// Infer the schema for `table` from the file at `path`.
    ///
    /// Any error is fatal for `table` only.
    fn infer_from_file(&self, table: &str, path: &Path) -> IngestionResult<Schema>;
}

/// Infers a schema from the first line of the sample file.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleBasedInference;

impl SchemaInferencer for SampleBasedInference {
    fn infer_from_file(&self, table: &str, path: &Path) -> IngestionResult<Schema> {
        let sample_err = |message: String| IngestionError::SampleParse {
            table: table.to_string(),
            path: path.to_path_buf(),
            message,
        };

        let file = File::open(path).map_err(|e| sample_err(e.to_string()))?;
        let mut reader = BufReader::new(file);
        let mut line = Vec::new();
        reader
            .read_until(b'\n', &mut line)
            .map_err(|e| sample_err(e.to_string()))?;

        let line = trim_line_ending(&line);
        if line.is_empty() {
            return Err(sample_err("sample file is empty".to_string()));
        }

        let record = parse_record(line).map_err(sample_err)?;
        Ok(infer_schema(&record))
    }
}

/// Build a schema from one decoded JSON object, keeping the object's key order.
pub fn infer_schema(sample: &Map<String, JsonValue>) -> Schema {
    Schema::new(
        sample
            .iter()
            .map(|(name, value)| Field::new(name.clone(), infer_data_type(value)))
            .collect(),
    )
}

/// Map a JSON value to the storage type of its column.
pub fn infer_data_type(value: &JsonValue) -> DataType {
    match value {
        JsonValue::Number(n) if n.is_i64() || n.is_u64() => DataType::Integer,
        JsonValue::Number(n) => match n.as_f64() {
            Some(f) if f.is_finite() && f.fract() == 0.0 => DataType::Integer,
            _ => DataType::Real,
        },
        JsonValue::Bool(_) => DataType::Integer,
        JsonValue::String(_) | JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => {
            DataType::Text
        }
    }
}

/// Decode one line into a JSON object.
fn parse_record(line: &[u8]) -> Result<Map<String, JsonValue>, String> {
    match serde_json::from_slice::<JsonValue>(line) {
        Ok(JsonValue::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a json object, found {}", json_kind(&other))),
        Err(e) => Err(e.to_string()),
    }
}

pub(crate) fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn json_kind(v: &JsonValue) -> &'static str {
    match v {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn whole_floats_are_integers() {
        assert_eq!(infer_data_type(&json!(3.0)), DataType::Integer);
        assert_eq!(infer_data_type(&json!(3.25)), DataType::Real);
        assert_eq!(infer_data_type(&json!(u64::MAX)), DataType::Integer);
    }

    #[test]
    fn parse_record_rejects_non_objects() {
        let err = parse_record(b"[1,2]").unwrap_err();
        assert!(err.contains("an array"));
        assert!(parse_record(b"{\"id\":").is_err());
        assert!(parse_record(b" {\"id\":1} ").is_ok());
    }

    #[test]
    fn trims_crlf_and_lf() {
        assert_eq!(trim_line_ending(b"{}\r\n"), b"{}");
        assert_eq!(trim_line_ending(b"{}\n"), b"{}");
        assert_eq!(trim_line_ending(b"{}"), b"{}");
    }
}
