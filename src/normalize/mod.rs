//! Payload normalization: reshaping whatever the server sent into the
//! canonical schemas in `crate::models`.
//!
//! Normalizers are pure functions over `serde_json::Value`. They never panic
//! and only fail when the top-level payload is not an object; every defect
//! below that is absorbed by substituting the documented defaults.

mod insight;
mod overview;
mod table;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

pub use insight::{normalize_dataset_matrix, normalize_forecast_series, normalize_model_exists};
pub use overview::normalize_overview;
pub use table::{is_transposed_table, to_record_sequence, TableShape};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("payload is not a JSON object (got {0})")]
    NotAnObject(&'static str),
}

fn require_object(raw: &Value) -> Result<&Map<String, Value>, NormalizeError> {
    raw.as_object()
        .ok_or_else(|| NormalizeError::NotAnObject(json_kind(raw)))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A sequence field is kept only when it deserializes cleanly as the target
/// element type; anything else is replaced by an empty sequence. Fields are
/// fixed up one at a time, so one bad sequence never poisons its siblings.
fn seq_or_empty<T: DeserializeOwned>(value: Option<&Value>) -> Vec<T> {
    value
        .map(|v| serde_json::from_value(v.clone()).unwrap_or_default())
        .unwrap_or_default()
}
