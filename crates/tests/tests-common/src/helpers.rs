//! Helpers for building test data.

use query_engine_metadata::metadata::Row;

/// A row from a JSON object literal.
///
/// Panics when `value` is not an object.
pub fn row(value: serde_json::Value) -> Row {
    match value {
        serde_json::Value::Object(object) => object,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// Rows from a JSON array of object literals.
pub fn rows(value: serde_json::Value) -> Vec<Row> {
    match value {
        serde_json::Value::Array(items) => items.into_iter().map(row).collect(),
        other => panic!("expected a JSON array, got {other}"),
    }
}
