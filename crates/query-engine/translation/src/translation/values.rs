//! Handle the translation of literal filter values.

use chrono::{DateTime, TimeZone, Utc};
use query_engine_metadata::metadata::ValueType;
use query_engine_sql::sql::ast::Value;

use super::error::Error;

const INVALID_COMPARE_VALUE: &str =
    "Invalid compare value. Expected a string, number, boolean, date or null.";

/// A value a column is compared against, read from the filter grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum CompareValue {
    Null,
    Boolean(bool),
    Number(serde_json::Number),
    String(String),
    DateTime(DateTime<Utc>),
}

impl CompareValue {
    /// Read a filter value.
    ///
    /// Objects are only accepted as magic values: `{"$": "$now"}` and
    /// `{"$": "$date", "value": <milliseconds since the epoch>}`.
    pub fn from_json(value: &serde_json::Value, now: DateTime<Utc>) -> Result<CompareValue, Error> {
        match value {
            serde_json::Value::Null => Ok(CompareValue::Null),
            serde_json::Value::Bool(b) => Ok(CompareValue::Boolean(*b)),
            serde_json::Value::Number(n) => Ok(CompareValue::Number(n.clone())),
            serde_json::Value::String(s) => Ok(CompareValue::String(s.clone())),
            serde_json::Value::Object(object) => match object.get("$") {
                Some(serde_json::Value::String(magic)) if magic == "$now" => {
                    Ok(CompareValue::DateTime(now))
                }
                Some(serde_json::Value::String(magic)) if magic == "$date" => object
                    .get("value")
                    .and_then(serde_json::Value::as_i64)
                    .and_then(|milliseconds| Utc.timestamp_millis_opt(milliseconds).single())
                    .map(CompareValue::DateTime)
                    .ok_or_else(|| Error::invalid_filter("Invalid date value in $date")),
                _ => Err(Error::invalid_filter(INVALID_COMPARE_VALUE)),
            },
            serde_json::Value::Array(_) => Err(Error::invalid_filter(INVALID_COMPARE_VALUE)),
        }
    }

    /// Whether a filter value is a magic value rather than a nested filter.
    pub fn is_magic(value: &serde_json::Value) -> bool {
        value
            .as_object()
            .is_some_and(|object| object.contains_key("$"))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CompareValue::Null)
    }

    /// Convert to the SQL value stored in a column of `value_type`.
    ///
    /// Booleans are stored as 1 and 0, so they compare with boolean and number columns, and
    /// only the numbers 0 and 1 compare with boolean columns.
    pub fn normalize(&self, value_type: ValueType) -> Result<Value, Error> {
        if value_type == ValueType::Table {
            return Err(Error::invalid_filter("Cannot compare at root level"));
        }
        if value_type == ValueType::JsonObject && !self.is_null() {
            return Err(Error::invalid_filter("Cannot compare with a JSON object"));
        }

        match self {
            CompareValue::Null => Ok(Value::Null),
            CompareValue::Boolean(b) => {
                if value_type.is_boolean() || value_type.is_number() {
                    Ok(Value::Integer(i64::from(*b)))
                } else {
                    Err(Error::invalid_filter(
                        "Cannot compare a boolean with a non-boolean column",
                    ))
                }
            }
            CompareValue::Number(n) => {
                if value_type.is_number() {
                    Ok(number_value(n))
                } else if value_type.is_boolean() {
                    match n.as_f64() {
                        Some(f) if f == 0.0 => Ok(Value::Integer(0)),
                        Some(f) if f == 1.0 => Ok(Value::Integer(1)),
                        _ => Err(Error::invalid_filter(
                            "Cannot compare a number with a boolean column",
                        )),
                    }
                } else {
                    Err(Error::invalid_filter(
                        "Cannot compare a number with a non-number column",
                    ))
                }
            }
            CompareValue::String(s) => {
                if value_type.is_string() {
                    Ok(Value::String(s.clone()))
                } else {
                    Err(Error::invalid_filter(
                        "Cannot compare a string with a non-string column",
                    ))
                }
            }
            CompareValue::DateTime(timestamp) => {
                if value_type == ValueType::Datetime {
                    Ok(Value::DateTime(*timestamp))
                } else {
                    Err(Error::invalid_filter(
                        "Cannot compare a date with a non-datetime column",
                    ))
                }
            }
        }
    }

    /// The JSON document searched for inside a JSON array.
    pub fn to_json(&self) -> Result<serde_json::Value, Error> {
        match self {
            CompareValue::Null => Ok(serde_json::Value::Null),
            CompareValue::Boolean(b) => Ok(serde_json::Value::Bool(*b)),
            CompareValue::Number(n) => Ok(serde_json::Value::Number(n.clone())),
            CompareValue::String(s) => Ok(serde_json::Value::String(s.clone())),
            CompareValue::DateTime(_) => Err(Error::invalid_filter(
                "Cannot compare a date with a non-datetime column",
            )),
        }
    }
}

fn number_value(n: &serde_json::Number) -> Value {
    match n.as_i64() {
        Some(i) => Value::Integer(i),
        None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
    }
}

/// Escape the LIKE wildcards in a user supplied needle.
pub fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn read(value: serde_json::Value) -> Result<CompareValue, Error> {
        CompareValue::from_json(&value, Utc::now())
    }

    #[test]
    fn magic_dates_are_read_as_timestamps() {
        let value = read(json!({"$": "$date", "value": 1_700_000_000_000_i64})).unwrap();
        assert_eq!(
            value,
            CompareValue::DateTime(Utc.timestamp_millis_opt(1_700_000_000_000).unwrap())
        );
    }

    #[test]
    fn now_uses_the_supplied_clock() {
        let now = Utc.timestamp_millis_opt(0).unwrap();
        let value = CompareValue::from_json(&json!({"$": "$now"}), now).unwrap();
        assert_eq!(value, CompareValue::DateTime(now));
    }

    #[test]
    fn other_objects_are_rejected() {
        assert_eq!(
            read(json!({"a": 1})),
            Err(Error::invalid_filter(INVALID_COMPARE_VALUE))
        );
        assert_eq!(
            read(json!([1])),
            Err(Error::invalid_filter(INVALID_COMPARE_VALUE))
        );
    }

    #[test]
    fn booleans_are_stored_as_numbers() {
        let value = read(json!(true)).unwrap();
        assert_eq!(value.normalize(ValueType::Boolean), Ok(Value::Integer(1)));
        assert_eq!(value.normalize(ValueType::JsonBoolean), Ok(Value::Integer(1)));
        assert_eq!(read(json!(0)).unwrap().normalize(ValueType::Boolean), Ok(Value::Integer(0)));
        assert_eq!(
            read(json!(2)).unwrap().normalize(ValueType::Boolean),
            Err(Error::invalid_filter(
                "Cannot compare a number with a boolean column"
            ))
        );
    }

    #[test]
    fn type_mismatches_are_errors() {
        assert!(read(json!("a")).unwrap().normalize(ValueType::Number).is_err());
        assert!(read(json!(1)).unwrap().normalize(ValueType::String).is_err());
        assert!(read(json!({"$": "$now"}))
            .unwrap()
            .normalize(ValueType::String)
            .is_err());
        assert!(read(json!("a")).unwrap().normalize(ValueType::JsonObject).is_err());
        assert_eq!(
            read(json!(null)).unwrap().normalize(ValueType::JsonObject),
            Ok(Value::Null)
        );
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like(r"50%_off\"), r"50\%\_off\\");
    }
}
