//! Comparison operators applied to a single column.
//!
//! NULL is treated as the smallest value, the way MySQL sorts it, so that filters built for
//! cursor pagination agree with ORDER BY.

use chrono::{DateTime, Utc};
use query_engine_metadata::metadata::{ColumnDescriptor, ValueType};
use query_engine_sql::sql::ast::{Expression, Function, JsonLiteral, JsonPath, Value, Where};
use query_engine_sql::sql::helpers;

use super::error::Error;
use super::values::{escape_like, CompareValue};

/// Settings resolved once per compiled filter.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Settings {
    pub max_in_values: usize,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operator {
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    In,
    Contains,
}

impl Operator {
    pub(crate) fn from_key(key: &str) -> Option<Operator> {
        match key {
            "$eq" => Some(Operator::Equal),
            "$neq" => Some(Operator::NotEqual),
            "$gt" => Some(Operator::Greater),
            "$gte" => Some(Operator::GreaterOrEqual),
            "$lt" => Some(Operator::Less),
            "$lte" => Some(Operator::LessOrEqual),
            "$in" => Some(Operator::In),
            "$contains" => Some(Operator::Contains),
            _ => None,
        }
    }
}

/// Compile `column <operator> value`.
pub(crate) fn compile_operator(
    operator: Operator,
    value: &serde_json::Value,
    column: &ColumnDescriptor,
    settings: &Settings,
) -> Result<Where, Error> {
    match operator {
        Operator::Equal => equals(column, &CompareValue::from_json(value, settings.now)?),
        Operator::NotEqual => Ok(Where::not(equals(
            column,
            &CompareValue::from_json(value, settings.now)?,
        )?)),
        Operator::Greater => greater_than(column, &CompareValue::from_json(value, settings.now)?),
        Operator::LessOrEqual => Ok(Where::not(greater_than(
            column,
            &CompareValue::from_json(value, settings.now)?,
        )?)),
        Operator::Less => less_than(column, &CompareValue::from_json(value, settings.now)?),
        Operator::GreaterOrEqual => Ok(Where::not(less_than(
            column,
            &CompareValue::from_json(value, settings.now)?,
        )?)),
        Operator::In => is_in(column, value, settings),
        Operator::Contains => contains(column, value),
    }
}

/// The expression to compare plain values against. JSON scalars are unwrapped with
/// `JSON_VALUE`, which also turns a JSON null into a SQL NULL.
fn scalar_expression(column: &ColumnDescriptor) -> Expression {
    let Some(returning) = column.value_type.json_returning() else {
        return column.expression.clone();
    };
    match &column.expression {
        Expression::JsonExtract { expression, path }
        | Expression::JsonValue {
            expression, path, ..
        } => helpers::json_value((**expression).clone(), path.clone(), Some(returning)),
        expression => helpers::json_value(expression.clone(), JsonPath::root(), Some(returning)),
    }
}

/// A missing JSON value or a JSON null.
fn json_null(expression: &Expression) -> Where {
    Where::is_null(expression.clone()).or(Where::eq(
        expression.clone(),
        helpers::json_literal(JsonLiteral::Null),
    ))
}

/// Case insensitive search for an exact string or a LIKE pattern inside a JSON document.
fn json_search(expression: &Expression, pattern: String) -> Where {
    Where::is_not_null(helpers::json_search(
        helpers::function(Function::Lower, vec![expression.clone()]),
        helpers::value(pattern),
    ))
}

fn not_a_json_array(operator: &str) -> Error {
    Error::invalid_filter(format!("Cannot use {operator} on a JSON array"))
}

fn equals(column: &ColumnDescriptor, value: &CompareValue) -> Result<Where, Error> {
    match column.value_type {
        ValueType::JsonArray => json_array_contains(&column.expression, value),
        ValueType::JsonObject => {
            value.normalize(column.value_type)?;
            Ok(json_null(&column.expression))
        }
        value_type => {
            let expression = scalar_expression(column);
            match value.normalize(value_type)? {
                Value::Null => Ok(Where::is_null(expression)),
                normalized if column.nullable => Ok(Where::null_safe_eq(expression, normalized)),
                normalized => Ok(Where::eq(expression, normalized)),
            }
        }
    }
}

/// Whether a JSON array holds `value`. A null also matches a missing or null array.
fn json_array_contains(expression: &Expression, value: &CompareValue) -> Result<Where, Error> {
    match value {
        CompareValue::Null => Ok(json_null(expression).or(Where::json_contains(
            expression.clone(),
            helpers::json_literal(JsonLiteral::Null),
        ))),
        CompareValue::String(s) => Ok(json_search(expression, escape_like(&s.to_lowercase()))),
        other => Ok(Where::json_contains(
            expression.clone(),
            Value::Json(other.to_json()?),
        )),
    }
}

fn greater_than(column: &ColumnDescriptor, value: &CompareValue) -> Result<Where, Error> {
    if column.value_type == ValueType::JsonArray {
        return Err(not_a_json_array("$gt"));
    }
    let expression = scalar_expression(column);
    match value.normalize(column.value_type)? {
        // Every value is greater than NULL, except NULL itself.
        Value::Null if column.nullable => Ok(Where::is_not_null(expression)),
        Value::Null => Ok(Where::always()),
        normalized if column.nullable => {
            Ok(Where::is_not_null(expression.clone()).and(Where::gt(expression, normalized)))
        }
        normalized => Ok(Where::gt(expression, normalized)),
    }
}

fn less_than(column: &ColumnDescriptor, value: &CompareValue) -> Result<Where, Error> {
    if column.value_type == ValueType::JsonArray {
        return Err(not_a_json_array("$lt"));
    }
    let expression = scalar_expression(column);
    match value.normalize(column.value_type)? {
        Value::Null => Ok(Where::never()),
        normalized if column.nullable => {
            Ok(Where::is_null(expression.clone()).or(Where::lt(expression, normalized)))
        }
        normalized => Ok(Where::lt(expression, normalized)),
    }
}

fn is_in(
    column: &ColumnDescriptor,
    value: &serde_json::Value,
    settings: &Settings,
) -> Result<Where, Error> {
    let serde_json::Value::Array(items) = value else {
        return Err(Error::invalid_filter("Expected array at $in filter"));
    };
    if items.len() > settings.max_in_values {
        return Err(Error::invalid_filter(format!(
            "Too many values in $in filter, maximum is {}",
            settings.max_in_values
        )));
    }
    let values = items
        .iter()
        .map(|item| CompareValue::from_json(item, settings.now))
        .collect::<Result<Vec<_>, _>>()?;

    if column.value_type == ValueType::JsonArray {
        return json_array_overlaps(&column.expression, &values);
    }

    let expression = scalar_expression(column);
    let mut has_null = false;
    let mut normalized = Vec::with_capacity(values.len());
    for value in &values {
        match value.normalize(column.value_type)? {
            Value::Null => has_null = true,
            other => normalized.push(other),
        }
    }

    let matches_value = match normalized.len() {
        0 => None,
        1 => Some(Where::eq(expression.clone(), normalized.remove(0))),
        _ => Some(Where::is_in(expression.clone(), normalized)),
    };
    let matches_null = || {
        if column.value_type == ValueType::JsonObject {
            json_null(&column.expression)
        } else {
            Where::is_null(expression.clone())
        }
    };

    match (has_null, matches_value) {
        (false, None) => Ok(Where::never()),
        (false, Some(matches_value)) => Ok(matches_value),
        (true, None) => Ok(matches_null()),
        (true, Some(matches_value)) => Ok(matches_null().or(matches_value)),
    }
}

/// Whether a JSON array shares at least one element with `values`.
fn json_array_overlaps(expression: &Expression, values: &[CompareValue]) -> Result<Where, Error> {
    let mut has_null = false;
    let mut branches = vec![];
    let mut documents = vec![];
    for value in values {
        match value {
            CompareValue::Null => has_null = true,
            CompareValue::String(_) => branches.push(json_array_contains(expression, value)?),
            other => documents.push(other.to_json()?),
        }
    }
    if has_null {
        branches.insert(0, json_array_contains(expression, &CompareValue::Null)?);
    }
    if !documents.is_empty() {
        branches.push(Where::json_overlaps(
            expression.clone(),
            Value::Json(serde_json::Value::Array(documents)),
        ));
    }
    Ok(Where::Or(branches))
}

fn contains(column: &ColumnDescriptor, value: &serde_json::Value) -> Result<Where, Error> {
    let serde_json::Value::String(needle) = value else {
        return Err(Error::invalid_filter("Expected string at $contains filter"));
    };
    let pattern = format!("%{}%", escape_like(&needle.to_lowercase()));

    if column.value_type == ValueType::JsonArray {
        return Ok(json_search(&column.expression, pattern));
    }
    CompareValue::String(needle.clone()).normalize(column.value_type)?;
    Ok(Where::like(scalar_expression(column), pattern))
}
