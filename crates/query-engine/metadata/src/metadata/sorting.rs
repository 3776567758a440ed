//! Sort definitions: which sort keys an entity accepts, how they order in SQL and how the
//! same ordering is reproduced in memory for cursor pagination.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use query_engine_sql::sql::ast::{Expression, Join, OrderByDirection, OrderByElement};
use query_engine_sql::sql::helpers;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A result row, keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Reads the in-memory sort value of a row.
pub type SortValueReader = Arc<dyn Fn(&Row) -> SortValue + Send + Sync>;

/// Sort direction of the external sort grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum SortDirection {
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

/// One entry of the external sort grammar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SortItem {
    pub key: String,
    pub order: SortDirection,
}

impl SortItem {
    pub fn asc(key: &str) -> SortItem {
        SortItem {
            key: key.to_string(),
            order: SortDirection::Asc,
        }
    }

    pub fn desc(key: &str) -> SortItem {
        SortItem {
            key: key.to_string(),
            order: SortDirection::Desc,
        }
    }
}

/// How one sort key orders rows.
///
/// `expression` must map to a single column or an expression of a single column, so that
/// `expression > last value` selects exactly the rows after a cursor.
#[derive(Clone)]
pub struct SortDefinition {
    pub expression: Expression,
    pub join: Option<Join>,
    pub select: Vec<Expression>,
    pub value: SortValueReader,
}

impl fmt::Debug for SortDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortDefinition")
            .field("expression", &self.expression)
            .field("join", &self.join)
            .field("select", &self.select)
            .finish_non_exhaustive()
    }
}

impl SortDefinition {
    pub fn new(
        expression: Expression,
        value: impl Fn(&Row) -> SortValue + Send + Sync + 'static,
    ) -> SortDefinition {
        SortDefinition {
            expression,
            join: None,
            select: vec![],
            value: Arc::new(value),
        }
    }

    /// Sort on a column of the default namespace, reading the same column from rows.
    pub fn column(name: &str) -> SortDefinition {
        let key = name.to_string();
        SortDefinition::new(helpers::column(name), move |row| {
            row.get(&key).map_or(SortValue::Null, SortValue::from_json)
        })
    }

    #[must_use]
    pub fn with_join(mut self, join: Join) -> SortDefinition {
        self.join = Some(join);
        self
    }

    #[must_use]
    pub fn with_select(mut self, expression: Expression) -> SortDefinition {
        self.select.push(expression);
        self
    }

    pub fn to_order_by(&self, direction: SortDirection) -> OrderByElement {
        OrderByElement {
            target: self.expression.clone(),
            direction: match direction {
                SortDirection::Asc => OrderByDirection::Asc,
                SortDirection::Desc => OrderByDirection::Desc,
            },
        }
    }

    pub fn value_of(&self, row: &Row) -> SortValue {
        (self.value)(row)
    }
}

/// The sort keys of one entity, in declaration order.
#[derive(Clone, Debug, Default)]
pub struct SortDefinitions(pub IndexMap<String, SortDefinition>);

impl SortDefinitions {
    pub fn new() -> SortDefinitions {
        SortDefinitions::default()
    }

    #[must_use]
    pub fn with(mut self, key: &str, definition: SortDefinition) -> SortDefinitions {
        self.0.insert(key.to_string(), definition);
        self
    }

    pub fn get(&self, key: &str) -> Option<&SortDefinition> {
        self.0.get(key)
    }
}

/// An in-memory sort value, ordered the way MySQL orders the matching column.
///
/// NULL sorts before every other value. Strings compare case-insensitively, like the default
/// `utf8mb4_0900_ai_ci` collation: strings that differ only in case are equal, and the next
/// sort key decides. Values of different kinds order by kind.
#[derive(Debug, Clone)]
pub enum SortValue {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    DateTime(DateTime<Utc>),
}

impl SortValue {
    /// Read a JSON value. RFC 3339 strings are read as timestamps.
    pub fn from_json(value: &serde_json::Value) -> SortValue {
        match value {
            serde_json::Value::Null => SortValue::Null,
            serde_json::Value::Bool(b) => SortValue::Boolean(*b),
            serde_json::Value::Number(n) => n.as_f64().map_or(SortValue::Null, SortValue::Number),
            serde_json::Value::String(s) => match DateTime::parse_from_rfc3339(s) {
                Ok(timestamp) => SortValue::DateTime(timestamp.with_timezone(&Utc)),
                Err(_) => SortValue::String(s.clone()),
            },
            other => SortValue::String(other.to_string()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SortValue::Null => 0,
            SortValue::Boolean(_) => 1,
            SortValue::Number(_) => 2,
            SortValue::String(_) => 3,
            SortValue::DateTime(_) => 4,
        }
    }
}

impl Ord for SortValue {
    fn cmp(&self, other: &SortValue) -> Ordering {
        match (self, other) {
            (SortValue::Null, SortValue::Null) => Ordering::Equal,
            (SortValue::Boolean(a), SortValue::Boolean(b)) => a.cmp(b),
            (SortValue::Number(a), SortValue::Number(b)) => a.total_cmp(b),
            (SortValue::String(a), SortValue::String(b)) => {
                a.to_lowercase().cmp(&b.to_lowercase())
            }
            (SortValue::DateTime(a), SortValue::DateTime(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for SortValue {
    fn partial_cmp(&self, other: &SortValue) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SortValue {
    fn eq(&self, other: &SortValue) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortValue {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_sorts_first() {
        let mut values = vec![
            SortValue::Number(2.0),
            SortValue::Null,
            SortValue::Number(-1.0),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                SortValue::Null,
                SortValue::Number(-1.0),
                SortValue::Number(2.0)
            ]
        );
    }

    #[test]
    fn strings_compare_case_insensitively() {
        assert!(SortValue::String("apple".into()) < SortValue::String("Banana".into()));
        assert_eq!(
            SortValue::String("Apple".into()).cmp(&SortValue::String("apple".into())),
            Ordering::Equal
        );
    }

    #[test]
    fn column_definitions_read_the_row() {
        let definition = SortDefinition::column("createdAt");
        let row = json!({"createdAt": "2024-01-02T03:04:05Z"});
        let row = row.as_object().unwrap();
        assert!(matches!(definition.value_of(row), SortValue::DateTime(_)));
        assert_eq!(definition.value_of(&Row::new()), SortValue::Null);
    }

    #[test]
    fn directions_use_the_external_names() {
        let item: SortItem = serde_json::from_value(json!({"key": "id", "order": "DESC"})).unwrap();
        assert_eq!(item, SortItem::desc("id"));
    }
}
