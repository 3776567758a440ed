//! Helpers for building sql::ast types in certain shapes and patterns.

use chrono::{DateTime, Utc};

use super::ast::{
    self, Assignment, CastType, ColumnAlias, ColumnName, ColumnReference, CountType, Delete,
    Expression, Function, GroupBy, Join, JoinKind, JsonLiteral, JsonPath, JsonPathSegment,
    JsonReturning, Limit, Namespace, OrderBy, OrderByDirection, OrderByElement, Select,
    SelectList, TableAlias, TableName, TableReference, Update, Value, Where,
};

// Empty clauses //

/// An empty `GROUP BY` clause.
pub fn empty_group_by() -> GroupBy {
    GroupBy { elements: vec![] }
}

/// An empty `ORDER BY` clause.
pub fn empty_order_by() -> OrderBy {
    OrderBy { elements: vec![] }
}

/// Empty `LIMIT` and `OFFSET` clauses.
pub fn empty_limit() -> Limit {
    Limit {
        limit: None,
        offset: None,
    }
}

// Tables //

pub fn table(name: &str) -> TableReference {
    TableReference {
        name: TableName(name.to_string()),
        alias: None,
    }
}

pub fn aliased_table(name: &str, alias: &str) -> TableReference {
    TableReference {
        name: TableName(name.to_string()),
        alias: Some(TableAlias(alias.to_string())),
    }
}

// Columns //

/// A column of the FROM table of the statement it ends up in.
pub fn column(name: &str) -> Expression {
    column_in(Namespace::Default, name)
}

/// A column of the FROM table of the enclosing statement.
pub fn parent_column(name: &str) -> Expression {
    column_in(Namespace::Parent, name)
}

/// A column of a named table or alias.
pub fn table_column(table: &str, name: &str) -> Expression {
    column_in(Namespace::Named(TableAlias(table.to_string())), name)
}

pub fn column_in(namespace: Namespace, name: &str) -> Expression {
    Expression::ColumnReference(ColumnReference {
        namespace,
        name: ColumnName(name.to_string()),
    })
}

/// `ns`.* of the default namespace.
pub fn wildcard() -> Expression {
    Expression::Wildcard(Namespace::Default)
}

pub fn aliased(expression: Expression, alias: &str) -> Expression {
    Expression::Aliased {
        expression: Box::new(expression),
        alias: ColumnAlias(alias.to_string()),
    }
}

// Expressions //

pub fn value(value: impl Into<Value>) -> Expression {
    Expression::Value(value.into())
}

pub fn raw(sql: &str) -> Expression {
    Expression::Raw(sql.to_string())
}

pub fn now() -> Expression {
    Expression::Now
}

pub fn json_literal(literal: JsonLiteral) -> Expression {
    Expression::JsonLiteral(literal)
}

pub fn function(function: Function, args: Vec<Expression>) -> Expression {
    Expression::FunctionCall { function, args }
}

pub fn count_star() -> Expression {
    Expression::Count(CountType::Star)
}

pub fn count(expression: Expression) -> Expression {
    Expression::Count(CountType::Expression(Box::new(expression)))
}

pub fn distinct(expression: Expression) -> Expression {
    Expression::Distinct(Box::new(expression))
}

pub fn cast(expression: Expression, r#type: CastType) -> Expression {
    Expression::Cast {
        expression: Box::new(expression),
        r#type,
    }
}

pub fn age(expression: Expression) -> Expression {
    Expression::Age(Box::new(expression))
}

pub fn if_then_else(condition: Where, then: Expression, r#else: Expression) -> Expression {
    Expression::If {
        condition: Box::new(condition),
        then: Box::new(then),
        r#else: Box::new(r#else),
    }
}

pub fn sub_select(select: Select) -> Expression {
    Expression::CorrelatedSubSelect(Box::new(select))
}

// JSON //

pub fn json_extract(expression: Expression, path: JsonPath) -> Expression {
    Expression::JsonExtract {
        expression: Box::new(expression),
        path,
    }
}

pub fn json_value(
    expression: Expression,
    path: JsonPath,
    returning: Option<JsonReturning>,
) -> Expression {
    Expression::JsonValue {
        expression: Box::new(expression),
        path,
        returning,
    }
}

pub fn json_search(expression: Expression, needle: Expression) -> Expression {
    Expression::JsonSearch {
        expression: Box::new(expression),
        needle: Box::new(needle),
    }
}

impl JsonPath {
    /// `$`
    pub fn root() -> JsonPath {
        JsonPath::default()
    }

    /// A path through trusted member names, e.g. `JsonPath::keys(["dog", "name"])`.
    pub fn keys<'a>(keys: impl IntoIterator<Item = &'a str>) -> JsonPath {
        keys.into_iter().fold(JsonPath::root(), JsonPath::key)
    }

    #[must_use]
    pub fn key(mut self, key: &str) -> JsonPath {
        self.segments.push(JsonPathSegment::Key(key.to_string()));
        self
    }

    /// A member name that comes from user input. Always quoted.
    #[must_use]
    pub fn quoted_key(mut self, key: &str) -> JsonPath {
        self.segments
            .push(JsonPathSegment::QuotedKey(key.to_string()));
        self
    }

    #[must_use]
    pub fn index(mut self, index: usize) -> JsonPath {
        self.segments.push(JsonPathSegment::Index(index));
        self
    }

    #[must_use]
    pub fn any_index(mut self) -> JsonPath {
        self.segments.push(JsonPathSegment::AnyIndex);
        self
    }

    #[must_use]
    pub fn join(mut self, other: JsonPath) -> JsonPath {
        self.segments.extend(other.segments);
        self
    }

    /// The MySQL path text, e.g. `$.dog."first name"[0]`.
    pub fn to_path_string(&self) -> String {
        let mut path = String::from("$");
        for segment in &self.segments {
            match segment {
                JsonPathSegment::Key(key) if is_plain_key(key) => {
                    path.push('.');
                    path.push_str(key);
                }
                JsonPathSegment::Key(key) | JsonPathSegment::QuotedKey(key) => {
                    path.push_str(".\"");
                    path.push_str(&key.replace('\\', "\\\\").replace('"', "\\\""));
                    path.push('"');
                }
                JsonPathSegment::Index(index) => {
                    path.push_str(&format!("[{index}]"));
                }
                JsonPathSegment::AnyIndex => path.push_str("[*]"),
            }
        }
        path
    }
}

fn is_plain_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

// Joins //

pub fn join(kind: JoinKind, table: TableReference, on: Where) -> Join {
    Join { kind, table, on }
}

pub fn left_join(table: TableReference, on: Where) -> Join {
    join(JoinKind::Left, table, on)
}

pub fn inner_join(table: TableReference, on: Where) -> Join {
    join(JoinKind::Inner, table, on)
}

// Ordering //

pub fn asc(target: Expression) -> OrderByElement {
    OrderByElement {
        target,
        direction: OrderByDirection::Asc,
    }
}

pub fn desc(target: Expression) -> OrderByElement {
    OrderByElement {
        target,
        direction: OrderByDirection::Desc,
    }
}

// Statements //

/// Build a simple select * from a table.
pub fn select(from: TableReference) -> Select {
    star_select(ast::From::Table(from))
}

/// Build a simple select * with the rest empty.
pub fn star_select(from: ast::From) -> Select {
    Select {
        select_list: SelectList::SelectStar,
        from: Some(from),
        joins: vec![],
        where_: None,
        group_by: empty_group_by(),
        having: None,
        order_by: empty_order_by(),
        limit: empty_limit(),
        lock: None,
        max_execution_time: None,
    }
}

pub fn update(table: TableReference) -> Update {
    Update {
        table,
        joins: vec![],
        set: vec![],
        where_: None,
        all_rows: false,
    }
}

pub fn delete_from(from: TableReference) -> Delete {
    Delete {
        from,
        joins: vec![],
        where_: None,
        all_rows: false,
    }
}

pub fn assignment(column: &str, value: impl Into<Expression>) -> Assignment {
    Assignment {
        column: ColumnReference {
            namespace: Namespace::Default,
            name: ColumnName(column.to_string()),
        },
        value: value.into(),
    }
}

// Conversions //

impl std::convert::From<i64> for Value {
    fn from(value: i64) -> Value {
        Value::Integer(value)
    }
}

impl std::convert::From<i32> for Value {
    fn from(value: i32) -> Value {
        Value::Integer(i64::from(value))
    }
}

impl std::convert::From<u32> for Value {
    fn from(value: u32) -> Value {
        Value::Integer(i64::from(value))
    }
}

impl std::convert::From<f64> for Value {
    fn from(value: f64) -> Value {
        Value::Float(value)
    }
}

impl std::convert::From<bool> for Value {
    fn from(value: bool) -> Value {
        Value::Boolean(value)
    }
}

impl std::convert::From<&str> for Value {
    fn from(value: &str) -> Value {
        Value::String(value.to_string())
    }
}

impl std::convert::From<String> for Value {
    fn from(value: String) -> Value {
        Value::String(value)
    }
}

impl std::convert::From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Value {
        Value::DateTime(value)
    }
}

impl<T: Into<Value>> std::convert::From<Option<T>> for Value {
    fn from(value: Option<T>) -> Value {
        value.map_or(Value::Null, Into::into)
    }
}

macro_rules! value_expression {
    ($($t:ty),*) => {
        $(
            impl std::convert::From<$t> for Expression {
                fn from(value: $t) -> Expression {
                    Expression::Value(value.into())
                }
            }
        )*
    };
}

value_expression!(Value, i64, i32, u32, f64, bool, &str, String, DateTime<Utc>);

impl<T: Into<Value>> std::convert::From<Option<T>> for Expression {
    fn from(value: Option<T>) -> Expression {
        Expression::Value(value.into())
    }
}

impl std::convert::From<Vec<Value>> for Expression {
    fn from(values: Vec<Value>) -> Expression {
        Expression::ValueList(values)
    }
}
