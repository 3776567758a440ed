//! Type definitions of a SQL AST representation.

use chrono::{DateTime, Utc};

/// A SELECT statement
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub select_list: SelectList,
    pub from: Option<From>,
    pub joins: Vec<Join>,
    pub where_: Option<Where>,
    pub group_by: GroupBy,
    pub having: Option<Where>,
    pub order_by: OrderBy,
    pub limit: Limit,
    pub lock: Option<Lock>,
    /// Rendered as a `MAX_EXECUTION_TIME` optimizer hint, in milliseconds.
    pub max_execution_time: Option<u64>,
}

/// An UPDATE statement
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: TableReference,
    pub joins: Vec<Join>,
    pub set: Vec<Assignment>,
    pub where_: Option<Where>,
    /// Set by `all_rows()`: the statement may run without a restricting WHERE.
    pub all_rows: bool,
}

/// A DELETE statement
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub from: TableReference,
    pub joins: Vec<Join>,
    pub where_: Option<Where>,
    /// Set by `all_rows()`: the statement may run without a restricting WHERE.
    pub all_rows: bool,
}

/// A `column = value` pair in an UPDATE SET clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: ColumnReference,
    pub value: Expression,
}

/// A select list
#[derive(Debug, Clone, PartialEq)]
pub enum SelectList {
    /// `ns`.* of the default namespace
    SelectStar,
    SelectList(Vec<Expression>),
}

/// A FROM clause
#[derive(Debug, Clone, PartialEq)]
pub enum From {
    /// Select from a table reference
    Table(TableReference),
    /// Select from a subquery
    Select { select: Box<Select>, alias: TableAlias },
}

/// A JOIN clause
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableReference,
    pub on: Where,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

/// A GROUP BY clause
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupBy {
    pub elements: Vec<Expression>,
}

/// An ORDER BY clause
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderBy {
    pub elements: Vec<OrderByElement>,
}

/// A single element in an ORDER BY clause
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByElement {
    pub target: Expression,
    pub direction: OrderByDirection,
}

/// A direction for a single ORDER BY element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderByDirection {
    Asc,
    Desc,
}

/// LIMIT and OFFSET clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Limit {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Row locking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lock {
    ForUpdate,
    ForShare,
}

/// A boolean predicate, used in WHERE, HAVING, ON and IF.
#[derive(Debug, Clone, PartialEq)]
pub enum Where {
    And(Vec<Where>),
    Or(Vec<Where>),
    Not(Box<Where>),
    Comparison {
        left: Expression,
        operator: ComparisonOperator,
        right: Expression,
    },
    Like {
        expression: Expression,
        pattern: Expression,
        negated: bool,
    },
    Exists {
        select: Box<Select>,
        negated: bool,
    },
    JsonContains {
        target: Expression,
        candidate: Expression,
    },
    JsonOverlaps {
        left: Expression,
        right: Expression,
    },
    /// A predicate on a joined relation. The join is added to the statement that ends up
    /// owning this predicate.
    Join {
        join: Box<Join>,
        predicate: Box<Where>,
        relation_always_exists: bool,
    },
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
    /// MySQL `<=>`
    NullSafeEqual,
}

/// What a predicate evaluates to, as far as we can tell without touching data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alwaysness {
    Always,
    Never,
    Unknown,
}

/// A scalar expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A column reference
    ColumnReference(ColumnReference),
    /// `ns`.*
    Wildcard(Namespace),
    /// An irreducible value
    Value(Value),
    /// A parenthesized list of values, the right side of IN
    ValueList(Vec<Value>),
    /// NOW()
    Now,
    /// Trusted SQL text, never built from user input
    Raw(String),
    JsonLiteral(JsonLiteral),
    /// A scalar function call
    FunctionCall {
        function: Function,
        args: Vec<Expression>,
    },
    /// A COUNT clause
    Count(CountType),
    Distinct(Box<Expression>),
    Cast {
        expression: Box<Expression>,
        r#type: CastType,
    },
    Calculation {
        left: Box<Expression>,
        operator: ArithmeticOperator,
        right: Box<Expression>,
    },
    /// Full years between the expression and today
    Age(Box<Expression>),
    If {
        condition: Box<Where>,
        then: Box<Expression>,
        r#else: Box<Expression>,
    },
    Aliased {
        expression: Box<Expression>,
        alias: ColumnAlias,
    },
    JsonExtract {
        expression: Box<Expression>,
        path: JsonPath,
    },
    JsonValue {
        expression: Box<Expression>,
        path: JsonPath,
        returning: Option<JsonReturning>,
    },
    /// JSON_SEARCH(expression, 'one', needle)
    JsonSearch {
        expression: Box<Expression>,
        needle: Box<Expression>,
    },
    CorrelatedSubSelect(Box<Select>),
}

/// A scalar function
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Function {
    Concat,
    Coalesce,
    Greatest,
    IfNull,
    Lower,
    CharLength,
    Sum,
    Min,
    Max,
    JsonUnquote,
    JsonLength,
    Unknown(String),
}

/// COUNT clause
#[derive(Debug, Clone, PartialEq)]
pub enum CountType {
    Star,
    Expression(Box<Expression>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOperator {
    Plus,
    Minus,
    Multiply,
}

/// Target types of CAST
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastType {
    Char,
    Signed,
    Unsigned,
    Json,
    Date,
    DateTime,
}

/// RETURNING types of JSON_VALUE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonReturning {
    Char,
    Signed,
    Unsigned,
    Double,
    DateTime,
}

/// JSON constants, rendered as `CAST('null' AS JSON)` and friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonLiteral {
    Null,
    True,
    False,
}

/// Value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    DateTime(DateTime<Utc>),
    Json(serde_json::Value),
}

/// A path into a JSON document, starting at `$`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JsonPath {
    pub segments: Vec<JsonPathSegment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonPathSegment {
    /// `.name`, quoted when it is not a plain identifier
    Key(String),
    /// `."name"`, always quoted
    QuotedKey(String),
    /// `[n]`
    Index(usize),
    /// `[*]`
    AnyIndex,
}

/// A database table name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(pub String);

/// aliases that we give to relations
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableAlias(pub String);

/// A database table's column name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnName(pub String);

/// aliases that we give to columns
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnAlias(pub String);

/// A reference to a table, optionally aliased.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableReference {
    pub name: TableName,
    pub alias: Option<TableAlias>,
}

/// The table a column belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// The FROM table of the statement the column is rendered in
    Default,
    /// The FROM table of the enclosing statement
    Parent,
    Named(TableAlias),
}

/// A reference to a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnReference {
    pub namespace: Namespace,
    pub name: ColumnName,
}

impl TableReference {
    /// The name columns use to refer to this table.
    pub fn namespace(&self) -> &str {
        match &self.alias {
            Some(TableAlias(alias)) => alias,
            None => &self.name.0,
        }
    }
}

impl From {
    /// The name columns use to refer to this source.
    pub fn namespace(&self) -> &str {
        match self {
            From::Table(table) => table.namespace(),
            From::Select { alias, .. } => &alias.0,
        }
    }
}
