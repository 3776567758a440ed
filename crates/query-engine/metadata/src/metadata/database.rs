//! Metadata information regarding the database columns filters compare against.

use std::fmt;
use std::sync::Arc;

use enum_iterator::Sequence;
use query_engine_sql::sql::ast::{Expression, JsonReturning};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How the values of a column are stored, which decides how filter values are compared
/// against it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Sequence,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub enum ValueType {
    /// A sub-object reached through a join. Only usable with nested definitions.
    Table,
    String,
    Datetime,
    Number,
    Boolean,
    #[serde(rename = "JSONBoolean")]
    JsonBoolean,
    #[serde(rename = "JSONString")]
    JsonString,
    #[serde(rename = "JSONNumber")]
    JsonNumber,
    #[serde(rename = "JSONArray")]
    JsonArray,
    #[serde(rename = "JSONObject")]
    JsonObject,
}

impl ValueType {
    /// The name used in configuration and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Table => "Table",
            ValueType::String => "String",
            ValueType::Datetime => "Datetime",
            ValueType::Number => "Number",
            ValueType::Boolean => "Boolean",
            ValueType::JsonBoolean => "JSONBoolean",
            ValueType::JsonString => "JSONString",
            ValueType::JsonNumber => "JSONNumber",
            ValueType::JsonArray => "JSONArray",
            ValueType::JsonObject => "JSONObject",
        }
    }

    /// Whether the column holds a JSON document rather than a plain SQL value.
    pub fn is_json(&self) -> bool {
        matches!(
            self,
            ValueType::JsonBoolean
                | ValueType::JsonString
                | ValueType::JsonNumber
                | ValueType::JsonArray
                | ValueType::JsonObject
        )
    }

    /// The SQL type a JSON scalar is unwrapped to before comparing.
    pub fn json_returning(&self) -> Option<JsonReturning> {
        match self {
            ValueType::JsonString => Some(JsonReturning::Char),
            ValueType::JsonNumber => Some(JsonReturning::Double),
            ValueType::JsonBoolean => Some(JsonReturning::Unsigned),
            _ => None,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, ValueType::String | ValueType::JsonString)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, ValueType::Number | ValueType::JsonNumber)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, ValueType::Boolean | ValueType::JsonBoolean)
    }
}

/// Decides whether the current caller may filter on a column. An `Err` carries the message
/// returned to the caller.
pub type PermissionCheck = Arc<dyn Fn() -> Result<(), String> + Send + Sync>;

/// A filterable column: the SQL expression producing its value, how that value is stored,
/// and whether it can be NULL.
///
/// The compiler trusts `nullable`: a column declared non-nullable gets no NULL branches.
#[derive(Clone)]
pub struct ColumnDescriptor {
    pub expression: Expression,
    pub value_type: ValueType,
    pub nullable: bool,
    /// Runs before any clause on the column is compiled.
    pub permission_check: Option<PermissionCheck>,
}

impl fmt::Debug for ColumnDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDescriptor")
            .field("expression", &self.expression)
            .field("value_type", &self.value_type)
            .field("nullable", &self.nullable)
            .field("has_permission_check", &self.permission_check.is_some())
            .finish()
    }
}

impl PartialEq for ColumnDescriptor {
    fn eq(&self, other: &ColumnDescriptor) -> bool {
        let same_check = match (&self.permission_check, &other.permission_check) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        self.expression == other.expression
            && self.value_type == other.value_type
            && self.nullable == other.nullable
            && same_check
    }
}

impl ColumnDescriptor {
    pub fn new(expression: Expression, value_type: ValueType) -> ColumnDescriptor {
        ColumnDescriptor {
            expression,
            value_type,
            nullable: false,
            permission_check: None,
        }
    }

    #[must_use]
    pub fn nullable(mut self) -> ColumnDescriptor {
        self.nullable = true;
        self
    }

    #[must_use]
    pub fn with_permission_check(
        mut self,
        check: impl Fn() -> Result<(), String> + Send + Sync + 'static,
    ) -> ColumnDescriptor {
        self.permission_check = Some(Arc::new(check));
        self
    }

    /// Run the permission check, if the column has one.
    pub fn check_permission(&self) -> Result<(), String> {
        match &self.permission_check {
            Some(check) => check(),
            None => Ok(()),
        }
    }
}
