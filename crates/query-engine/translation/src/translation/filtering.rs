//! Compile the external filter grammar into a WHERE predicate.
//!
//! A filter is a JSON document. Object keys are either combinators (`$and`, `$or`, `$not`),
//! operators (`$eq`, `$gt`, ...) or keys of the definitions table in scope. Arrays are
//! conjunctions and a bare value under a column is an equality. Keys containing dots address
//! nested definitions, so `{"settings.dog.name": "Rex"}` and
//! `{"settings": {"dog": {"name": "Rex"}}}` compile to the same predicate.

use chrono::{DateTime, Utc};
use query_engine_configuration::FilterSettings;
use query_engine_metadata::metadata::{
    ColumnDescriptor, FilterDefinition, FilterDefinitions, WildcardChildren, WildcardColumn,
};
use query_engine_sql::sql::ast::Where;
use query_engine_sql::sql::WhereHelpers;
use tracing::info_span;

use super::error::Error;
use super::operators::{compile_operator, Operator, Settings};
use super::values::CompareValue;

/// A filter in the external grammar. Key order is kept and decides the order of the
/// compiled conditions.
pub type Filter = serde_json::Value;

/// Limits and the clock used while compiling a filter.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOptions {
    /// The largest accepted `$in` list.
    pub max_in_values: usize,
    /// The value of `{"$": "$now"}`. The current time when not set.
    pub now: Option<DateTime<Utc>>,
}

impl Default for FilterOptions {
    fn default() -> FilterOptions {
        FilterOptions {
            max_in_values: 1000,
            now: None,
        }
    }
}

impl From<&FilterSettings> for FilterOptions {
    fn from(settings: &FilterSettings) -> FilterOptions {
        FilterOptions {
            max_in_values: settings.max_in_values,
            now: None,
        }
    }
}

/// Compile a filter with the default options.
pub fn compile_filter(filter: &Filter, definitions: &FilterDefinitions) -> Result<Where, Error> {
    compile_filter_with(filter, definitions, &FilterOptions::default())
}

/// Compile a filter against the definitions of an entity.
///
/// A `null` filter places no restriction. Unknown keys are rejected, never skipped. A column
/// whose permission check fails rejects the whole filter.
pub fn compile_filter_with(
    filter: &Filter,
    definitions: &FilterDefinitions,
    options: &FilterOptions,
) -> Result<Where, Error> {
    let compiler = Compiler {
        settings: Settings {
            max_in_values: options.max_in_values,
            now: options.now.unwrap_or_else(Utc::now),
        },
    };
    if filter.is_null() {
        return Ok(Where::always());
    }
    let predicate = info_span!("Compile filter")
        .in_scope(|| compiler.compile(filter, Scope::Table(definitions)))?;
    tracing::debug!(filter = %filter, alwaysness = ?predicate.alwaysness(), "compiled filter");
    Ok(predicate)
}

/// What the keys of a filter object refer to.
#[derive(Clone, Copy)]
enum Scope<'a> {
    /// Keys of a definitions table. Comparisons are not allowed here.
    Table(&'a FilterDefinitions),
    /// A column: keys are operators, or child definitions if it has any.
    Column {
        column: &'a ColumnDescriptor,
        children: Option<&'a FilterDefinitions>,
    },
    /// Every key names a column built by the factory.
    Wildcard {
        column: &'a WildcardColumn,
        children: Option<&'a WildcardChildren>,
    },
}

impl<'a> Scope<'a> {
    fn definitions(self) -> Option<&'a FilterDefinitions> {
        match self {
            Scope::Table(definitions) => Some(definitions),
            Scope::Column { children, .. } => children,
            Scope::Wildcard { .. } => None,
        }
    }
}

struct Compiler {
    settings: Settings,
}

impl Compiler {
    /// Compile a filter node: a conjunction of everything it holds.
    fn compile(&self, filter: &Filter, scope: Scope) -> Result<Where, Error> {
        let mut parts = self.compile_parts(filter, scope)?;
        if parts.len() == 1 {
            return Ok(parts.remove(0));
        }
        Ok(Where::And(parts))
    }

    /// The separate conditions of a filter node. `$and`, `$or` and `$not` combine these.
    fn compile_parts(&self, filter: &Filter, scope: Scope) -> Result<Vec<Where>, Error> {
        match filter {
            serde_json::Value::Array(items) => items
                .iter()
                .map(|item| self.compile(item, scope))
                .collect(),
            serde_json::Value::Object(object) if !CompareValue::is_magic(filter) => object
                .iter()
                .map(|(key, value)| self.compile_entry(key, value, scope))
                .collect(),
            // A bare value is an equality on the column in scope.
            value => Ok(vec![self.compile_comparison(Operator::Equal, value, scope)?]),
        }
    }

    fn compile_entry(&self, key: &str, value: &Filter, scope: Scope) -> Result<Where, Error> {
        match key {
            "$and" => Ok(Where::And(self.compile_parts(value, scope)?)),
            "$or" => Ok(Where::Or(self.compile_parts(value, scope)?)),
            "$not" => Ok(Where::not(Where::And(self.compile_parts(value, scope)?))),
            _ => {
                if let Some(operator) = Operator::from_key(key) {
                    return self.compile_comparison(operator, value, scope);
                }
                if key.starts_with('$') {
                    return Err(Error::UnknownFilterKey(key.to_string()));
                }
                self.compile_key(key, value, scope)
            }
        }
    }

    fn compile_comparison(
        &self,
        operator: Operator,
        value: &Filter,
        scope: Scope,
    ) -> Result<Where, Error> {
        match scope {
            Scope::Column { column, .. } => {
                compile_operator(operator, value, column, &self.settings)
            }
            Scope::Table(_) | Scope::Wildcard { .. } => {
                Err(Error::invalid_filter("Cannot compare at root level"))
            }
        }
    }

    /// Compile the filter below a field key.
    fn compile_key(&self, key: &str, value: &Filter, scope: Scope) -> Result<Where, Error> {
        if let Scope::Wildcard { column, children } = scope {
            // The key is data: the whole key, dots included, addresses a single column.
            let column = column(key);
            column
                .check_permission()
                .map_err(Error::PermissionDenied)?;
            let children = children.map(|build| build(key));
            return self.compile(
                value,
                Scope::Column {
                    column: &column,
                    children: children.as_ref(),
                },
            );
        }

        let definitions = scope
            .definitions()
            .ok_or_else(|| Error::UnknownFilterKey(key.to_string()))?;

        if let Some(definition) = definitions.get(key) {
            return self.compile_definition(definition, value);
        }

        // Dot syntax: `a.b.c` is `{a: {"b.c": value}}`.
        if let Some((head, rest)) = key.split_once('.') {
            if let Some(definition) = definitions.get(head) {
                let mut nested = serde_json::Map::new();
                nested.insert(rest.to_string(), value.clone());
                return self.compile_definition(definition, &serde_json::Value::Object(nested));
            }
        }

        Err(Error::UnknownFilterKey(key.to_string()))
    }

    fn compile_definition(
        &self,
        definition: &FilterDefinition,
        value: &Filter,
    ) -> Result<Where, Error> {
        match definition {
            FilterDefinition::Column {
                descriptor,
                children,
            } => {
                descriptor
                    .check_permission()
                    .map_err(Error::PermissionDenied)?;
                self.compile(
                    value,
                    Scope::Column {
                        column: descriptor,
                        children: children.as_ref(),
                    },
                )
            }
            FilterDefinition::Nested(definitions) => {
                self.compile(value, Scope::Table(definitions))
            }
            FilterDefinition::Wildcard { column, children } => self.compile(
                value,
                Scope::Wildcard {
                    column,
                    children: children.as_ref(),
                },
            ),
            FilterDefinition::Exists {
                select,
                definitions,
            } => {
                let inner = self.compile_relation(value, definitions)?;
                Ok(Where::exists(select.clone().and_where(inner)))
            }
            FilterDefinition::JoinedRelation {
                join,
                definitions,
                relation_always_exists,
            } => {
                let inner = self.compile_relation(value, definitions)?;
                Ok(Where::join(join.clone(), inner, *relation_always_exists))
            }
        }
    }

    /// Compile the filter on a related entity. `$elemMatch` is accepted as a wrapper.
    fn compile_relation(
        &self,
        value: &Filter,
        definitions: &FilterDefinitions,
    ) -> Result<Where, Error> {
        let value = value
            .as_object()
            .and_then(|object| object.get("$elemMatch"))
            .unwrap_or(value);
        if value.is_null() {
            return Ok(Where::always());
        }
        self.compile(value, Scope::Table(definitions))
    }
}
