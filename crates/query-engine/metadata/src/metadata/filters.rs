//! Filter definitions: which filter keys an entity accepts and what they compile to.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use query_engine_sql::sql::ast::{Join, Select};

use super::database::ColumnDescriptor;

/// Builds the column a dynamic key addresses, e.g. one entry of a JSON map column.
pub type WildcardColumn = Arc<dyn Fn(&str) -> ColumnDescriptor + Send + Sync>;

/// Builds the definitions available below a dynamic key.
pub type WildcardChildren = Arc<dyn Fn(&str) -> FilterDefinitions + Send + Sync>;

/// The filter keys of one entity, in declaration order.
#[derive(Clone, Debug, Default)]
pub struct FilterDefinitions(pub IndexMap<String, FilterDefinition>);

/// What a single filter key compiles to.
#[derive(Clone)]
pub enum FilterDefinition {
    /// A column compared with operators. Child definitions allow addressing
    /// parts of the column with dot syntax.
    Column {
        descriptor: ColumnDescriptor,
        children: Option<FilterDefinitions>,
    },
    /// A group of definitions only reachable through dot syntax or a nested object.
    Nested(FilterDefinitions),
    /// Any key is accepted; the key itself selects the column.
    Wildcard {
        column: WildcardColumn,
        children: Option<WildcardChildren>,
    },
    /// A correlated sub-select that must return at least one row matching the nested filter.
    Exists {
        select: Select,
        definitions: FilterDefinitions,
    },
    /// A relation reached through a join, filtered with its own definitions.
    JoinedRelation {
        join: Join,
        definitions: FilterDefinitions,
        relation_always_exists: bool,
    },
}

impl fmt::Debug for FilterDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterDefinition::Column {
                descriptor,
                children,
            } => f
                .debug_struct("Column")
                .field("descriptor", descriptor)
                .field("children", children)
                .finish(),
            FilterDefinition::Nested(definitions) => {
                f.debug_tuple("Nested").field(definitions).finish()
            }
            FilterDefinition::Wildcard { children, .. } => f
                .debug_struct("Wildcard")
                .field("has_children", &children.is_some())
                .finish_non_exhaustive(),
            FilterDefinition::Exists {
                select,
                definitions,
            } => f
                .debug_struct("Exists")
                .field("select", select)
                .field("definitions", definitions)
                .finish(),
            FilterDefinition::JoinedRelation {
                join,
                definitions,
                relation_always_exists,
            } => f
                .debug_struct("JoinedRelation")
                .field("join", join)
                .field("definitions", definitions)
                .field("relation_always_exists", relation_always_exists)
                .finish(),
        }
    }
}

impl FilterDefinition {
    pub fn column(descriptor: ColumnDescriptor) -> FilterDefinition {
        FilterDefinition::Column {
            descriptor,
            children: None,
        }
    }

    pub fn column_with_children(
        descriptor: ColumnDescriptor,
        children: FilterDefinitions,
    ) -> FilterDefinition {
        FilterDefinition::Column {
            descriptor,
            children: Some(children),
        }
    }

    pub fn nested(definitions: FilterDefinitions) -> FilterDefinition {
        FilterDefinition::Nested(definitions)
    }

    pub fn wildcard(
        column: impl Fn(&str) -> ColumnDescriptor + Send + Sync + 'static,
    ) -> FilterDefinition {
        FilterDefinition::Wildcard {
            column: Arc::new(column),
            children: None,
        }
    }

    pub fn wildcard_with_children(
        column: impl Fn(&str) -> ColumnDescriptor + Send + Sync + 'static,
        children: impl Fn(&str) -> FilterDefinitions + Send + Sync + 'static,
    ) -> FilterDefinition {
        FilterDefinition::Wildcard {
            column: Arc::new(column),
            children: Some(Arc::new(children)),
        }
    }

    pub fn exists(select: Select, definitions: FilterDefinitions) -> FilterDefinition {
        FilterDefinition::Exists {
            select,
            definitions,
        }
    }

    /// A joined relation that exists for every row, so the join can be skipped
    /// when the nested filter is empty.
    pub fn joined_relation(join: Join, definitions: FilterDefinitions) -> FilterDefinition {
        FilterDefinition::JoinedRelation {
            join,
            definitions,
            relation_always_exists: true,
        }
    }

    /// A joined relation that may be missing. Its join is kept even for an empty nested
    /// filter, since an inner join still removes rows.
    pub fn optional_joined_relation(join: Join, definitions: FilterDefinitions) -> FilterDefinition {
        FilterDefinition::JoinedRelation {
            join,
            definitions,
            relation_always_exists: false,
        }
    }

    /// Definitions reachable below this key with dot syntax, if any.
    pub fn children(&self, key: &str) -> Option<FilterDefinitions> {
        match self {
            FilterDefinition::Column { children, .. } => children.clone(),
            FilterDefinition::Nested(definitions)
            | FilterDefinition::Exists { definitions, .. }
            | FilterDefinition::JoinedRelation { definitions, .. } => Some(definitions.clone()),
            FilterDefinition::Wildcard { children, .. } => {
                children.as_ref().map(|build| build(key))
            }
        }
    }
}

impl FilterDefinitions {
    pub fn new() -> FilterDefinitions {
        FilterDefinitions::default()
    }

    /// Add a key. Declaration order is kept.
    #[must_use]
    pub fn with(mut self, key: &str, definition: FilterDefinition) -> FilterDefinitions {
        self.0.insert(key.to_string(), definition);
        self
    }

    pub fn get(&self, key: &str) -> Option<&FilterDefinition> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ValueType;
    use query_engine_sql::sql::helpers::column;

    #[test]
    fn wildcard_children_are_built_from_the_key() {
        let definition = FilterDefinition::wildcard_with_children(
            |key| ColumnDescriptor::new(column(key), ValueType::String),
            |key| {
                FilterDefinitions::new().with(
                    key,
                    FilterDefinition::column(ColumnDescriptor::new(column(key), ValueType::Number)),
                )
            },
        );
        let children = definition.children("nl").unwrap();
        assert!(children.get("nl").is_some());
        assert!(children.get("en").is_none());
    }

    #[test]
    fn keys_keep_declaration_order() {
        let definitions = FilterDefinitions::new()
            .with(
                "b",
                FilterDefinition::column(ColumnDescriptor::new(column("b"), ValueType::String)),
            )
            .with(
                "a",
                FilterDefinition::column(ColumnDescriptor::new(column("a"), ValueType::String)),
            );
        let keys: Vec<&str> = definitions.0.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }
}
