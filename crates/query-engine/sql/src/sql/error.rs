//! Errors raised while rendering statements.

use thiserror::Error;

use super::ast::ComparisonOperator;

/// A statement that cannot be rendered to SQL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Column {0} refers to the default namespace, but none is in scope")]
    MissingDefaultNamespace(String),
    #[error("Column {0} refers to the parent namespace, but there is no enclosing statement")]
    MissingParentNamespace(String),
    #[error("A SELECT statement needs a FROM clause")]
    MissingFrom,
    #[error("An UPDATE statement needs at least one assignment")]
    UpdateWithoutAssignments,
    #[error("Cannot compare with NULL using {0:?}")]
    UnsupportedNullComparison(ComparisonOperator),
    #[error("Cannot compare with a list of values using {0:?}")]
    UnsupportedListComparison(ComparisonOperator),
    #[error("Cannot embed {0} as a string literal")]
    BackslashInLiteral(String),
}
