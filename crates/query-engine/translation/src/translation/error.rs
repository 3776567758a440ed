//! Errors for filter and sort translation.

use thiserror::Error;

/// A type for translation errors.
///
/// Every variant carries enough context (the offending key or a message) for a caller to
/// turn it into a user facing response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("{0}")]
    InvalidFilter(String),
    #[error("Unknown filter {0}")]
    UnknownFilterKey(String),
    #[error("{0}")]
    PermissionDenied(String),
    #[error("Unknown sort key {0}")]
    UnknownSortKey(String),
    #[error("Sorting is required")]
    EmptySort,
    #[error("Sorting on {0} requires a join that conflicts with an existing join on the same table")]
    SorterJoinConflict(String),
}

impl Error {
    pub(crate) fn invalid_filter(message: impl Into<String>) -> Error {
        Error::InvalidFilter(message.into())
    }

    /// A stable machine readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidFilter(_) => "invalid_filter",
            Error::UnknownFilterKey(_) => "unknown_filter_key",
            Error::PermissionDenied(_) => "permission_denied",
            Error::UnknownSortKey(_) => "unknown_sort_key",
            Error::EmptySort => "empty_sort",
            Error::SorterJoinConflict(_) => "sorter_join_conflict",
        }
    }
}
