//! Errors for query execution.

use thiserror::Error;

use query_engine_sql::sql;

/// Errors raised while executing a statement. Database errors are passed through unchanged.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Sql(#[from] sql::Error),
    #[error("Cannot decode row: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Refusing to {0} without a restricting WHERE clause. Use all_rows() to affect every row")]
    UnconditionedStatement(&'static str),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Cannot iterate over a query with {0}")]
    UnsupportedIteration(&'static str),
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
    #[error("Metrics error: {0}")]
    PrometheusError(#[from] prometheus::Error),
}

impl Error {
    /// A stable identifier for callers mapping errors to responses.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Database(_) => "database_error",
            Error::Sql(_) => "invalid_statement",
            Error::Decode(_) => "decode_error",
            Error::UnconditionedStatement(_) => "unconditioned_statement",
            Error::NotFound(_) => "not_found",
            Error::UnsupportedIteration(_) => "unsupported_iteration",
            Error::UnexpectedResponse(_) => "unexpected_response",
            Error::PrometheusError(_) => "metrics_error",
        }
    }
}
