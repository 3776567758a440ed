//! The database primitives statements are executed with.

use async_trait::async_trait;

use query_engine_metadata::metadata::Row;
use query_engine_sql::sql::string::SQL;

use crate::error::Error;

/// Runs rendered statements. Parameters are bound in placeholder order.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Run a SELECT and return its rows, keyed by column name.
    async fn select(&self, query: &SQL) -> Result<Vec<Row>, Error>;

    /// Run an UPDATE and return the number of changed rows.
    async fn update(&self, query: &SQL) -> Result<u64, Error>;

    /// Run a DELETE and return the number of deleted rows.
    async fn delete(&self, query: &SQL) -> Result<u64, Error>;
}

#[async_trait]
impl<D: Driver + ?Sized> Driver for std::sync::Arc<D> {
    async fn select(&self, query: &SQL) -> Result<Vec<Row>, Error> {
        (**self).select(query).await
    }

    async fn update(&self, query: &SQL) -> Result<u64, Error> {
        (**self).update(query).await
    }

    async fn delete(&self, query: &SQL) -> Result<u64, Error> {
        (**self).delete(query).await
    }
}
