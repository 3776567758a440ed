//! Run statements on a MySQL connection pool with sqlx.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use sqlx::mysql::{MySqlArguments, MySqlPoolOptions, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, MySql, Pool, Row as _, TypeInfo};
use tracing::{info_span, Instrument};

use query_engine_configuration::Configuration;
use query_engine_metadata::metadata::Row;
use query_engine_sql::sql::string::{Param, SQL};

use crate::driver::Driver;
use crate::error::Error;

/// A driver backed by a sqlx MySQL pool.
#[derive(Debug, Clone)]
pub struct MySqlDriver {
    pool: Pool<MySql>,
}

impl MySqlDriver {
    /// Connect using the connection URI and pool settings of the configuration.
    pub async fn connect(configuration: &Configuration) -> Result<MySqlDriver, Error> {
        let settings = &configuration.pool_settings;
        let pool = MySqlPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(settings.pool_timeout))
            .idle_timeout(settings.idle_timeout.map(Duration::from_secs))
            .max_lifetime(settings.connection_lifetime.map(Duration::from_secs))
            .connect(&configuration.connection_uri)
            .instrument(info_span!("Connect to MySQL"))
            .await?;
        Ok(MySqlDriver { pool })
    }

    pub fn from_pool(pool: Pool<MySql>) -> MySqlDriver {
        MySqlDriver { pool }
    }

    pub fn pool(&self) -> &Pool<MySql> {
        &self.pool
    }

    async fn execute(&self, query: &SQL) -> Result<u64, Error> {
        let result = bind_params(sqlx::query(&query.sql), &query.params)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl Driver for MySqlDriver {
    async fn select(&self, query: &SQL) -> Result<Vec<Row>, Error> {
        let rows = bind_params(sqlx::query(&query.sql), &query.params)
            .fetch(&self.pool)
            .map_err(Error::from)
            .and_then(|row| async move { row_to_json(&row) })
            .try_collect::<Vec<Row>>()
            .await?;
        Ok(rows)
    }

    async fn update(&self, query: &SQL) -> Result<u64, Error> {
        self.execute(query).await
    }

    async fn delete(&self, query: &SQL) -> Result<u64, Error> {
        self.execute(query).await
    }
}

/// Bind our parameters to a sqlx query, in placeholder order.
fn bind_params<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &'q [Param],
) -> Query<'q, MySql, MySqlArguments> {
    for param in params {
        query = match param {
            Param::Integer(i) => query.bind(*i),
            Param::Float(f) => query.bind(*f),
            Param::Boolean(b) => query.bind(*b),
            Param::String(s) => query.bind(s.as_str()),
            Param::DateTime(timestamp) => query.bind(*timestamp),
            Param::Json(json) => query.bind(json),
        };
    }
    query
}

/// Decode a row into a JSON object, choosing the decoding by the reported column type.
/// Timestamps become RFC 3339 strings and decimals become numbers.
fn row_to_json(row: &MySqlRow) -> Result<Row, Error> {
    let columns = row.columns().iter().map(|column| {
        let value = column_to_json(row, column.ordinal(), column.type_info().name())?;
        Ok::<_, Error>((column.name().to_string(), value))
    });
    collect_row(columns)
}

/// Rows are keyed by column name, so a name may appear only once. Alias the columns of
/// joined tables that share a name with the base table.
fn collect_row(
    columns: impl IntoIterator<Item = Result<(String, serde_json::Value), Error>>,
) -> Result<Row, Error> {
    let mut object = Row::new();
    for column in columns {
        let (name, value) = column?;
        if object.contains_key(&name) {
            return Err(Error::UnexpectedResponse(format!(
                "Column {name} appears more than once in the result"
            )));
        }
        object.insert(name, value);
    }
    Ok(object)
}

fn column_to_json(
    row: &MySqlRow,
    index: usize,
    type_name: &str,
) -> Result<serde_json::Value, Error> {
    let value = match type_name {
        "NULL" => serde_json::Value::Null,
        "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)?
            .map_or(serde_json::Value::Null, serde_json::Value::Bool),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)?
            .map_or(serde_json::Value::Null, serde_json::Value::from),
        name if name.ends_with("UNSIGNED") => row
            .try_get::<Option<u64>, _>(index)?
            .map_or(serde_json::Value::Null, serde_json::Value::from),
        "YEAR" => row
            .try_get_unchecked::<Option<u64>, _>(index)?
            .map_or(serde_json::Value::Null, serde_json::Value::from),
        "FLOAT" | "DOUBLE" => row
            .try_get::<Option<f64>, _>(index)?
            .and_then(serde_json::Number::from_f64)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        "DECIMAL" => match row.try_get_unchecked::<Option<String>, _>(index)? {
            None => serde_json::Value::Null,
            Some(decimal) => decimal
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map_or(serde_json::Value::String(decimal), serde_json::Value::Number),
        },
        "DATETIME" | "TIMESTAMP" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)?
            .map_or(serde_json::Value::Null, |timestamp| {
                serde_json::Value::String(timestamp.to_rfc3339())
            }),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(index)?
            .map_or(serde_json::Value::Null, |date| {
                serde_json::Value::String(date.to_string())
            }),
        "JSON" => row
            .try_get::<Option<serde_json::Value>, _>(index)?
            .unwrap_or(serde_json::Value::Null),
        _ => row
            .try_get_unchecked::<Option<String>, _>(index)?
            .map_or(serde_json::Value::Null, serde_json::Value::String),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn column(name: &str, value: serde_json::Value) -> Result<(String, serde_json::Value), Error> {
        Ok((name.to_string(), value))
    }

    #[test]
    fn columns_keep_their_order() {
        let row = collect_row([column("id", json!(1)), column("name", json!("Ann"))]).unwrap();
        assert_eq!(
            serde_json::Value::Object(row),
            json!({"id": 1, "name": "Ann"})
        );
    }

    #[test]
    fn repeated_column_names_are_rejected() {
        let error = collect_row([
            column("id", json!(1)),
            column("name", json!("Ann")),
            column("id", json!(7)),
        ])
        .unwrap_err();
        assert_eq!(error.code(), "unexpected_response");
        assert_eq!(
            error.to_string(),
            "Unexpected response: Column id appears more than once in the result"
        );
    }
}
