//! Run statements through a driver.
//!
//! Statements whose WHERE never holds are answered without touching the database. UPDATE and
//! DELETE refuse to run when their WHERE is missing or always holds, which is what an empty
//! filter compiles to; call `all_rows()` on the statement to affect every row on purpose.

use std::future::Future;
use std::time::Instant;

use futures_util::stream::{self, Stream, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use tracing::{info_span, Instrument};

use query_engine_configuration::{Configuration, ExecutionSettings};
use query_engine_metadata::metadata::Row;
use query_engine_sql::sql::ast::{Alwaysness, Delete, Expression, Select, Update, Value, Where};
use query_engine_sql::sql::string::SQL;
use query_engine_sql::sql::{self, helpers, WhereHelpers};

use crate::driver::Driver;
use crate::error::Error;
use crate::metrics::Metrics;
use crate::mysql::MySqlDriver;

/// The column keyset iteration pages on.
const ID_COLUMN: &str = "id";
/// The alias of aggregate results.
const AGGREGATE_ALIAS: &str = "c";

/// Options of keyset iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IterateOptions {
    /// Stop after this many queries, even if more rows remain.
    pub max_queries: Option<usize>,
}

/// Executes statements built with the sql crate.
#[derive(Debug)]
pub struct Executor<D> {
    driver: D,
    settings: ExecutionSettings,
    metrics: Option<Metrics>,
}

impl Executor<MySqlDriver> {
    /// Connect to the database of the configuration.
    pub async fn connect(configuration: &Configuration) -> Result<Executor<MySqlDriver>, Error> {
        let driver = MySqlDriver::connect(configuration).await?;
        Ok(Executor::new(driver, configuration.execution_settings.clone()))
    }
}

impl<D: Driver> Executor<D> {
    pub fn new(driver: D, settings: ExecutionSettings) -> Executor<D> {
        Executor {
            driver,
            settings,
            metrics: None,
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Executor<D> {
        self.metrics = Some(metrics);
        self
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn settings(&self) -> &ExecutionSettings {
        &self.settings
    }

    /// Run the select and pass every row through `transform`.
    pub async fn fetch<T>(
        &self,
        select: &Select,
        transform: impl FnMut(Row) -> Result<T, Error>,
    ) -> Result<Vec<T>, Error> {
        let rows = self.fetch_rows(select).await?;
        rows.into_iter().map(transform).collect()
    }

    /// Run the select and deserialize every row.
    pub async fn fetch_as<T: DeserializeOwned>(&self, select: &Select) -> Result<Vec<T>, Error> {
        self.fetch(select, deserialize_row).await
    }

    /// Run the select and return the raw rows.
    pub async fn fetch_rows(&self, select: &Select) -> Result<Vec<Row>, Error> {
        if select.where_alwaysness() == Alwaysness::Never {
            self.short_circuit("select");
            return Ok(vec![]);
        }
        let select = self.with_hint(select);
        let query = sql::select_to_sql(&select)?;
        self.timed("select", &query, self.driver.select(&query))
            .instrument(info_span!("Execute select"))
            .await
    }

    /// The first row of the select. When `required`, no row is an error naming the table.
    pub async fn first<T>(
        &self,
        select: &Select,
        required: bool,
        mut transform: impl FnMut(Row) -> Result<T, Error>,
    ) -> Result<Option<T>, Error> {
        let rows = self.fetch_rows(&select.clone().limit(1)).await?;
        match rows.into_iter().next() {
            Some(row) => transform(row).map(Some),
            None if required => Err(Error::NotFound(
                select
                    .from
                    .as_ref()
                    .map_or("Row", |from| from.namespace())
                    .to_string(),
            )),
            None => Ok(None),
        }
    }

    /// Count the rows of the select, or the non-null values of `expression`. Ordering and
    /// limits of the select are ignored.
    pub async fn count(
        &self,
        select: &Select,
        expression: Option<Expression>,
    ) -> Result<u64, Error> {
        if select.where_alwaysness() == Alwaysness::Never {
            self.short_circuit("count");
            return Ok(0);
        }
        let counted = match expression {
            Some(expression) => helpers::count(expression),
            None => helpers::count_star(),
        };
        let rows = self.fetch_rows(&aggregate(select, counted)).await?;
        let value = read_aggregate(&rows, "count");
        match value.as_ref().and_then(serde_json::Value::as_u64) {
            Some(count) => Ok(count),
            None => {
                tracing::warn!(rows = ?rows, "Invalid count SQL response");
                Ok(0)
            }
        }
    }

    /// Sum `expression` over the rows of the select. No rows sum to 0.
    pub async fn sum(&self, select: &Select, expression: Expression) -> Result<f64, Error> {
        if select.where_alwaysness() == Alwaysness::Never {
            self.short_circuit("sum");
            return Ok(0.0);
        }
        let summed = helpers::function(sql::ast::Function::Sum, vec![expression]);
        let rows = self.fetch_rows(&aggregate(select, summed)).await?;
        let sum = match read_aggregate(&rows, "sum") {
            Some(serde_json::Value::Null) => Some(0.0),
            Some(serde_json::Value::Number(n)) => n.as_f64(),
            Some(serde_json::Value::String(s)) => s.parse::<f64>().ok(),
            _ => None,
        };
        match sum {
            Some(sum) => Ok(sum),
            None => {
                tracing::warn!(rows = ?rows, "Invalid sum SQL response");
                Ok(0.0)
            }
        }
    }

    /// Run the update and return the number of changed rows.
    pub async fn update(&self, update: &Update) -> Result<u64, Error> {
        let query = sql::update_to_sql(update)?;
        match guard(update.where_ref(), update.all_rows) {
            Guard::Refuse => Err(Error::UnconditionedStatement("update")),
            Guard::Skip => {
                self.short_circuit("update");
                Ok(0)
            }
            Guard::Run => {
                self.timed("update", &query, self.driver.update(&query))
                    .instrument(info_span!("Execute update"))
                    .await
            }
        }
    }

    /// Run the delete and return the number of deleted rows.
    pub async fn delete(&self, delete: &Delete) -> Result<u64, Error> {
        let query = sql::delete_to_sql(delete)?;
        match guard(delete.where_ref(), delete.all_rows) {
            Guard::Refuse => Err(Error::UnconditionedStatement("delete")),
            Guard::Skip => {
                self.short_circuit("delete");
                Ok(0)
            }
            Guard::Run => {
                self.timed("delete", &query, self.driver.delete(&query))
                    .instrument(info_span!("Execute delete"))
                    .await
            }
        }
    }

    /// Every row of the select, fetched page by page in `id` order.
    ///
    /// The page size is the limit of the select, or the configured default batch size. A
    /// select with its own ORDER BY or OFFSET cannot be iterated; the error is the first item
    /// of the stream. Dropping the stream stops fetching.
    pub fn all(
        &self,
        select: Select,
        options: IterateOptions,
    ) -> impl Stream<Item = Result<Row, Error>> + Send + '_ {
        self.all_batched(select, options)
            .map_ok(|rows| stream::iter(rows.into_iter().map(Ok)))
            .try_flatten()
    }

    /// Like `all`, but yields whole pages.
    pub fn all_batched(
        &self,
        select: Select,
        options: IterateOptions,
    ) -> impl Stream<Item = Result<Vec<Row>, Error>> + Send + '_ {
        let pages = self.pages(select);
        stream::try_unfold(Some(pages), move |state| async move {
            let mut pages = match state {
                None => return Ok(None),
                Some(Err(error)) => return Err(error),
                Some(Ok(pages)) => pages,
            };
            let Some(next) = pages.next.take() else {
                return Ok(None);
            };
            if options
                .max_queries
                .is_some_and(|max_queries| pages.queries >= max_queries)
            {
                tracing::debug!(queries = pages.queries, "stopping iteration early");
                return Ok(None);
            }

            let rows = self.fetch_rows(&next).await?;
            pages.queries += 1;
            if rows.is_empty() {
                return Ok(None);
            }
            if u64::try_from(rows.len()).unwrap_or(u64::MAX) >= pages.limit {
                let last_id = last_id(&rows)?;
                pages.next = Some(
                    pages
                        .base
                        .clone()
                        .and_where(Where::gt(helpers::column(ID_COLUMN), last_id)),
                );
            }
            Ok(Some((rows, Some(Ok(pages)))))
        })
        .boxed()
    }

    fn pages(&self, select: Select) -> Result<Pages, Error> {
        if !select.order_by.elements.is_empty() {
            return Err(Error::UnsupportedIteration(
                "a custom ORDER BY, results are ordered by id",
            ));
        }
        if select.limit.offset.is_some() {
            return Err(Error::UnsupportedIteration("an OFFSET"));
        }
        let limit = select
            .limit
            .limit
            .unwrap_or(self.settings.default_batch_size);
        let base = select
            .limit(limit)
            .order_by(helpers::asc(helpers::column(ID_COLUMN)));
        Ok(Pages {
            next: Some(base.clone()),
            base,
            limit,
            queries: 0,
        })
    }

    fn with_hint(&self, select: &Select) -> Select {
        match self.settings.max_execution_time_ms {
            Some(milliseconds) if select.max_execution_time.is_none() => {
                select.clone().max_execution_time(milliseconds)
            }
            _ => select.clone(),
        }
    }

    fn short_circuit(&self, statement: &'static str) {
        tracing::debug!(statement, "WHERE never holds, the database is not queried");
        if let Some(metrics) = &self.metrics {
            metrics.short_circuit_total.inc();
        }
    }

    /// Log and time a statement.
    async fn timed<T>(
        &self,
        statement: &'static str,
        query: &SQL,
        execution: impl Future<Output = Result<T, Error>>,
    ) -> Result<T, Error> {
        tracing::info!(generated_sql = query.sql, params = ?&query.params);

        let start = Instant::now();
        let result = execution.await;
        let elapsed = start.elapsed();
        let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

        let slow = duration_ms >= self.settings.slow_query_threshold_ms;
        if slow {
            tracing::warn!(
                statement,
                generated_sql = query.sql,
                duration_ms,
                "slow query"
            );
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_query(elapsed, slow);
        }
        result
    }
}

/// What the guard of UPDATE and DELETE decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Guard {
    Run,
    Skip,
    Refuse,
}

/// A WHERE that never holds skips the statement. A missing WHERE, or one that always holds,
/// needs `all_rows`.
fn guard(where_: Option<&Where>, all_rows: bool) -> Guard {
    match where_.map_or(Alwaysness::Always, Where::alwaysness) {
        Alwaysness::Never => Guard::Skip,
        Alwaysness::Always if !all_rows => Guard::Refuse,
        _ => Guard::Run,
    }
}

/// State of keyset iteration.
struct Pages {
    base: Select,
    limit: u64,
    next: Option<Select>,
    queries: usize,
}

fn deserialize_row<T: DeserializeOwned>(row: Row) -> Result<T, Error> {
    Ok(serde_json::from_value(serde_json::Value::Object(row))?)
}

/// The select with its columns replaced by the aggregate.
fn aggregate(select: &Select, expression: Expression) -> Select {
    select
        .clone()
        .columns(vec![helpers::aliased(expression, AGGREGATE_ALIAS)])
        .clear_order_by()
        .clear_limit()
}

fn read_aggregate(rows: &[Row], aggregate: &str) -> Option<serde_json::Value> {
    match rows {
        [row] => row.get(AGGREGATE_ALIAS).cloned(),
        _ => {
            tracing::debug!(aggregate, rows = rows.len(), "expected a single aggregate row");
            None
        }
    }
}

fn last_id(rows: &[Row]) -> Result<Value, Error> {
    match rows.last().and_then(|row| row.get(ID_COLUMN)) {
        Some(serde_json::Value::String(id)) => Ok(Value::String(id.clone())),
        Some(serde_json::Value::Number(id)) if id.is_i64() => id
            .as_i64()
            .map(Value::Integer)
            .ok_or_else(missing_id),
        _ => Err(missing_id()),
    }
}

fn missing_id() -> Error {
    Error::UnexpectedResponse("Cannot iterate without a string or integer id column".to_string())
}
