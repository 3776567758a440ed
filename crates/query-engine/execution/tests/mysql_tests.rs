//! Checks against a live MySQL database. Set `MYSQL_DATABASE_URL` and run with `--ignored`.

use std::cmp::Ordering;

use query_engine_configuration::environment::ProcessEnvironment;
use query_engine_configuration::{make_runtime_configuration, ParsedConfiguration};
use query_engine_execution::{Executor, MySqlDriver};
use query_engine_metadata::metadata::{Row, SortDefinition, SortDefinitions, SortItem};
use query_engine_sql::sql::helpers::{select, table};
use query_engine_translation::translation::{apply_sorter, compare_rows};
use similar_asserts::assert_eq;

const TABLE: &str = "query_engine_sort_check";

async fn connect() -> anyhow::Result<Executor<MySqlDriver>> {
    let configuration =
        make_runtime_configuration(ParsedConfiguration::initial(), ProcessEnvironment)?;
    Ok(Executor::connect(&configuration).await?)
}

fn ids(rows: &[Row]) -> Vec<Option<i64>> {
    rows.iter()
        .map(|row| row.get("id").and_then(serde_json::Value::as_i64))
        .collect()
}

#[tokio::test]
#[ignore = "needs a MySQL database in MYSQL_DATABASE_URL"]
async fn in_memory_order_matches_the_database() -> anyhow::Result<()> {
    let executor = connect().await?;
    let pool = executor.driver().pool();

    sqlx::query(&format!("DROP TABLE IF EXISTS `{TABLE}`"))
        .execute(pool)
        .await?;
    sqlx::query(&format!(
        "CREATE TABLE `{TABLE}` (id INT PRIMARY KEY, name VARCHAR(50) NULL, price DOUBLE NOT NULL)"
    ))
    .execute(pool)
    .await?;
    sqlx::query(&format!(
        "INSERT INTO `{TABLE}` (id, name, price) VALUES \
         (1, 'bob', 3), (2, NULL, 1), (3, 'ann', 2), (4, 'Ann', 2), (5, 'Carl', 1), (6, NULL, 4)"
    ))
    .execute(pool)
    .await?;

    let sorters = SortDefinitions::new()
        .with("id", SortDefinition::column("id"))
        .with("name", SortDefinition::column("name"))
        .with("price", SortDefinition::column("price"));
    let sort = [
        SortItem::asc("name"),
        SortItem::desc("price"),
        SortItem::asc("id"),
    ];

    let query = apply_sorter(select(table(TABLE)), &sort, &sorters)?;
    let from_database = executor.fetch_rows(&query).await?;

    let mut in_memory = from_database.clone();
    in_memory.reverse();
    in_memory.sort_by(|a, b| compare_rows(a, b, &sort, &sorters).unwrap_or(Ordering::Equal));

    sqlx::query(&format!("DROP TABLE `{TABLE}`"))
        .execute(pool)
        .await?;

    assert_eq!(ids(&in_memory), ids(&from_database));
    assert_eq!(ids(&from_database)[0], Some(6));
    Ok(())
}
