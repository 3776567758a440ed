#![allow(dead_code)]

use query_engine_sql::sql::{self, ast::Where, string::SQL};
use query_engine_translation::translation::{self, Filter};
use tests_common::definitions::user_filters;

/// Render a predicate the way it is embedded in a statement on the `default` table.
pub fn render(predicate: &Where) -> SQL {
    sql::where_to_sql(predicate, "default").unwrap()
}

/// Compile a filter on the sample `users` table.
pub fn compile(filter: &Filter) -> Where {
    translation::compile_filter(filter, &user_filters()).unwrap()
}

pub fn compile_sql(filter: &Filter) -> SQL {
    render(&compile(filter))
}

pub fn compile_error(filter: &Filter) -> translation::Error {
    translation::compile_filter(filter, &user_filters()).unwrap_err()
}

/// The SQL text followed by the numbered parameters.
pub fn snapshot(query: &SQL) -> String {
    let params: Vec<(usize, &sql::string::Param)> = query
        .params
        .iter()
        .enumerate()
        .map(|(i, p)| (i + 1, p))
        .collect();
    format!("{}\n\n{:?}", query.sql, params)
}
