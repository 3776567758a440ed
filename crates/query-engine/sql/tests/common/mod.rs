use query_engine_sql::sql::{self, ast, string::SQL};

pub fn render(select: &ast::Select) -> SQL {
    sql::select_to_sql(select).unwrap()
}

/// Placeholders in the SQL text, which must line up with the params.
pub fn placeholder_count(sql: &SQL) -> usize {
    sql.sql.matches('?').count()
}
