//! Build MySQL statements as an AST and render them to parameterized SQL.

pub mod ast;
pub mod builders;
pub mod convert;
pub mod error;
pub mod helpers;
pub mod predicate;
pub mod string;

pub use builders::WhereHelpers;
pub use convert::{delete_to_sql, select_to_sql, update_to_sql, where_to_sql, Namespaces};
pub use error::Error;
