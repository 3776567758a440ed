//! Translate the external filter and sort grammars into the SQL AST.

pub mod error;
pub mod filtering;
mod operators;
pub mod sorting;
pub mod values;

pub use error::Error;
pub use filtering::{compile_filter, compile_filter_with, Filter, FilterOptions};
pub use sorting::{apply_sorter, assert_sort, compare_rows, page_filter};
