//! Per-entity definitions binding the filter and sort grammars to SQL expressions.

pub mod database;
pub mod filters;
pub mod sorting;

// re-export without modules
pub use database::*;
pub use filters::*;
pub use sorting::*;
