//! Fixtures shared by the test suites of the query engine crates.

pub mod definitions;
pub mod driver;
pub mod helpers;
