//! Query execution against a MySQL database.

pub mod driver;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod mysql;

pub use driver::Driver;
pub use error::Error;
pub use executor::{Executor, IterateOptions};
pub use mysql::MySqlDriver;
