//! Configuration for the query engine.

use crate::values::{ExecutionSettings, FilterSettings, PoolSettings};

/// The 'Configuration' type collects all the information necessary to run queries at runtime.
///
/// Values of this type are produced from a 'ParsedConfiguration' using
/// 'make_runtime_configuration', which resolves secrets from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub connection_uri: String,
    pub pool_settings: PoolSettings,
    pub filter_settings: FilterSettings,
    pub execution_settings: ExecutionSettings,
}
