use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Limits applied when compiling filters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FilterSettings {
    /// The largest number of values accepted by an `$in` filter.
    #[serde(default = "max_in_values_default")]
    pub max_in_values: usize,
}

impl FilterSettings {
    pub fn is_default(&self) -> bool {
        self == &FilterSettings::default()
    }
}

impl Default for FilterSettings {
    fn default() -> FilterSettings {
        FilterSettings {
            max_in_values: max_in_values_default(),
        }
    }
}

fn max_in_values_default() -> usize {
    1000
}

/// Settings for running statements.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSettings {
    /// Rows fetched per query when iterating without a limit.
    #[serde(default = "default_batch_size_default")]
    pub default_batch_size: u64,
    /// Queries slower than this are logged as warnings (milliseconds).
    #[serde(default = "slow_query_threshold_ms_default")]
    pub slow_query_threshold_ms: u64,
    /// Sent as a `MAX_EXECUTION_TIME` optimizer hint on SELECT statements (milliseconds).
    #[serde(default)]
    pub max_execution_time_ms: Option<u64>,
}

impl ExecutionSettings {
    pub fn is_default(&self) -> bool {
        self == &ExecutionSettings::default()
    }
}

impl Default for ExecutionSettings {
    fn default() -> ExecutionSettings {
        ExecutionSettings {
            default_batch_size: default_batch_size_default(),
            slow_query_threshold_ms: slow_query_threshold_ms_default(),
            max_execution_time_ms: None,
        }
    }
}

fn default_batch_size_default() -> u64 {
    100
}
fn slow_query_threshold_ms_default() -> u64 {
    1000
}
