//! Metrics setup and update for query execution.

use std::time::Duration;

use prometheus::core::{AtomicU64, GenericCounter};
use prometheus::Histogram;

use crate::error::Error;

#[derive(Debug, Clone)]
pub struct Metrics {
    pub query_total: GenericCounter<AtomicU64>,
    pub short_circuit_total: GenericCounter<AtomicU64>,
    pub slow_query_total: GenericCounter<AtomicU64>,
    pub query_duration: Histogram,
}

/// Create a new int counter metric and register it with the provided Prometheus Registry
fn add_int_counter_metric(
    metrics_registry: &mut prometheus::Registry,
    metric_name: &str,
    metric_description: &str,
) -> Result<GenericCounter<AtomicU64>, Error> {
    let int_counter =
        prometheus::IntCounter::with_opts(prometheus::Opts::new(metric_name, metric_description))?;
    metrics_registry.register(Box::new(int_counter.clone()))?;
    Ok(int_counter)
}

/// Create a new histogram metric and register it with the provided Prometheus Registry
fn add_histogram_metric(
    metrics_registry: &mut prometheus::Registry,
    metric_name: &str,
    metric_description: &str,
) -> Result<Histogram, Error> {
    let histogram = Histogram::with_opts(prometheus::HistogramOpts::new(
        metric_name,
        metric_description,
    ))?;
    metrics_registry.register(Box::new(histogram.clone()))?;
    Ok(histogram)
}

/// Setup counters and histograms used to produce Prometheus metrics
pub fn initialise_metrics(metrics_registry: &mut prometheus::Registry) -> Result<Metrics, Error> {
    let query_total = add_int_counter_metric(
        metrics_registry,
        "mysql_query_total",
        "Total statements sent to the database.",
    )?;

    let short_circuit_total = add_int_counter_metric(
        metrics_registry,
        "mysql_short_circuit_total",
        "Total statements answered without the database because their WHERE never holds.",
    )?;

    let slow_query_total = add_int_counter_metric(
        metrics_registry,
        "mysql_slow_query_total",
        "Total statements slower than the configured threshold.",
    )?;

    let query_duration = add_histogram_metric(
        metrics_registry,
        "mysql_query_duration_seconds",
        "Time spent running statements, in seconds.",
    )?;

    Ok(Metrics {
        query_total,
        short_circuit_total,
        slow_query_total,
        query_duration,
    })
}

impl Metrics {
    /// Record a statement that reached the database.
    pub fn record_query(&self, duration: Duration, slow: bool) {
        self.query_total.inc();
        self.query_duration.observe(duration.as_secs_f64());
        if slow {
            self.slow_query_total.inc();
        }
    }
}
