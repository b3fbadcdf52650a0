//! # Metrics Collection
//!
//! Counters and histograms for the mutation path. Without an installed
//! recorder every call is a no-op, so library users and tests pay nothing.

use crate::config::ObservabilityConfig;
use crate::errors::{CanopyError, Result};
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Metrics recorder that tracks store metrics
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsRecorder;

impl MetricsRecorder {
    pub fn new() -> Self {
        Self
    }

    /// Record the outcome of a create/update/delete
    pub fn record_mutation(&self, resource: &'static str, operation: &'static str, outcome: &str) {
        let labels = [
            ("resource", resource.to_string()),
            ("operation", operation.to_string()),
            ("outcome", outcome.to_string()),
        ];
        counter!("canopy_mutations_total", &labels).increment(1);
    }

    /// Record a mutation rejected because maintenance mode is enabled
    pub fn record_maintenance_rejection(&self, operation: &'static str) {
        counter!("canopy_maintenance_rejections_total", "operation" => operation).increment(1);
    }

    /// Record how long a mutation waited for its parent lock
    pub fn record_lock_wait(&self, waited: Duration) {
        histogram!("canopy_lock_wait_seconds").record(waited.as_secs_f64());
    }

    /// Record a secret query and the size of its result
    pub fn record_secret_query(&self, tree: bool, remove_overridden: bool, returned: usize) {
        let labels = [("tree", tree.to_string()), ("remove_overridden", remove_overridden.to_string())];
        counter!("canopy_secret_queries_total", &labels).increment(1);
        histogram!("canopy_secret_query_results").record(returned as f64);
    }
}

/// Install the global Prometheus recorder and return the handle used to
/// render the `/metrics` endpoint.
pub fn install_prometheus_recorder(config: &ObservabilityConfig) -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .add_global_label("service", &config.service_name)
        .install_recorder()
        .map_err(|e| {
            CanopyError::config(format!("Failed to initialize metrics exporter: {}", e))
        })?;

    describe_counter!("canopy_mutations_total", "Object and secret mutations by outcome");
    describe_counter!(
        "canopy_maintenance_rejections_total",
        "Mutations rejected while maintenance mode is enabled"
    );
    describe_histogram!(
        "canopy_lock_wait_seconds",
        Unit::Seconds,
        "Time spent waiting for a per-parent mutation lock"
    );
    describe_counter!("canopy_secret_queries_total", "Secret queries by mode");
    describe_histogram!("canopy_secret_query_results", Unit::Count, "Secrets returned per query");

    Ok(handle)
}
