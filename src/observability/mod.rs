//! # Observability Infrastructure
//!
//! Structured logging through `tracing` and mutation metrics through the
//! `metrics` facade, exported in Prometheus text format.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, log_config_info};
pub use metrics::{install_prometheus_recorder, MetricsRecorder};
