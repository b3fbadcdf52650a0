//! # Structured Logging
//!
//! Subscriber setup and span helpers built on the tracing ecosystem.
//! `RUST_LOG` takes precedence over the configured log level when set.

use crate::config::{AppConfig, ObservabilityConfig};
use crate::errors::{CanopyError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Create a tracing span for a store operation.
///
/// ```rust,ignore
/// let span = db_span!("insert_secret", parent_id = %parent_id);
/// ```
#[macro_export]
macro_rules! db_span {
    ($operation:expr) => {
        tracing::debug_span!(
            "db_operation",
            operation = %$operation,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
    ($operation:expr, $($field:tt)*) => {
        tracing::debug_span!(
            "db_operation",
            operation = %$operation,
            operation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Install the global subscriber.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| CanopyError::config(format!("Invalid log level: {}", e)))?;

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json_logging {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer().with_target(true)).try_init()
    };

    result.map_err(|e| {
        CanopyError::internal_with_source("Failed to install tracing subscriber", Box::new(e))
    })
}

/// Log configuration at startup
pub fn log_config_info(config: &AppConfig) {
    tracing::info!(
        service_name = %config.observability.service_name,
        server_address = %config.server.bind_address(),
        database_type = "sqlite",
        lock_acquire_timeout_secs = config.locks.acquire_timeout_seconds,
        start_in_maintenance = config.server.start_in_maintenance,
        "Canopy configuration store configuration"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macros_compile() {
        let _span = db_span!("insert_secret");
        let _span = db_span!("insert_secret", parent_id = "pg-1");
    }

    #[test]
    fn test_log_config_info() {
        let config = AppConfig::default();
        log_config_info(&config);
    }

    #[test]
    fn test_init_logging_rejects_invalid_filter() {
        // A RUST_LOG set by the caller would mask the configured level
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = ObservabilityConfig { log_level: "info,[".to_string(), ..Default::default() };
        assert!(init_logging(&config).is_err());
    }
}
