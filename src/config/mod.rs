//! # Configuration Management
//!
//! Layered configuration for the Canopy configuration store: built-in
//! defaults, then an optional configuration file, then `CANOPY_*`
//! environment variables (nested keys separated by `__`, e.g.
//! `CANOPY_SERVER__PORT=4002`).

pub mod settings;

pub use settings::{AppConfig, DatabaseConfig, LockConfig, ObservabilityConfig, ServerConfig};

use crate::errors::Result;
use std::path::Path;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "CANOPY";

impl AppConfig {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let defaults = config::Config::try_from(&AppConfig::default())?;

        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[server]\nport = 9911\n\n[database]\nurl = \"sqlite://./data/other.db\"\n\n[locks]\nacquire_timeout_seconds = 2"
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 9911);
        assert_eq!(config.database.url, "sqlite://./data/other.db");
        assert_eq!(config.locks.acquire_timeout_seconds, 2);
        // Untouched sections keep their defaults
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[database]\nurl = \"mysql://localhost/canopy\"").unwrap();

        assert!(AppConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(AppConfig::load(Some(Path::new("/nonexistent/canopy.toml"))).is_err());
    }
}
