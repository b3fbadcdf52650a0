//! Maintenance mode
//!
//! While enabled, every mutation is rejected before it touches the store.
//! Reads stay available.

use std::sync::Mutex;

use crate::errors::{CanopyError, Result};

/// Process-wide maintenance switch, shared by handle
#[derive(Debug, Default)]
pub struct MaintenanceMode {
    enabled: Mutex<bool>,
}

impl MaintenanceMode {
    pub fn new(enabled: bool) -> Self {
        Self { enabled: Mutex::new(enabled) }
    }

    pub fn is_enabled(&self) -> Result<bool> {
        let enabled = self
            .enabled
            .lock()
            .map_err(|_| CanopyError::internal("Maintenance mode lock poisoned"))?;
        Ok(*enabled)
    }

    /// Set the flag and return the previous value
    pub fn set(&self, enabled: bool) -> Result<bool> {
        let mut current = self
            .enabled
            .lock()
            .map_err(|_| CanopyError::internal("Maintenance mode lock poisoned"))?;
        let previous = std::mem::replace(&mut *current, enabled);
        if previous != enabled {
            tracing::warn!(enabled, "Maintenance mode changed");
        }
        Ok(previous)
    }

    /// Fail with `Maintenance` when mutations are not allowed
    pub fn ensure_writable(&self) -> Result<()> {
        if self.is_enabled()? {
            return Err(CanopyError::maintenance("maintenance mode is enabled"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use tracing_test::traced_test;

    #[test]
    fn test_toggle() {
        let mode = MaintenanceMode::default();
        assert!(!mode.is_enabled().unwrap());
        assert!(mode.ensure_writable().is_ok());

        assert!(!mode.set(true).unwrap());
        assert!(mode.is_enabled().unwrap());
        assert_eq!(mode.ensure_writable().unwrap_err().kind(), ErrorKind::Unavailable);

        assert!(mode.set(false).unwrap());
        assert!(mode.ensure_writable().is_ok());
    }

    #[test]
    fn test_instances_are_independent() {
        let a = MaintenanceMode::new(true);
        let b = MaintenanceMode::new(false);
        assert!(a.is_enabled().unwrap());
        assert!(!b.is_enabled().unwrap());
    }

    #[test]
    #[traced_test]
    fn test_change_is_logged() {
        let mode = MaintenanceMode::default();
        mode.set(true).unwrap();
        assert!(logs_contain("Maintenance mode changed"));
        assert!(mode.set(true).unwrap());
    }
}
