//! # Storage and Persistence
//!
//! Database connectivity, embedded migrations, repositories for object nodes
//! and secrets, and the scoped locks that serialize mutations per parent.

pub mod lock;
pub mod migrations;
pub mod pool;
pub mod repositories;

pub use crate::config::DatabaseConfig;

pub use lock::{LocalLockFactory, LockFactory, LockGuard};
pub use migrations::run_migrations;
pub use pool::{create_pool, DbPool};
pub use repositories::{ObjectRepository, SecretRepository};

use crate::errors::{CanopyError, Result};

/// Check database connectivity
pub async fn check_connection(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1").fetch_one(pool).await.map_err(|e| {
        CanopyError::database(e, "Database connectivity check failed")
    })?;

    Ok(())
}
