//! Test database utilities for integration tests.
//!
//! Every test gets its own file-based SQLite database inside a temporary
//! directory, removed when the [`TestDatabase`] is dropped.

#![allow(clippy::duplicate_mod)]

use canopy::config::DatabaseConfig;
use canopy::storage::{create_pool, DbPool};
use std::path::PathBuf;
use tempfile::TempDir;

/// A migrated test database that cleans up on drop
pub struct TestDatabase {
    pub pool: DbPool,
    pub path: PathBuf,
    _dir: TempDir,
}

impl TestDatabase {
    /// Create a new test database with migrations applied
    pub async fn new(prefix: &str) -> Self {
        let dir = tempfile::Builder::new()
            .prefix(&format!("canopy-{}-", prefix))
            .tempdir()
            .expect("create test database directory");
        let path = dir.path().join(format!("{}.db", prefix));

        let config = DatabaseConfig {
            url: format!("sqlite://{}", path.display()),
            max_connections: 5,
            min_connections: 1,
            auto_migrate: true,
            ..Default::default()
        };
        let pool = create_pool(&config).await.expect("create test database pool");

        Self { pool, path, _dir: dir }
    }
}
