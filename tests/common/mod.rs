//! Common test utilities for all integration tests.
//!
//! Provides shared test database setup and helpers for building a store on
//! top of it.

#![allow(dead_code)]
#![allow(clippy::duplicate_mod)]

pub mod test_db;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use canopy::domain::SecretPayload;
use canopy::services::{ActionHandler, CreateSecretRequest, MaintenanceMode};
use canopy::storage::LocalLockFactory;

pub use test_db::TestDatabase;

/// A migrated database plus the handler operating on it
pub struct TestStore {
    pub db: TestDatabase,
    pub handler: ActionHandler,
    pub maintenance: Arc<MaintenanceMode>,
}

impl TestStore {
    pub async fn new(prefix: &str) -> Self {
        let db = TestDatabase::new(prefix).await;
        let maintenance = Arc::new(MaintenanceMode::default());
        let handler = ActionHandler::new(
            db.pool.clone(),
            Arc::new(LocalLockFactory::new(Duration::from_secs(10))),
            maintenance.clone(),
        );
        Self { db, handler, maintenance }
    }
}

pub fn internal_payload(value: &str) -> SecretPayload {
    let data: BTreeMap<String, String> =
        [("value".to_string(), value.to_string())].into_iter().collect();
    SecretPayload::Internal { data }
}

pub fn internal_secret(name: &str, value: &str) -> CreateSecretRequest {
    CreateSecretRequest { name: name.to_string(), payload: internal_payload(value) }
}

pub fn external_secret(name: &str, provider: &str, path: &str) -> CreateSecretRequest {
    CreateSecretRequest {
        name: name.to_string(),
        payload: SecretPayload::External {
            secret_provider_id: provider.to_string(),
            path: path.to_string(),
        },
    }
}
