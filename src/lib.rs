//! # Canopy
//!
//! A hierarchical configuration store. Projects are organized into nested
//! project groups, and named secrets can be attached at any node of the tree.
//! A node sees its own secrets and, on request, those of all its ancestors,
//! with closer definitions optionally shadowing ancestral ones of the same
//! name.
//!
//! ## Architecture
//!
//! ```text
//! REST API (axum) → ActionHandler → Resolver / Hierarchy / Secret resolution
//!                        ↓                         ↓
//!              Maintenance gate + locks     Repositories (sqlx, SQLite)
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use canopy::{
//!     config::AppConfig,
//!     services::{ActionHandler, MaintenanceMode, SecretQuery},
//!     storage::{create_pool, LocalLockFactory},
//!     domain::ObjectKind,
//!     Result,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::load(None)?;
//!     let pool = create_pool(&config.database).await?;
//!     let handler = ActionHandler::new(
//!         pool,
//!         Arc::new(LocalLockFactory::new(config.locks.acquire_timeout())),
//!         Arc::new(MaintenanceMode::default()),
//!     );
//!
//!     let secrets = handler
//!         .get_secrets(ObjectKind::Project, "acme/platform/api", SecretQuery::effective())
//!         .await?;
//!     println!("{} secrets visible", secrets.len());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod services;
pub mod storage;
pub mod validation;

// Re-export commonly used types and traits
pub use config::AppConfig;
pub use errors::{CanopyError, Error, ErrorKind, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
