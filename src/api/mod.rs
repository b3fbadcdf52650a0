//! # REST API
//!
//! axum routing, handlers and error mapping for the configuration store.

pub mod docs;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use routes::{api_router, build_router, ApiState};
pub use server::start_api_server;
