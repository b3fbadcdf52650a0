//! Business logic services
//!
//! Reference resolution, hierarchy walking, secret resolution and the
//! coordinator that gates and serializes mutations. HTTP concerns live in
//! `api`.

pub mod action;
pub mod hierarchy;
pub mod maintenance;
pub mod resolver;
pub mod secrets;

pub use action::{ActionHandler, CreateSecretRequest, ObjectView, UpdateSecretRequest};
pub use hierarchy::HierarchyArena;
pub use maintenance::MaintenanceMode;
pub use resolver::{parse_object_kind, resolve_object, resolve_object_id};
pub use secrets::{get_secrets, remove_overridden, ResolvedSecret, SecretQuery};
