//! Domain layer
//!
//! Pure domain entities for the configuration store with no storage or HTTP
//! concerns. Domain types carry their own validation.
//!
//! ## Module Organization
//!
//! - `id`: Type-safe identifiers with NewType pattern
//! - `object`: Project groups, projects and references to them
//! - `secret`: Secrets and their two-variant payload

pub mod id;
pub mod object;
pub mod secret;

pub use id::{ObjectId, SecretId};
pub use object::{ObjectKind, ObjectNode, ObjectRef};
pub use secret::{Secret, SecretPayload, SecretType, SecretValidationError};
