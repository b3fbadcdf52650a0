//! Repository modules for data access
//!
//! Repositories are stateless and run every query against a caller-supplied
//! connection, which is usually an open transaction.

pub mod object;
pub mod secret;

pub use object::ObjectRepository;
pub use secret::SecretRepository;
