//! # Error Handling
//!
//! Error types for the Canopy configuration store. Every fallible operation in
//! the crate returns [`Result`], whose error carries one of the stable kinds
//! the HTTP boundary maps to a distinct response condition.

pub mod types;

pub use types::{CanopyError, ErrorKind, Result};

/// Shorthand used by the binary and the API layer
pub type Error = CanopyError;
