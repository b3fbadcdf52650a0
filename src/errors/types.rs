//! # Error Types
//!
//! Error types for the Canopy configuration store using `thiserror`.

use std::fmt;

/// Custom result type for Canopy operations
pub type Result<T> = std::result::Result<T, CanopyError>;

/// Main error type for the Canopy configuration store
#[derive(thiserror::Error, Debug)]
pub enum CanopyError {
    /// Referenced object or secret does not exist
    #[error("Not found: {message}")]
    NotExist { message: String },

    /// Name collision within a parent
    #[error("Already exists: {message}")]
    AlreadyExists { message: String },

    /// Malformed object kind, name or payload
    #[error("Bad request: {message}")]
    BadRequest { message: String, field: Option<String> },

    /// Mutations are rejected while maintenance mode is enabled
    #[error("Unavailable: {message}")]
    Maintenance { message: String },

    /// Tree invariant violated or lock failure
    #[error("Internal server error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Database and storage errors
    #[error("Database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },
}

/// Stable error classification exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotExist,
    AlreadyExists,
    BadRequest,
    Unavailable,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::NotExist => write!(f, "not_found"),
            ErrorKind::AlreadyExists => write!(f, "conflict"),
            ErrorKind::BadRequest => write!(f, "bad_request"),
            ErrorKind::Unavailable => write!(f, "service_unavailable"),
            ErrorKind::Internal => write!(f, "internal_error"),
        }
    }
}

impl CanopyError {
    /// Create a not-exist error
    pub fn not_exist<S: Into<String>>(message: S) -> Self {
        Self::NotExist { message: message.into() }
    }

    /// Create an already-exists error
    pub fn already_exists<S: Into<String>>(message: S) -> Self {
        Self::AlreadyExists { message: message.into() }
    }

    /// Create a bad request error
    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::BadRequest { message: message.into(), field: None }
    }

    /// Create a bad request error with field information
    pub fn bad_request_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::BadRequest { message: message.into(), field: Some(field.into()) }
    }

    /// Create a maintenance-mode rejection
    pub fn maintenance<S: Into<String>>(message: S) -> Self {
        Self::Maintenance { message: message.into() }
    }

    /// Create an internal server error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Create an internal server error with source
    pub fn internal_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Internal { message: message.into(), source: Some(source) }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Wrap a database error with context
    pub fn database<S: Into<String>>(source: sqlx::Error, context: S) -> Self {
        Self::Database { source, context: context.into() }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CanopyError::NotExist { .. } => ErrorKind::NotExist,
            CanopyError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            CanopyError::BadRequest { .. } | CanopyError::Serialization { .. } => {
                ErrorKind::BadRequest
            }
            CanopyError::Maintenance { .. } => ErrorKind::Unavailable,
            CanopyError::Internal { .. }
            | CanopyError::Database { .. }
            | CanopyError::Config { .. }
            | CanopyError::Io { .. } => ErrorKind::Internal,
        }
    }
}

impl From<sqlx::Error> for CanopyError {
    fn from(error: sqlx::Error) -> Self {
        Self::Database { source: error, context: "Database operation failed".to_string() }
    }
}

impl From<sqlx::migrate::MigrateError> for CanopyError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        Self::Database {
            source: sqlx::Error::Migrate(Box::new(error)),
            context: "Database migration failed".to_string(),
        }
    }
}

impl From<std::io::Error> for CanopyError {
    fn from(error: std::io::Error) -> Self {
        Self::Io { source: error, context: "I/O operation failed".to_string() }
    }
}

impl From<serde_json::Error> for CanopyError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization { source: error, context: "JSON serialization failed".to_string() }
    }
}

impl From<config::ConfigError> for CanopyError {
    fn from(error: config::ConfigError) -> Self {
        Self::config_with_source("Configuration loading failed", Box::new(error))
    }
}

impl From<validator::ValidationErrors> for CanopyError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::bad_request(format!("Validation failed: {}", message))
    }
}
