//! Secret domain types
//!
//! A secret is a named credential owned by exactly one project group or
//! project. Its payload is either opaque internal data or a reference into an
//! external secret provider; the two variants are a sum type so a record can
//! never carry both.

use super::id::{ObjectId, SecretId};
use super::object::ObjectKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Secret type discriminator as exposed on the wire and in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SecretType {
    /// Payload stored by the configuration store itself
    Internal,
    /// Payload held by an external secret provider
    External,
}

impl SecretType {
    /// Get the database representation of this type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::External => "external",
        }
    }
}

impl FromStr for SecretType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "internal" => Ok(Self::Internal),
            "external" => Ok(Self::External),
            _ => Err(format!("unknown secret type {:?}", s)),
        }
    }
}

impl fmt::Display for SecretType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Secret payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SecretPayload {
    /// Opaque key/value data
    Internal { data: BTreeMap<String, String> },
    /// Reference to a secret held by an external provider
    External { secret_provider_id: String, path: String },
}

impl SecretPayload {
    pub fn secret_type(&self) -> SecretType {
        match self {
            Self::Internal { .. } => SecretType::Internal,
            Self::External { .. } => SecretType::External,
        }
    }

    /// Build a payload from the flat wire shape, rejecting fields that belong
    /// to the other variant.
    pub fn from_parts(
        secret_type: SecretType,
        data: Option<BTreeMap<String, String>>,
        secret_provider_id: Option<String>,
        path: Option<String>,
    ) -> Result<Self, SecretValidationError> {
        let payload = match secret_type {
            SecretType::Internal => {
                if secret_provider_id.is_some() || path.is_some() {
                    return Err(SecretValidationError::MixedPayload);
                }
                Self::Internal { data: data.unwrap_or_default() }
            }
            SecretType::External => {
                if data.is_some() {
                    return Err(SecretValidationError::MixedPayload);
                }
                Self::External {
                    secret_provider_id: secret_provider_id.unwrap_or_default(),
                    path: path.unwrap_or_default(),
                }
            }
        };
        payload.validate()?;
        Ok(payload)
    }

    /// Validate that the populated variant is complete
    pub fn validate(&self) -> Result<(), SecretValidationError> {
        match self {
            Self::Internal { data } => {
                if data.is_empty() {
                    return Err(SecretValidationError::EmptyData);
                }
            }
            Self::External { secret_provider_id, path } => {
                if secret_provider_id.is_empty() {
                    return Err(SecretValidationError::EmptySecretProviderId);
                }
                if path.is_empty() {
                    return Err(SecretValidationError::EmptyPath);
                }
            }
        }
        Ok(())
    }
}

/// A secret attached to a project group or project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    pub id: SecretId,
    pub name: String,
    pub parent_type: ObjectKind,
    pub parent_id: ObjectId,
    pub payload: SecretPayload,
}

impl Secret {
    pub fn secret_type(&self) -> SecretType {
        self.payload.secret_type()
    }
}

/// Secret payload validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretValidationError {
    /// Internal secret without data
    EmptyData,
    /// External secret without provider
    EmptySecretProviderId,
    /// External secret without path
    EmptyPath,
    /// Fields of both variants supplied
    MixedPayload,
}

impl fmt::Display for SecretValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyData => write!(f, "internal secret data cannot be empty"),
            Self::EmptySecretProviderId => {
                write!(f, "external secret provider id cannot be empty")
            }
            Self::EmptyPath => write!(f, "external secret path cannot be empty"),
            Self::MixedPayload => {
                write!(f, "secret payload mixes internal and external fields")
            }
        }
    }
}

impl std::error::Error for SecretValidationError {}
