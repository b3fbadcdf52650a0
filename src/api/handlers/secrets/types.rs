//! Request and response types for secrets API

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::domain::{SecretPayload, SecretType};
use crate::errors::CanopyError;
use crate::services::ResolvedSecret;
use crate::validation::validate_name;

/// Path of the node owning the secrets
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Path)]
pub struct SecretsPath {
    /// `projectgroups` or `projects`
    pub kind: String,
    /// Object ID or percent-encoded path such as `acme%2Fplatform`
    pub object_ref: String,
}

/// Path of a single named secret
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Path)]
pub struct SecretPath {
    pub kind: String,
    pub object_ref: String,
    /// Secret name
    pub name: String,
}

/// Query flags. Both are presence-based: `?tree&removeoverridden`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListSecretsQuery {
    /// Include secrets of all ancestors
    pub tree: Option<String>,
    /// Drop ancestor secrets shadowed by a closer secret of the same name
    pub removeoverridden: Option<String>,
}

/// Body of create and update requests
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SecretRequest {
    /// Secret name, unique within its parent
    #[validate(custom(function = "validate_name"))]
    pub name: String,

    /// `internal` or `external`
    #[serde(rename = "type")]
    pub secret_type: SecretType,

    /// Secret data, internal secrets only
    #[serde(default)]
    pub data: Option<BTreeMap<String, String>>,

    /// External provider, external secrets only
    #[serde(default)]
    pub secret_provider_id: Option<String>,

    /// Path within the external provider, external secrets only
    #[serde(default)]
    pub path: Option<String>,
}

impl SecretRequest {
    pub fn into_parts(self) -> Result<(String, SecretPayload), CanopyError> {
        let payload = SecretPayload::from_parts(
            self.secret_type,
            self.data,
            self.secret_provider_id,
            self.path,
        )
        .map_err(|e| CanopyError::bad_request(e.to_string()))?;
        Ok((self.name, payload))
    }
}

/// Secret as returned by the API. Payloads are never echoed back.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SecretResponse {
    pub id: String,
    pub name: String,
    /// Path of the node that owns the secret
    pub parent_path: String,
}

impl From<ResolvedSecret> for SecretResponse {
    fn from(resolved: ResolvedSecret) -> Self {
        Self {
            id: resolved.secret.id.into_string(),
            name: resolved.secret.name,
            parent_path: resolved.parent_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_request_parts() {
        let request: SecretRequest = serde_json::from_value(serde_json::json!({
            "name": "token",
            "type": "internal",
            "data": { "value": "abc" }
        }))
        .unwrap();
        assert!(request.validate().is_ok());

        let (name, payload) = request.into_parts().unwrap();
        assert_eq!(name, "token");
        assert_eq!(payload.secret_type(), SecretType::Internal);
    }

    #[test]
    fn test_mixed_request_is_rejected() {
        let request: SecretRequest = serde_json::from_value(serde_json::json!({
            "name": "token",
            "type": "external",
            "data": { "value": "abc" },
            "secret_provider_id": "vault",
            "path": "kv/token"
        }))
        .unwrap();
        assert!(request.into_parts().is_err());
    }

    #[test]
    fn test_invalid_name_fails_validation() {
        let request: SecretRequest = serde_json::from_value(serde_json::json!({
            "name": "-token",
            "type": "internal",
            "data": { "value": "abc" }
        }))
        .unwrap();
        assert!(request.validate().is_err());
    }
}
