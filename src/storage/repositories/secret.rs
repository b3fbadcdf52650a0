//! Secret repository
//!
//! CRUD operations for secrets attached to project groups and projects.
//! Internal payloads are stored as a JSON object in `data`; external payloads
//! as a `(secret_provider_id, path)` pair.

use super::object::is_unique_violation;
use crate::domain::{ObjectId, ObjectKind, Secret, SecretId, SecretPayload, SecretType};
use crate::errors::{CanopyError, Result};
use sqlx::{FromRow, SqliteConnection};
use std::collections::BTreeMap;
use tracing::instrument;

/// Database row structure for secrets
#[derive(Debug, Clone, FromRow)]
struct SecretRow {
    pub id: String,
    pub name: String,
    pub parent_type: String,
    pub parent_id: String,
    pub secret_type: String,
    pub data: Option<String>,
    pub secret_provider_id: Option<String>,
    pub path: Option<String>,
}

impl TryFrom<SecretRow> for Secret {
    type Error = CanopyError;

    fn try_from(row: SecretRow) -> Result<Self> {
        let corrupt = |what: &str| {
            CanopyError::internal(format!("secret '{}' has corrupt {}", row.id, what))
        };

        let parent_type = row.parent_type.parse::<ObjectKind>().map_err(|_| corrupt("parent type"))?;
        let secret_type = row.secret_type.parse::<SecretType>().map_err(|_| corrupt("type"))?;

        let payload = match secret_type {
            SecretType::Internal => {
                let raw = row.data.as_deref().ok_or_else(|| corrupt("data"))?;
                let data: BTreeMap<String, String> =
                    serde_json::from_str(raw).map_err(|_| corrupt("data"))?;
                SecretPayload::Internal { data }
            }
            SecretType::External => SecretPayload::External {
                secret_provider_id: row
                    .secret_provider_id
                    .clone()
                    .ok_or_else(|| corrupt("secret provider id"))?,
                path: row.path.clone().ok_or_else(|| corrupt("path"))?,
            },
        };

        Ok(Secret {
            id: SecretId::from_string(row.id),
            name: row.name,
            parent_type,
            parent_id: ObjectId::from_string(row.parent_id),
            payload,
        })
    }
}

/// Column values for a payload: `(data, secret_provider_id, path)`
fn payload_columns(
    payload: &SecretPayload,
) -> Result<(Option<String>, Option<&str>, Option<&str>)> {
    match payload {
        SecretPayload::Internal { data } => {
            let json = serde_json::to_string(data).map_err(|e| CanopyError::Serialization {
                source: e,
                context: "Failed to serialize secret data".to_string(),
            })?;
            Ok((Some(json), None, None))
        }
        SecretPayload::External { secret_provider_id, path } => {
            Ok((None, Some(secret_provider_id.as_str()), Some(path.as_str())))
        }
    }
}

const SELECT_SECRET: &str = "SELECT id, name, parent_type, parent_id, secret_type, data, secret_provider_id, path FROM secrets";

/// Data access for secrets
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretRepository;

impl SecretRepository {
    /// Secrets directly attached to `parent_id`, in name order
    #[instrument(skip(conn), fields(parent_id = %parent_id), name = "db_list_secrets_by_parent")]
    pub async fn list_by_parent(
        conn: &mut SqliteConnection,
        parent_id: &ObjectId,
    ) -> Result<Vec<Secret>> {
        let rows = sqlx::query_as::<_, SecretRow>(&format!(
            "{} WHERE parent_id = $1 ORDER BY name",
            SELECT_SECRET
        ))
        .bind(parent_id.as_str())
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, parent_id = %parent_id, "Failed to list secrets");
            CanopyError::database(e, format!("Failed to list secrets of '{}'", parent_id))
        })?;

        rows.into_iter().map(Secret::try_from).collect()
    }

    /// Get a secret by its name within a parent
    #[instrument(skip(conn), fields(parent_id = %parent_id, secret_name = %name), name = "db_get_secret_by_name")]
    pub async fn get_by_name(
        conn: &mut SqliteConnection,
        parent_id: &ObjectId,
        name: &str,
    ) -> Result<Option<Secret>> {
        let row = sqlx::query_as::<_, SecretRow>(&format!(
            "{} WHERE parent_id = $1 AND name = $2",
            SELECT_SECRET
        ))
        .bind(parent_id.as_str())
        .bind(name)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, secret_name = %name, "Failed to get secret by name");
            CanopyError::database(e, format!("Failed to get secret '{}'", name))
        })?;

        row.map(Secret::try_from).transpose()
    }

    /// Insert a new secret
    #[instrument(skip(conn, secret), fields(secret_id = %secret.id, secret_name = %secret.name, parent_id = %secret.parent_id), name = "db_insert_secret")]
    pub async fn insert(conn: &mut SqliteConnection, secret: &Secret) -> Result<()> {
        let (data, secret_provider_id, path) = payload_columns(&secret.payload)?;

        sqlx::query(
            "INSERT INTO secrets (id, name, parent_type, parent_id, secret_type, data, secret_provider_id, path) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(secret.id.as_str())
        .bind(&secret.name)
        .bind(secret.parent_type.as_str())
        .bind(secret.parent_id.as_str())
        .bind(secret.secret_type().as_str())
        .bind(data)
        .bind(secret_provider_id)
        .bind(path)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return CanopyError::already_exists(format!(
                    "secret '{}' already exists",
                    secret.name
                ));
            }
            tracing::error!(error = %e, secret_name = %secret.name, "Failed to create secret");
            CanopyError::database(e, format!("Failed to create secret '{}'", secret.name))
        })?;

        tracing::info!(
            secret_id = %secret.id,
            secret_name = %secret.name,
            secret_type = %secret.secret_type(),
            parent_id = %secret.parent_id,
            "Created new secret"
        );
        Ok(())
    }

    /// Replace name, type and payload of an existing secret
    #[instrument(skip(conn, secret), fields(secret_id = %secret.id, secret_name = %secret.name), name = "db_update_secret")]
    pub async fn update(conn: &mut SqliteConnection, secret: &Secret) -> Result<()> {
        let (data, secret_provider_id, path) = payload_columns(&secret.payload)?;

        let result = sqlx::query(
            "UPDATE secrets SET name = $1, secret_type = $2, data = $3, secret_provider_id = $4, path = $5, \
             updated_at = CURRENT_TIMESTAMP WHERE id = $6",
        )
        .bind(&secret.name)
        .bind(secret.secret_type().as_str())
        .bind(data)
        .bind(secret_provider_id)
        .bind(path)
        .bind(secret.id.as_str())
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return CanopyError::already_exists(format!(
                    "secret '{}' already exists",
                    secret.name
                ));
            }
            tracing::error!(error = %e, secret_id = %secret.id, "Failed to update secret");
            CanopyError::database(e, format!("Failed to update secret '{}'", secret.id))
        })?;

        if result.rows_affected() == 0 {
            return Err(CanopyError::not_exist(format!("secret '{}' does not exist", secret.id)));
        }

        tracing::info!(secret_id = %secret.id, secret_name = %secret.name, "Updated secret");
        Ok(())
    }

    /// Delete the secret named `name` under `parent_id`. Returns whether a row
    /// was removed.
    #[instrument(skip(conn), fields(parent_id = %parent_id, secret_name = %name), name = "db_delete_secret")]
    pub async fn delete_by_name(
        conn: &mut SqliteConnection,
        parent_id: &ObjectId,
        name: &str,
    ) -> Result<bool> {
        let result = sqlx::query("DELETE FROM secrets WHERE parent_id = $1 AND name = $2")
            .bind(parent_id.as_str())
            .bind(name)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, secret_name = %name, "Failed to delete secret");
                CanopyError::database(e, format!("Failed to delete secret '{}'", name))
            })?;

        if result.rows_affected() > 0 {
            tracing::info!(parent_id = %parent_id, secret_name = %name, "Deleted secret");
        }
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ObjectNode;
    use crate::storage::repositories::ObjectRepository;
    use crate::storage::test_support::memory_pool;

    async fn seed_parent(conn: &mut SqliteConnection, name: &str) -> ObjectNode {
        let node = ObjectNode {
            id: ObjectId::new(),
            kind: ObjectKind::ProjectGroup,
            name: name.to_string(),
            parent_id: None,
        };
        ObjectRepository::insert(conn, &node).await.unwrap();
        node
    }

    fn internal(parent: &ObjectNode, name: &str, value: &str) -> Secret {
        Secret {
            id: SecretId::new(),
            name: name.to_string(),
            parent_type: parent.kind,
            parent_id: parent.id.clone(),
            payload: SecretPayload::Internal {
                data: [("value".to_string(), value.to_string())].into_iter().collect(),
            },
        }
    }

    #[tokio::test]
    async fn test_insert_and_list_in_name_order() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let parent = seed_parent(&mut conn, "acme").await;

        for name in ["zeta", "alpha", "mid"] {
            SecretRepository::insert(&mut conn, &internal(&parent, name, "v")).await.unwrap();
        }

        let names: Vec<String> = SecretRepository::list_by_parent(&mut conn, &parent.id)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[tokio::test]
    async fn test_external_payload_roundtrip() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let parent = seed_parent(&mut conn, "acme").await;

        let secret = Secret {
            payload: SecretPayload::External {
                secret_provider_id: "vault-prod".to_string(),
                path: "kv/deploy".to_string(),
            },
            ..internal(&parent, "deploy", "unused")
        };
        SecretRepository::insert(&mut conn, &secret).await.unwrap();

        let fetched =
            SecretRepository::get_by_name(&mut conn, &parent.id, "deploy").await.unwrap().unwrap();
        assert_eq!(fetched, secret);
    }

    #[tokio::test]
    async fn test_duplicate_name_in_parent_is_conflict() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let parent = seed_parent(&mut conn, "acme").await;
        let other = seed_parent(&mut conn, "globex").await;

        SecretRepository::insert(&mut conn, &internal(&parent, "token", "1")).await.unwrap();
        let err = SecretRepository::insert(&mut conn, &internal(&parent, "token", "2"))
            .await
            .unwrap_err();
        assert!(matches!(err, CanopyError::AlreadyExists { .. }));

        SecretRepository::insert(&mut conn, &internal(&other, "token", "3")).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_replaces_payload_and_name() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let parent = seed_parent(&mut conn, "acme").await;

        let mut secret = internal(&parent, "token", "1");
        SecretRepository::insert(&mut conn, &secret).await.unwrap();

        secret.name = "renamed".to_string();
        secret.payload = SecretPayload::External {
            secret_provider_id: "vault".to_string(),
            path: "kv/token".to_string(),
        };
        SecretRepository::update(&mut conn, &secret).await.unwrap();

        assert!(SecretRepository::get_by_name(&mut conn, &parent.id, "token")
            .await
            .unwrap()
            .is_none());
        let fetched =
            SecretRepository::get_by_name(&mut conn, &parent.id, "renamed").await.unwrap().unwrap();
        assert_eq!(fetched, secret);
    }

    #[tokio::test]
    async fn test_delete_by_name() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let parent = seed_parent(&mut conn, "acme").await;

        SecretRepository::insert(&mut conn, &internal(&parent, "token", "1")).await.unwrap();
        assert!(SecretRepository::delete_by_name(&mut conn, &parent.id, "token").await.unwrap());
        assert!(!SecretRepository::delete_by_name(&mut conn, &parent.id, "token").await.unwrap());
    }

    #[tokio::test]
    async fn test_secrets_cascade_with_parent() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let parent = seed_parent(&mut conn, "acme").await;

        SecretRepository::insert(&mut conn, &internal(&parent, "token", "1")).await.unwrap();
        ObjectRepository::delete(&mut conn, &parent.id).await.unwrap();

        assert!(SecretRepository::list_by_parent(&mut conn, &parent.id).await.unwrap().is_empty());
    }
}
