//! Secret HTTP handlers
//!
//! Secrets are addressed through their owning node:
//! `/api/v1/{projectgroups|projects}/{ref}/secrets[/{name}]`.
//! Responses carry IDs, names and owner paths, never payloads.

pub mod types;

pub use types::{ListSecretsQuery, SecretPath, SecretRequest, SecretResponse, SecretsPath};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::instrument;
use validator::Validate;

use super::kind_from_segment;
use crate::{
    api::{error::ApiError, routes::ApiState},
    errors::CanopyError,
    services::{CreateSecretRequest, SecretQuery, UpdateSecretRequest},
};

#[utoipa::path(
    get,
    path = "/api/v1/{kind}/{object_ref}/secrets",
    params(SecretsPath, ListSecretsQuery),
    responses(
        (status = 200, description = "Secrets visible to the object", body = [SecretResponse]),
        (status = 400, description = "Invalid object kind or reference"),
        (status = 404, description = "Object not found")
    ),
    tag = "secrets"
)]
#[instrument(skip(state), fields(kind = %path.kind, object_ref = %path.object_ref))]
pub async fn list_secrets_handler(
    State(state): State<ApiState>,
    Path(path): Path<SecretsPath>,
    Query(query): Query<ListSecretsQuery>,
) -> Result<Json<Vec<SecretResponse>>, ApiError> {
    let kind = kind_from_segment(&path.kind)?;
    let query = SecretQuery {
        tree: query.tree.is_some(),
        remove_overridden: query.removeoverridden.is_some(),
    };

    let secrets = state.handler.get_secrets(kind, &path.object_ref, query).await?;
    Ok(Json(secrets.into_iter().map(SecretResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/v1/{kind}/{object_ref}/secrets",
    params(SecretsPath),
    request_body = SecretRequest,
    responses(
        (status = 201, description = "Secret created", body = SecretResponse),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Object not found"),
        (status = 409, description = "Secret name already used by the object"),
        (status = 503, description = "Maintenance mode enabled")
    ),
    tag = "secrets"
)]
#[instrument(skip(state, payload), fields(kind = %path.kind, object_ref = %path.object_ref, secret_name = %payload.name))]
pub async fn create_secret_handler(
    State(state): State<ApiState>,
    Path(path): Path<SecretsPath>,
    Json(payload): Json<SecretRequest>,
) -> Result<(StatusCode, Json<SecretResponse>), ApiError> {
    let kind = kind_from_segment(&path.kind)?;
    state.handler.ensure_writable("create_secret")?;
    payload.validate().map_err(|err| ApiError::from(CanopyError::from(err)))?;
    let (name, payload) = payload.into_parts()?;

    let created = state
        .handler
        .create_secret(kind, &path.object_ref, CreateSecretRequest { name, payload })
        .await?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/{kind}/{object_ref}/secrets/{name}",
    params(SecretPath),
    request_body = SecretRequest,
    responses(
        (status = 200, description = "Secret updated", body = SecretResponse),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Object or secret not found"),
        (status = 409, description = "New name already used by the object"),
        (status = 503, description = "Maintenance mode enabled")
    ),
    tag = "secrets"
)]
#[instrument(skip(state, payload), fields(kind = %path.kind, object_ref = %path.object_ref, secret_name = %path.name))]
pub async fn update_secret_handler(
    State(state): State<ApiState>,
    Path(path): Path<SecretPath>,
    Json(payload): Json<SecretRequest>,
) -> Result<Json<SecretResponse>, ApiError> {
    let kind = kind_from_segment(&path.kind)?;
    state.handler.ensure_writable("update_secret")?;
    payload.validate().map_err(|err| ApiError::from(CanopyError::from(err)))?;
    let (name, payload) = payload.into_parts()?;

    let updated = state
        .handler
        .update_secret(kind, &path.object_ref, &path.name, UpdateSecretRequest { name, payload })
        .await?;

    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/{kind}/{object_ref}/secrets/{name}",
    params(SecretPath),
    responses(
        (status = 204, description = "Secret deleted"),
        (status = 404, description = "Object or secret not found"),
        (status = 503, description = "Maintenance mode enabled")
    ),
    tag = "secrets"
)]
#[instrument(skip(state), fields(kind = %path.kind, object_ref = %path.object_ref, secret_name = %path.name))]
pub async fn delete_secret_handler(
    State(state): State<ApiState>,
    Path(path): Path<SecretPath>,
) -> Result<StatusCode, ApiError> {
    let kind = kind_from_segment(&path.kind)?;
    state.handler.delete_secret(kind, &path.object_ref, &path.name).await?;
    Ok(StatusCode::NO_CONTENT)
}
