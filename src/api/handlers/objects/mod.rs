//! Project group and project HTTP handlers

pub mod types;

pub use types::{CreateObjectRequest, ObjectPath, ObjectResponse};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::instrument;
use validator::Validate;

use super::kind_from_segment;
use crate::{
    api::{error::ApiError, routes::ApiState},
    domain::ObjectKind,
    errors::CanopyError,
};

/// Path of an object collection
#[derive(Debug, Clone, serde::Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Path)]
pub struct CollectionPath {
    /// `projectgroups` or `projects`
    pub kind: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/{kind}",
    params(CollectionPath),
    request_body = CreateObjectRequest,
    responses(
        (status = 201, description = "Object created", body = ObjectResponse),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Parent project group not found"),
        (status = 409, description = "Name already used in the parent project group"),
        (status = 503, description = "Maintenance mode enabled")
    ),
    tag = "objects"
)]
#[instrument(skip(state, payload), fields(kind = %path.kind, object_name = %payload.name))]
pub async fn create_object_handler(
    State(state): State<ApiState>,
    Path(path): Path<CollectionPath>,
    Json(payload): Json<CreateObjectRequest>,
) -> Result<(StatusCode, Json<ObjectResponse>), ApiError> {
    let kind = kind_from_segment(&path.kind)?;
    state.handler.ensure_writable("create_object")?;
    payload.validate().map_err(|err| ApiError::from(CanopyError::from(err)))?;

    let created = match kind {
        ObjectKind::ProjectGroup => {
            state.handler.create_project_group(payload.parent_ref.as_deref(), &payload.name).await?
        }
        ObjectKind::Project => {
            let parent_ref = payload.parent_ref.as_deref().ok_or_else(|| {
                ApiError::bad_request("a project requires a parent project group")
            })?;
            state.handler.create_project(parent_ref, &payload.name).await?
        }
    };

    Ok((StatusCode::CREATED, Json(created.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/{kind}/{object_ref}",
    params(ObjectPath),
    responses(
        (status = 200, description = "Object", body = ObjectResponse),
        (status = 400, description = "Invalid object kind or reference"),
        (status = 404, description = "Object not found")
    ),
    tag = "objects"
)]
#[instrument(skip(state), fields(kind = %path.kind, object_ref = %path.object_ref))]
pub async fn get_object_handler(
    State(state): State<ApiState>,
    Path(path): Path<ObjectPath>,
) -> Result<Json<ObjectResponse>, ApiError> {
    let kind = kind_from_segment(&path.kind)?;
    let object = state.handler.get_object(kind, &path.object_ref).await?;
    Ok(Json(object.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/{kind}/{object_ref}",
    params(ObjectPath),
    responses(
        (status = 204, description = "Object and its secrets deleted"),
        (status = 400, description = "Project group still has children"),
        (status = 404, description = "Object not found"),
        (status = 503, description = "Maintenance mode enabled")
    ),
    tag = "objects"
)]
#[instrument(skip(state), fields(kind = %path.kind, object_ref = %path.object_ref))]
pub async fn delete_object_handler(
    State(state): State<ApiState>,
    Path(path): Path<ObjectPath>,
) -> Result<StatusCode, ApiError> {
    let kind = kind_from_segment(&path.kind)?;
    state.handler.delete_object(kind, &path.object_ref).await?;
    Ok(StatusCode::NO_CONTENT)
}
