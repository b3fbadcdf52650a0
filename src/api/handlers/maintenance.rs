//! Maintenance mode administration

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

use crate::api::{error::ApiError, routes::ApiState};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MaintenanceStatus {
    /// Whether mutations are currently rejected
    pub enabled: bool,
}

#[utoipa::path(
    get,
    path = "/api/v1/maintenance",
    responses((status = 200, description = "Maintenance mode status", body = MaintenanceStatus)),
    tag = "maintenance"
)]
pub async fn get_maintenance_handler(
    State(state): State<ApiState>,
) -> Result<Json<MaintenanceStatus>, ApiError> {
    let enabled = state.handler.maintenance_enabled()?;
    Ok(Json(MaintenanceStatus { enabled }))
}

#[utoipa::path(
    put,
    path = "/api/v1/maintenance",
    responses((status = 200, description = "Maintenance mode enabled", body = MaintenanceStatus)),
    tag = "maintenance"
)]
#[instrument(skip(state))]
pub async fn enable_maintenance_handler(
    State(state): State<ApiState>,
) -> Result<Json<MaintenanceStatus>, ApiError> {
    state.handler.set_maintenance(true)?;
    Ok(Json(MaintenanceStatus { enabled: true }))
}

#[utoipa::path(
    delete,
    path = "/api/v1/maintenance",
    responses((status = 200, description = "Maintenance mode disabled", body = MaintenanceStatus)),
    tag = "maintenance"
)]
#[instrument(skip(state))]
pub async fn disable_maintenance_handler(
    State(state): State<ApiState>,
) -> Result<Json<MaintenanceStatus>, ApiError> {
    state.handler.set_maintenance(false)?;
    Ok(Json(MaintenanceStatus { enabled: false }))
}
