//! Health check endpoint for monitoring and readiness probes

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::routes::ApiState;
use crate::storage::check_connection;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// `ok` when the store is reachable, `degraded` otherwise
    #[schema(example = "ok")]
    pub status: String,

    /// Whether mutations are currently rejected
    pub maintenance: bool,
}

/// Health check endpoint
///
/// Returns 200 OK when the store answers and 503 when it does not. Suitable
/// for liveness/readiness probes and load balancer health checks.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Store unreachable", body = HealthResponse)
    )
)]
pub async fn health_handler(State(state): State<ApiState>) -> (StatusCode, Json<HealthResponse>) {
    let maintenance = state.handler.maintenance_enabled().unwrap_or(false);

    match check_connection(state.handler.pool()).await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse { status: "ok".to_string(), maintenance })),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse { status: "degraded".to_string(), maintenance }),
            )
        }
    }
}
