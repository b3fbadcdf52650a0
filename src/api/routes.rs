use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::services::ActionHandler;

use super::{
    docs,
    handlers::{
        create_object_handler, create_secret_handler, delete_object_handler,
        delete_secret_handler, disable_maintenance_handler, enable_maintenance_handler,
        get_maintenance_handler, get_object_handler, health_handler, list_secrets_handler,
        update_secret_handler,
    },
};

#[derive(Clone)]
pub struct ApiState {
    pub handler: ActionHandler,
    pub metrics: Option<PrometheusHandle>,
}

impl ApiState {
    pub fn new(handler: ActionHandler) -> Self {
        Self { handler, metrics: None }
    }

    pub fn with_metrics(mut self, metrics: PrometheusHandle) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

async fn metrics_handler(State(state): State<ApiState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics exporter not installed".to_string()),
    }
}

/// Routes without middleware, used directly by tests
pub fn api_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route(
            "/api/v1/maintenance",
            get(get_maintenance_handler)
                .put(enable_maintenance_handler)
                .delete(disable_maintenance_handler),
        )
        .route("/api/v1/{kind}", post(create_object_handler))
        .route("/api/v1/{kind}/{object_ref}", get(get_object_handler).delete(delete_object_handler))
        .route(
            "/api/v1/{kind}/{object_ref}/secrets",
            get(list_secrets_handler).post(create_secret_handler),
        )
        .route(
            "/api/v1/{kind}/{object_ref}/secrets/{name}",
            put(update_secret_handler).delete(delete_secret_handler),
        )
        .with_state(state)
        .merge(docs::docs_router())
}

/// Full router with tracing, request timeout, body limit and optional CORS
pub fn build_router(state: ApiState, config: &ServerConfig) -> Router {
    let router = api_router(state)
        .layer(RequestBodyLimitLayer::new(config.max_body_size))
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, config.timeout()))
        .layer(TraceLayer::new_for_http());

    if config.enable_cors {
        router.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
    } else {
        router
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use crate::services::MaintenanceMode;
    use crate::storage::{test_support::memory_pool, LocalLockFactory};

    async fn state() -> ApiState {
        ApiState::new(ActionHandler::new(
            memory_pool().await,
            Arc::new(LocalLockFactory::new(Duration::from_secs(5))),
            Arc::new(MaintenanceMode::default()),
        ))
    }

    #[tokio::test]
    async fn test_layered_router_serves_requests() {
        let config = ServerConfig { enable_cors: true, ..Default::default() };
        let router = build_router(state().await, &config);

        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let config = ServerConfig { max_body_size: 1024, ..Default::default() };
        let router = build_router(state().await, &config);

        let body = serde_json::to_vec(&serde_json::json!({ "name": "a".repeat(4096) })).unwrap();
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/projectgroups")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
