use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::health::health_handler,
        crate::api::handlers::maintenance::get_maintenance_handler,
        crate::api::handlers::maintenance::enable_maintenance_handler,
        crate::api::handlers::maintenance::disable_maintenance_handler,
        crate::api::handlers::objects::create_object_handler,
        crate::api::handlers::objects::get_object_handler,
        crate::api::handlers::objects::delete_object_handler,
        crate::api::handlers::secrets::list_secrets_handler,
        crate::api::handlers::secrets::create_secret_handler,
        crate::api::handlers::secrets::update_secret_handler,
        crate::api::handlers::secrets::delete_secret_handler,
    ),
    components(schemas(
        crate::api::handlers::health::HealthResponse,
        crate::api::handlers::maintenance::MaintenanceStatus,
        crate::api::handlers::objects::CreateObjectRequest,
        crate::api::handlers::objects::ObjectResponse,
        crate::api::handlers::secrets::SecretRequest,
        crate::api::handlers::secrets::SecretResponse,
        crate::domain::ObjectKind,
        crate::domain::SecretType,
    )),
    tags(
        (name = "objects", description = "Project groups and projects"),
        (name = "secrets", description = "Secrets attached to project groups and projects"),
        (name = "maintenance", description = "Maintenance mode administration"),
        (name = "health", description = "Liveness and readiness")
    )
)]
pub struct ApiDoc;

pub fn docs_router<S: Clone + Send + Sync + 'static>() -> Router<S> {
    Router::new().route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_secret_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/{kind}/{object_ref}/secrets"));
        assert!(doc.paths.paths.contains_key("/api/v1/{kind}/{object_ref}/secrets/{name}"));
        assert!(doc.paths.paths.contains_key("/health"));
    }
}
