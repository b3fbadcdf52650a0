//! HTTP handlers grouped by resource

pub mod health;
pub mod maintenance;
pub mod objects;
pub mod secrets;

pub use health::health_handler;
pub use maintenance::{
    disable_maintenance_handler, enable_maintenance_handler, get_maintenance_handler,
};
pub use objects::{create_object_handler, delete_object_handler, get_object_handler};
pub use secrets::{
    create_secret_handler, delete_secret_handler, list_secrets_handler, update_secret_handler,
};

use crate::api::error::ApiError;
use crate::domain::ObjectKind;
use crate::services::parse_object_kind;

/// Map the collection segment of a route (the plural kind name) to an object
/// kind
pub(crate) fn kind_from_segment(segment: &str) -> Result<ObjectKind, ApiError> {
    let singular = segment.strip_suffix('s').unwrap_or_default();
    parse_object_kind(singular).map_err(|_| {
        ApiError::bad_request(format!("invalid object kind {:?}", segment))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_segment() {
        assert_eq!(kind_from_segment("projectgroups").unwrap(), ObjectKind::ProjectGroup);
        assert_eq!(kind_from_segment("projects").unwrap(), ObjectKind::Project);
        for segment in ["users", "project", "projectgroup", "projectss", ""] {
            assert!(
                matches!(kind_from_segment(segment), Err(ApiError::BadRequest(_))),
                "{:?} should be rejected",
                segment
            );
        }
    }
}
