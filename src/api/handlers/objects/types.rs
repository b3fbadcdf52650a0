//! Request and response types for project groups and projects

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::domain::ObjectKind;
use crate::services::ObjectView;
use crate::validation::validate_name;

/// Path of a single object
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Path)]
pub struct ObjectPath {
    /// `projectgroups` or `projects`
    pub kind: String,
    /// Object ID or percent-encoded path
    pub object_ref: String,
}

/// Request to create a project group or project
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateObjectRequest {
    /// Name, unique within the parent project group
    #[validate(custom(function = "validate_name"))]
    pub name: String,

    /// Parent project group reference. Omit to create a root project group.
    #[serde(default)]
    pub parent_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ObjectResponse {
    pub id: String,
    pub name: String,
    pub kind: ObjectKind,
    /// `/`-delimited path from the root project group
    pub path: String,
    pub parent_id: Option<String>,
}

impl From<ObjectView> for ObjectResponse {
    fn from(view: ObjectView) -> Self {
        Self {
            id: view.id.into_string(),
            name: view.name,
            kind: view.kind,
            path: view.path,
            parent_id: view.parent_id.map(|id| id.into_string()),
        }
    }
}
