//! Object node domain types
//!
//! Project groups and projects form a single rooted tree per root group.
//! A node is addressed either by its opaque ID or by the `/`-delimited path
//! of node names from its root group.

use super::id::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Kind of object a reference resolves against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    ProjectGroup,
    Project,
}

impl ObjectKind {
    /// Get the database representation of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectGroup => "projectgroup",
            Self::Project => "project",
        }
    }

    /// Whether nodes of this kind may own child nodes
    pub fn can_have_children(&self) -> bool {
        matches!(self, Self::ProjectGroup)
    }
}

impl FromStr for ObjectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "projectgroup" => Ok(Self::ProjectGroup),
            "project" => Ok(Self::Project),
            _ => Err(format!("unknown object kind {:?}", s)),
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A project group or project as persisted in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectNode {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub name: String,
    pub parent_id: Option<ObjectId>,
}

/// A parsed user-supplied object reference.
///
/// IDs are UUIDs and path segments are validated names, so the two syntaxes
/// never overlap: anything that parses as a UUID is treated as an ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectRef {
    Id(ObjectId),
    Path(Vec<String>),
}

impl ObjectRef {
    /// Parse a raw reference. Returns `None` for an empty path or a path with
    /// empty segments.
    pub fn parse(raw: &str) -> Option<Self> {
        if let Ok(id) = ObjectId::parse(raw) {
            return Some(Self::Id(id));
        }

        let segments: Vec<String> = raw.split('/').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return None;
        }
        Some(Self::Path(segments))
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{}", id),
            Self::Path(segments) => write!(f, "{}", segments.join("/")),
        }
    }
}
