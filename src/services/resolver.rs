//! Object reference resolution
//!
//! Turns a user-supplied reference (an object ID or a `/`-delimited path of
//! names from a root group) into the node it denotes. Resolution runs on the
//! caller's connection so that it shares the caller's snapshot.

use sqlx::SqliteConnection;
use tracing::instrument;

use crate::domain::{ObjectId, ObjectKind, ObjectNode, ObjectRef};
use crate::errors::{CanopyError, Result};
use crate::storage::ObjectRepository;

/// Parse an object kind supplied by a caller
pub fn parse_object_kind(raw: &str) -> Result<ObjectKind> {
    raw.parse::<ObjectKind>()
        .map_err(|_| CanopyError::bad_request_field(format!("invalid object kind {:?}", raw), "kind"))
}

/// Resolve `raw_ref` to a node of `kind`
#[instrument(skip(conn), fields(kind = %kind, object_ref = %raw_ref), name = "resolve_object")]
pub async fn resolve_object(
    conn: &mut SqliteConnection,
    kind: ObjectKind,
    raw_ref: &str,
) -> Result<ObjectNode> {
    let object_ref = ObjectRef::parse(raw_ref).ok_or_else(|| {
        CanopyError::bad_request_field(format!("malformed {} reference {:?}", kind, raw_ref), "ref")
    })?;

    let node = match &object_ref {
        ObjectRef::Id(id) => ObjectRepository::get_by_id(conn, id).await?,
        ObjectRef::Path(segments) => walk_path(conn, segments).await?,
    };

    match node {
        Some(node) if node.kind == kind => Ok(node),
        _ => Err(CanopyError::not_exist(format!("{} {:?} doesn't exist", kind, raw_ref))),
    }
}

/// Resolve `raw_ref` to the ID of a node of `kind`
pub async fn resolve_object_id(
    conn: &mut SqliteConnection,
    kind: ObjectKind,
    raw_ref: &str,
) -> Result<ObjectId> {
    Ok(resolve_object(conn, kind, raw_ref).await?.id)
}

async fn walk_path(
    conn: &mut SqliteConnection,
    segments: &[String],
) -> Result<Option<ObjectNode>> {
    let mut current: Option<ObjectNode> = None;
    for segment in segments {
        let parent_id = current.as_ref().map(|n| &n.id);
        match ObjectRepository::get_child_by_name(conn, parent_id, segment).await? {
            Some(node) => current = Some(node),
            None => return Ok(None),
        }
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::storage::test_support::memory_pool;

    async fn insert(
        conn: &mut SqliteConnection,
        kind: ObjectKind,
        name: &str,
        parent: Option<&ObjectNode>,
    ) -> ObjectNode {
        let node = ObjectNode {
            id: ObjectId::new(),
            kind,
            name: name.to_string(),
            parent_id: parent.map(|p| p.id.clone()),
        };
        ObjectRepository::insert(conn, &node).await.unwrap();
        node
    }

    #[test]
    fn test_parse_object_kind() {
        assert_eq!(parse_object_kind("project").unwrap(), ObjectKind::Project);
        assert_eq!(parse_object_kind("projectgroup").unwrap(), ObjectKind::ProjectGroup);
        assert_eq!(parse_object_kind("org").unwrap_err().kind(), ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn test_id_and_path_resolve_to_same_node() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let root = insert(&mut conn, ObjectKind::ProjectGroup, "acme", None).await;
        let group = insert(&mut conn, ObjectKind::ProjectGroup, "platform", Some(&root)).await;
        let project = insert(&mut conn, ObjectKind::Project, "api", Some(&group)).await;

        let by_path =
            resolve_object_id(&mut conn, ObjectKind::Project, "acme/platform/api").await.unwrap();
        let by_id =
            resolve_object_id(&mut conn, ObjectKind::Project, project.id.as_str()).await.unwrap();
        assert_eq!(by_path, project.id);
        assert_eq!(by_id, project.id);

        let root_id = resolve_object_id(&mut conn, ObjectKind::ProjectGroup, "acme").await.unwrap();
        assert_eq!(root_id, root.id);
    }

    #[tokio::test]
    async fn test_kind_mismatch_is_not_exist() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let root = insert(&mut conn, ObjectKind::ProjectGroup, "acme", None).await;
        let project = insert(&mut conn, ObjectKind::Project, "api", Some(&root)).await;

        let err = resolve_object(&mut conn, ObjectKind::ProjectGroup, "acme/api").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotExist);

        let err = resolve_object(&mut conn, ObjectKind::Project, root.id.as_str()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotExist);

        assert!(resolve_object(&mut conn, ObjectKind::Project, project.id.as_str()).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_refs() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        insert(&mut conn, ObjectKind::ProjectGroup, "acme", None).await;

        let err = resolve_object(&mut conn, ObjectKind::ProjectGroup, "acme/missing").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotExist);

        let missing_id = ObjectId::new();
        let err = resolve_object(&mut conn, ObjectKind::ProjectGroup, missing_id.as_str())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotExist);

        let err = resolve_object(&mut conn, ObjectKind::ProjectGroup, "acme//x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }
}
