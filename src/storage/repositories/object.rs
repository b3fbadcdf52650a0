//! Object repository for project groups and projects
//!
//! Every query runs against a caller-supplied connection so that resolution,
//! hierarchy walks and writes can share one transaction.

use crate::domain::{ObjectId, ObjectKind, ObjectNode};
use crate::errors::{CanopyError, Result};
use sqlx::{FromRow, SqliteConnection};
use tracing::instrument;

/// Database row structure for object nodes
#[derive(Debug, Clone, FromRow)]
struct ObjectRow {
    pub id: String,
    pub kind: String,
    pub name: String,
    pub parent_id: Option<String>,
}

impl TryFrom<ObjectRow> for ObjectNode {
    type Error = CanopyError;

    fn try_from(row: ObjectRow) -> Result<Self> {
        let kind = row.kind.parse::<ObjectKind>().map_err(|e| {
            CanopyError::internal(format!("object '{}' has corrupt kind: {}", row.id, e))
        })?;

        Ok(ObjectNode {
            id: ObjectId::from_string(row.id),
            kind,
            name: row.name,
            parent_id: row.parent_id.map(ObjectId::from_string),
        })
    }
}

const SELECT_OBJECT: &str = "SELECT id, kind, name, parent_id FROM objects";

/// Data access for object nodes
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectRepository;

impl ObjectRepository {
    /// Get an object by ID
    #[instrument(skip(conn), fields(object_id = %id), name = "db_get_object_by_id")]
    pub async fn get_by_id(
        conn: &mut SqliteConnection,
        id: &ObjectId,
    ) -> Result<Option<ObjectNode>> {
        let row = sqlx::query_as::<_, ObjectRow>(&format!("{} WHERE id = $1", SELECT_OBJECT))
            .bind(id.as_str())
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, object_id = %id, "Failed to get object by ID");
                CanopyError::database(e, format!("Failed to get object with ID '{}'", id))
            })?;

        row.map(ObjectNode::try_from).transpose()
    }

    /// Get the child of `parent_id` named `name`, or the root named `name`
    /// when `parent_id` is `None`
    #[instrument(skip(conn, parent_id), fields(parent_id = ?parent_id.map(ObjectId::as_str), object_name = %name), name = "db_get_object_by_name")]
    pub async fn get_child_by_name(
        conn: &mut SqliteConnection,
        parent_id: Option<&ObjectId>,
        name: &str,
    ) -> Result<Option<ObjectNode>> {
        let query = match parent_id {
            Some(parent_id) => {
                sqlx::query_as::<_, ObjectRow>(&format!(
                    "{} WHERE parent_id = $1 AND name = $2",
                    SELECT_OBJECT
                ))
                .bind(parent_id.as_str())
                .bind(name)
                .fetch_optional(&mut *conn)
                .await
            }
            None => {
                sqlx::query_as::<_, ObjectRow>(&format!(
                    "{} WHERE parent_id IS NULL AND name = $1",
                    SELECT_OBJECT
                ))
                .bind(name)
                .fetch_optional(&mut *conn)
                .await
            }
        };

        let row = query.map_err(|e| {
            tracing::error!(error = %e, object_name = %name, "Failed to get object by name");
            CanopyError::database(e, format!("Failed to get object named '{}'", name))
        })?;

        row.map(ObjectNode::try_from).transpose()
    }

    /// Fetch `id` together with every node reachable by following parent
    /// pointers. Rows come back unordered; `UNION` guarantees termination even
    /// if the stored parent relation contains a cycle.
    #[instrument(skip(conn), fields(object_id = %id), name = "db_fetch_object_lineage")]
    pub async fn fetch_lineage(
        conn: &mut SqliteConnection,
        id: &ObjectId,
    ) -> Result<Vec<ObjectNode>> {
        let rows = sqlx::query_as::<_, ObjectRow>(
            "WITH RECURSIVE lineage(id, kind, name, parent_id) AS ( \
                 SELECT id, kind, name, parent_id FROM objects WHERE id = $1 \
                 UNION \
                 SELECT o.id, o.kind, o.name, o.parent_id \
                 FROM objects o JOIN lineage l ON o.id = l.parent_id \
             ) \
             SELECT id, kind, name, parent_id FROM lineage",
        )
        .bind(id.as_str())
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, object_id = %id, "Failed to fetch object lineage");
            CanopyError::database(e, format!("Failed to fetch lineage of object '{}'", id))
        })?;

        rows.into_iter().map(ObjectNode::try_from).collect()
    }

    /// Number of direct children of a node
    #[instrument(skip(conn), fields(object_id = %id), name = "db_count_object_children")]
    pub async fn count_children(conn: &mut SqliteConnection, id: &ObjectId) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM objects WHERE parent_id = $1")
            .bind(id.as_str())
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| {
                CanopyError::database(e, format!("Failed to count children of object '{}'", id))
            })
    }

    /// Insert a new node
    #[instrument(skip(conn, node), fields(object_id = %node.id, object_name = %node.name), name = "db_insert_object")]
    pub async fn insert(conn: &mut SqliteConnection, node: &ObjectNode) -> Result<()> {
        sqlx::query("INSERT INTO objects (id, kind, name, parent_id) VALUES ($1, $2, $3, $4)")
            .bind(node.id.as_str())
            .bind(node.kind.as_str())
            .bind(&node.name)
            .bind(node.parent_id.as_ref().map(ObjectId::as_str))
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    return CanopyError::already_exists(format!(
                        "object named '{}' already exists under the same parent",
                        node.name
                    ));
                }
                tracing::error!(error = %e, object_name = %node.name, "Failed to insert object");
                CanopyError::database(e, format!("Failed to insert object '{}'", node.name))
            })?;

        tracing::info!(
            object_id = %node.id,
            object_name = %node.name,
            kind = %node.kind,
            "Created object"
        );
        Ok(())
    }

    /// Delete a node. Returns whether a row was removed.
    #[instrument(skip(conn), fields(object_id = %id), name = "db_delete_object")]
    pub async fn delete(conn: &mut SqliteConnection, id: &ObjectId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM objects WHERE id = $1")
            .bind(id.as_str())
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, object_id = %id, "Failed to delete object");
                CanopyError::database(e, format!("Failed to delete object '{}'", id))
            })?;

        Ok(result.rows_affected() > 0)
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error().map(|db_err| db_err.is_unique_violation()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::memory_pool;

    fn node(kind: ObjectKind, name: &str, parent: Option<&ObjectNode>) -> ObjectNode {
        ObjectNode {
            id: ObjectId::new(),
            kind,
            name: name.to_string(),
            parent_id: parent.map(|p| p.id.clone()),
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let root = node(ObjectKind::ProjectGroup, "acme", None);
        let project = node(ObjectKind::Project, "api", Some(&root));
        ObjectRepository::insert(&mut conn, &root).await.unwrap();
        ObjectRepository::insert(&mut conn, &project).await.unwrap();

        let fetched = ObjectRepository::get_by_id(&mut conn, &project.id).await.unwrap();
        assert_eq!(fetched, Some(project.clone()));

        let by_name =
            ObjectRepository::get_child_by_name(&mut conn, Some(&root.id), "api").await.unwrap();
        assert_eq!(by_name, Some(project));

        let root_by_name =
            ObjectRepository::get_child_by_name(&mut conn, None, "acme").await.unwrap();
        assert_eq!(root_by_name, Some(root.clone()));

        assert_eq!(ObjectRepository::count_children(&mut conn, &root.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sibling_names_are_unique() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let root = node(ObjectKind::ProjectGroup, "acme", None);
        ObjectRepository::insert(&mut conn, &root).await.unwrap();

        let err = ObjectRepository::insert(&mut conn, &node(ObjectKind::ProjectGroup, "acme", None))
            .await
            .unwrap_err();
        assert!(matches!(err, CanopyError::AlreadyExists { .. }));

        ObjectRepository::insert(&mut conn, &node(ObjectKind::Project, "api", Some(&root)))
            .await
            .unwrap();
        let err = ObjectRepository::insert(&mut conn, &node(ObjectKind::ProjectGroup, "api", Some(&root)))
            .await
            .unwrap_err();
        assert!(matches!(err, CanopyError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_fetch_lineage_returns_ancestors() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let root = node(ObjectKind::ProjectGroup, "acme", None);
        let child = node(ObjectKind::ProjectGroup, "platform", Some(&root));
        let project = node(ObjectKind::Project, "api", Some(&child));
        let unrelated = node(ObjectKind::ProjectGroup, "other", None);
        for n in [&root, &child, &project, &unrelated] {
            ObjectRepository::insert(&mut conn, n).await.unwrap();
        }

        let mut ids: Vec<String> = ObjectRepository::fetch_lineage(&mut conn, &project.id)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.id.into_string())
            .collect();
        ids.sort();

        let mut expected =
            vec![root.id.into_string(), child.id.into_string(), project.id.into_string()];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_delete() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let root = node(ObjectKind::ProjectGroup, "acme", None);
        ObjectRepository::insert(&mut conn, &root).await.unwrap();

        assert!(ObjectRepository::delete(&mut conn, &root.id).await.unwrap());
        assert!(!ObjectRepository::delete(&mut conn, &root.id).await.unwrap());
        assert_eq!(ObjectRepository::get_by_id(&mut conn, &root.id).await.unwrap(), None);
    }
}
