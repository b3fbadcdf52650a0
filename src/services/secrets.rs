//! Secret resolution
//!
//! Computes the secrets visible to a node. With `tree` the secrets of every
//! ancestor are included root first; with `remove_overridden` a name defined
//! closer to the node shadows the same name defined further up.

use std::collections::HashMap;

use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::instrument;

use super::hierarchy::HierarchyArena;
use super::resolver::resolve_object;
use crate::domain::{ObjectKind, Secret};
use crate::errors::Result;
use crate::storage::SecretRepository;

/// A secret together with the path of the node that owns it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSecret {
    pub secret: Secret,
    pub parent_path: String,
}

/// Query mode for [`get_secrets`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SecretQuery {
    /// Include secrets of all ancestors
    pub tree: bool,
    /// Keep only the occurrence closest to the node for each name. Has no
    /// effect without `tree` since names are unique within a node.
    pub remove_overridden: bool,
}

impl SecretQuery {
    pub fn direct() -> Self {
        Self::default()
    }

    pub fn tree() -> Self {
        Self { tree: true, remove_overridden: false }
    }

    pub fn effective() -> Self {
        Self { tree: true, remove_overridden: true }
    }
}

/// Collapse same-named entries of a root-to-leaf sequence.
///
/// The last occurrence of every name survives. Survivors are ordered by where
/// their name first appeared in `items`.
pub fn remove_overridden<T, F>(items: impl IntoIterator<Item = T>, name_of: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<T> = Vec::new();

    for item in items {
        match slots.get(name_of(&item)) {
            Some(&slot) => out[slot] = item,
            None => {
                slots.insert(name_of(&item).to_string(), out.len());
                out.push(item);
            }
        }
    }

    out
}

/// Secrets visible to the node `parent_ref` of kind `parent_type`
#[instrument(skip(conn), fields(parent_type = %parent_type, parent_ref = %parent_ref, tree = query.tree, remove_overridden = query.remove_overridden), name = "get_secrets")]
pub async fn get_secrets(
    conn: &mut SqliteConnection,
    parent_type: ObjectKind,
    parent_ref: &str,
    query: SecretQuery,
) -> Result<Vec<ResolvedSecret>> {
    let parent = resolve_object(conn, parent_type, parent_ref).await?;
    let arena = HierarchyArena::load(conn, &parent.id).await?;

    let chain = if query.tree { arena.ancestor_chain(&parent.id)? } else { vec![parent.id.clone()] };

    let mut collected = Vec::new();
    for node_id in &chain {
        let parent_path = arena.path_of(node_id)?;
        for secret in SecretRepository::list_by_parent(conn, node_id).await? {
            collected.push(ResolvedSecret { secret, parent_path: parent_path.clone() });
        }
    }

    if query.tree && query.remove_overridden {
        collected = remove_overridden(collected, |s| s.secret.name.as_str());
    }

    Ok(collected)
}
