//! Hierarchy walking
//!
//! Nodes are held in an arena indexed by ID with a separate parent-pointer
//! map, so an ancestor chain costs O(depth) lookups and no node owns another.

use std::collections::{HashMap, HashSet};

use sqlx::SqliteConnection;
use tracing::instrument;

use crate::domain::{ObjectId, ObjectNode};
use crate::errors::{CanopyError, Result};
use crate::storage::ObjectRepository;

/// Arena of object nodes keyed by ID
#[derive(Debug, Clone, Default)]
pub struct HierarchyArena {
    nodes: HashMap<ObjectId, ObjectNode>,
    parents: HashMap<ObjectId, ObjectId>,
}

impl HierarchyArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an arena from already-fetched nodes
    pub fn from_nodes<I: IntoIterator<Item = ObjectNode>>(nodes: I) -> Self {
        let mut arena = Self::new();
        for node in nodes {
            arena.insert(node);
        }
        arena
    }

    /// Load `id` and all of its ancestors from the store
    #[instrument(skip(conn), fields(object_id = %id), name = "load_hierarchy")]
    pub async fn load(conn: &mut SqliteConnection, id: &ObjectId) -> Result<Self> {
        let lineage = ObjectRepository::fetch_lineage(conn, id).await?;
        Ok(Self::from_nodes(lineage))
    }

    pub fn insert(&mut self, node: ObjectNode) {
        match &node.parent_id {
            Some(parent_id) => {
                self.parents.insert(node.id.clone(), parent_id.clone());
            }
            None => {
                self.parents.remove(&node.id);
            }
        }
        self.nodes.insert(node.id.clone(), node);
    }

    pub fn get(&self, id: &ObjectId) -> Option<&ObjectNode> {
        self.nodes.get(id)
    }

    /// Ordered node IDs from the root down to `id` inclusive.
    ///
    /// Fails with `Internal` when the stored relation is not a tree: a parent
    /// pointer that loops, a parent that is missing, or a project acting as a
    /// parent.
    pub fn ancestor_chain(&self, id: &ObjectId) -> Result<Vec<ObjectId>> {
        Ok(self.ancestor_nodes(id)?.into_iter().map(|n| n.id.clone()).collect())
    }

    /// Like [`ancestor_chain`](Self::ancestor_chain) but yields the nodes
    pub fn ancestor_nodes(&self, id: &ObjectId) -> Result<Vec<&ObjectNode>> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut current = Some(id);

        while let Some(current_id) = current {
            if !visited.insert(current_id) {
                return Err(CanopyError::internal(format!(
                    "cycle detected in object hierarchy at {}",
                    current_id
                )));
            }

            let node = self.nodes.get(current_id).ok_or_else(|| {
                CanopyError::internal(format!("object {} missing from hierarchy", current_id))
            })?;

            if !chain.is_empty() && !node.kind.can_have_children() {
                return Err(CanopyError::internal(format!(
                    "project {} has child objects",
                    node.id
                )));
            }

            chain.push(node);
            current = self.parents.get(current_id);
        }

        chain.reverse();
        Ok(chain)
    }

    /// `/`-delimited path of names from the root to `id`
    pub fn path_of(&self, id: &ObjectId) -> Result<String> {
        let names: Vec<&str> =
            self.ancestor_nodes(id)?.into_iter().map(|n| n.name.as_str()).collect();
        Ok(names.join("/"))
    }
}
