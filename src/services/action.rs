//! Mutation coordination
//!
//! [`ActionHandler`] is the entry point for every operation on objects and
//! secrets. Mutations are gated by [`MaintenanceMode`] and serialized per
//! parent: the parent is resolved, its lock is taken, and only then does a
//! write transaction re-check existence and uniqueness and persist the change.
//! The lock guard and the transaction are both dropped on every exit path, so
//! an error or a cancelled request rolls back and releases the lock.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use sqlx::{Sqlite, Transaction};
use tracing::{info, instrument};

use super::hierarchy::HierarchyArena;
use super::maintenance::MaintenanceMode;
use super::resolver::{resolve_object, resolve_object_id};
use super::secrets::{get_secrets, ResolvedSecret, SecretQuery};
use crate::domain::{ObjectId, ObjectKind, ObjectNode, Secret, SecretId, SecretPayload};
use crate::errors::{CanopyError, Result};
use crate::observability::MetricsRecorder;
use crate::storage::{DbPool, LockFactory, LockGuard, ObjectRepository, SecretRepository};
use crate::validation::ensure_valid_name;

/// Create secret request
#[derive(Debug, Clone)]
pub struct CreateSecretRequest {
    pub name: String,
    pub payload: SecretPayload,
}

/// Update secret request. Name, type and payload are all replaced.
#[derive(Debug, Clone)]
pub struct UpdateSecretRequest {
    pub name: String,
    pub payload: SecretPayload,
}

/// Object node as presented to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectView {
    pub id: ObjectId,
    pub name: String,
    pub kind: ObjectKind,
    pub path: String,
    pub parent_id: Option<ObjectId>,
}

/// Entry point for reads and mutations of objects and secrets
#[derive(Clone)]
pub struct ActionHandler {
    pool: DbPool,
    locks: Arc<dyn LockFactory>,
    maintenance: Arc<MaintenanceMode>,
    metrics: MetricsRecorder,
}

impl std::fmt::Debug for ActionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionHandler").field("maintenance", &self.maintenance).finish()
    }
}

fn secret_lock_key(parent_id: &ObjectId) -> String {
    format!("secrets/{}", parent_id)
}

fn object_lock_key(parent_id: Option<&ObjectId>) -> String {
    match parent_id {
        Some(parent_id) => format!("objects/{}", parent_id),
        None => "objects/".to_string(),
    }
}

fn outcome<T>(result: &Result<T>) -> String {
    match result {
        Ok(_) => "ok".to_string(),
        Err(e) => e.kind().to_string(),
    }
}

impl ActionHandler {
    pub fn new(
        pool: DbPool,
        locks: Arc<dyn LockFactory>,
        maintenance: Arc<MaintenanceMode>,
    ) -> Self {
        Self { pool, locks, maintenance, metrics: MetricsRecorder::new() }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn maintenance(&self) -> &Arc<MaintenanceMode> {
        &self.maintenance
    }

    pub fn maintenance_enabled(&self) -> Result<bool> {
        self.maintenance.is_enabled()
    }

    /// Toggle maintenance mode, returning the previous state
    pub fn set_maintenance(&self, enabled: bool) -> Result<bool> {
        self.maintenance.set(enabled)
    }

    /// Fail with `Maintenance` while mutations are rejected
    pub fn ensure_writable(&self, operation: &'static str) -> Result<()> {
        self.maintenance.ensure_writable().inspect_err(|e| {
            if matches!(e, CanopyError::Maintenance { .. }) {
                self.metrics.record_maintenance_rejection(operation);
            }
        })
    }

    async fn read_tx(&self) -> Result<Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .map_err(|e| CanopyError::database(e, "Failed to begin read transaction"))
    }

    /// Write transactions take SQLite's write lock up front so that a read
    /// followed by a write never fails on a stale snapshot.
    async fn write_tx(&self) -> Result<Transaction<'static, Sqlite>> {
        self.pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(|e| CanopyError::database(e, "Failed to begin write transaction"))
    }

    async fn lock(&self, scope_key: String) -> Result<LockGuard> {
        let started = Instant::now();
        let guard = self.locks.acquire(&scope_key).await;
        self.metrics.record_lock_wait(started.elapsed());
        guard
    }

    async fn commit(tx: Transaction<'static, Sqlite>) -> Result<()> {
        tx.commit().await.map_err(|e| CanopyError::database(e, "Failed to commit transaction"))
    }

    /// Resolve a reference to an object ID
    pub async fn resolve(&self, kind: ObjectKind, raw_ref: &str) -> Result<ObjectId> {
        let mut tx = self.read_tx().await?;
        resolve_object_id(&mut tx, kind, raw_ref).await
    }

    /// Secrets visible to a node
    pub async fn get_secrets(
        &self,
        parent_type: ObjectKind,
        parent_ref: &str,
        query: SecretQuery,
    ) -> Result<Vec<ResolvedSecret>> {
        let mut tx = self.read_tx().await?;
        let secrets = get_secrets(&mut tx, parent_type, parent_ref, query).await?;
        self.metrics.record_secret_query(query.tree, query.remove_overridden, secrets.len());
        Ok(secrets)
    }

    /// Create a secret under a node
    pub async fn create_secret(
        &self,
        parent_type: ObjectKind,
        parent_ref: &str,
        request: CreateSecretRequest,
    ) -> Result<ResolvedSecret> {
        let result = self.create_secret_inner(parent_type, parent_ref, request).await;
        self.metrics.record_mutation("secret", "create", &outcome(&result));
        result
    }

    #[instrument(skip(self, request), fields(parent_type = %parent_type, parent_ref = %parent_ref, secret_name = %request.name), name = "create_secret")]
    async fn create_secret_inner(
        &self,
        parent_type: ObjectKind,
        parent_ref: &str,
        request: CreateSecretRequest,
    ) -> Result<ResolvedSecret> {
        self.ensure_writable("create_secret")?;
        ensure_valid_name(&request.name, "name")?;
        request.payload.validate().map_err(|e| CanopyError::bad_request(e.to_string()))?;

        let parent_id = self.resolve(parent_type, parent_ref).await?;
        let _guard = self.lock(secret_lock_key(&parent_id)).await?;

        let mut tx = self.write_tx().await?;
        let parent_path = parent_path_in(&mut tx, parent_type, &parent_id).await?;

        if SecretRepository::get_by_name(&mut tx, &parent_id, &request.name).await?.is_some() {
            return Err(CanopyError::already_exists(format!(
                "secret with name {:?} for {} with id {:?} already exists",
                request.name, parent_type, parent_id.as_str()
            )));
        }

        let secret = Secret {
            id: SecretId::new(),
            name: request.name,
            parent_type,
            parent_id,
            payload: request.payload,
        };
        SecretRepository::insert(&mut tx, &secret).await?;
        Self::commit(tx).await?;

        Ok(ResolvedSecret { secret, parent_path })
    }

    /// Replace the secret named `existing_name` under a node
    pub async fn update_secret(
        &self,
        parent_type: ObjectKind,
        parent_ref: &str,
        existing_name: &str,
        request: UpdateSecretRequest,
    ) -> Result<ResolvedSecret> {
        let result = self.update_secret_inner(parent_type, parent_ref, existing_name, request).await;
        self.metrics.record_mutation("secret", "update", &outcome(&result));
        result
    }

    #[instrument(skip(self, request), fields(parent_type = %parent_type, parent_ref = %parent_ref, secret_name = %existing_name, new_name = %request.name), name = "update_secret")]
    async fn update_secret_inner(
        &self,
        parent_type: ObjectKind,
        parent_ref: &str,
        existing_name: &str,
        request: UpdateSecretRequest,
    ) -> Result<ResolvedSecret> {
        self.ensure_writable("update_secret")?;
        ensure_valid_name(&request.name, "name")?;
        request.payload.validate().map_err(|e| CanopyError::bad_request(e.to_string()))?;

        let parent_id = self.resolve(parent_type, parent_ref).await?;
        let _guard = self.lock(secret_lock_key(&parent_id)).await?;

        let mut tx = self.write_tx().await?;
        let parent_path = parent_path_in(&mut tx, parent_type, &parent_id).await?;

        let existing = SecretRepository::get_by_name(&mut tx, &parent_id, existing_name)
            .await?
            .ok_or_else(|| {
                CanopyError::not_exist(format!("secret with name {:?} doesn't exist", existing_name))
            })?;

        if request.name != existing.name
            && SecretRepository::get_by_name(&mut tx, &parent_id, &request.name).await?.is_some()
        {
            return Err(CanopyError::already_exists(format!(
                "secret with name {:?} for {} with id {:?} already exists",
                request.name, parent_type, parent_id.as_str()
            )));
        }

        let secret = Secret { name: request.name, payload: request.payload, ..existing };
        SecretRepository::update(&mut tx, &secret).await?;
        Self::commit(tx).await?;

        Ok(ResolvedSecret { secret, parent_path })
    }

    /// Delete the secret named `name` under a node
    pub async fn delete_secret(
        &self,
        parent_type: ObjectKind,
        parent_ref: &str,
        name: &str,
    ) -> Result<()> {
        let result = self.delete_secret_inner(parent_type, parent_ref, name).await;
        self.metrics.record_mutation("secret", "delete", &outcome(&result));
        result
    }

    #[instrument(skip(self), fields(parent_type = %parent_type, parent_ref = %parent_ref, secret_name = %name), name = "delete_secret")]
    async fn delete_secret_inner(
        &self,
        parent_type: ObjectKind,
        parent_ref: &str,
        name: &str,
    ) -> Result<()> {
        self.ensure_writable("delete_secret")?;

        let parent_id = self.resolve(parent_type, parent_ref).await?;
        let _guard = self.lock(secret_lock_key(&parent_id)).await?;

        let mut tx = self.write_tx().await?;
        if !SecretRepository::delete_by_name(&mut tx, &parent_id, name).await? {
            return Err(CanopyError::not_exist(format!(
                "secret with name {:?} doesn't exist",
                name
            )));
        }
        Self::commit(tx).await
    }

    /// Create a project group. Without a parent the group becomes a root.
    pub async fn create_project_group(
        &self,
        parent_ref: Option<&str>,
        name: &str,
    ) -> Result<ObjectView> {
        let result = self.create_object(ObjectKind::ProjectGroup, parent_ref, name).await;
        self.metrics.record_mutation("projectgroup", "create", &outcome(&result));
        result
    }

    /// Create a project under a project group
    pub async fn create_project(&self, parent_ref: &str, name: &str) -> Result<ObjectView> {
        let result = self.create_object(ObjectKind::Project, Some(parent_ref), name).await;
        self.metrics.record_mutation("project", "create", &outcome(&result));
        result
    }

    #[instrument(skip(self), fields(kind = %kind, parent_ref = ?parent_ref, object_name = %name), name = "create_object")]
    async fn create_object(
        &self,
        kind: ObjectKind,
        parent_ref: Option<&str>,
        name: &str,
    ) -> Result<ObjectView> {
        self.ensure_writable("create_object")?;
        ensure_valid_name(name, "name")?;

        let parent_id = match parent_ref {
            Some(parent_ref) => Some(self.resolve(ObjectKind::ProjectGroup, parent_ref).await?),
            None if kind == ObjectKind::ProjectGroup => None,
            None => {
                return Err(CanopyError::bad_request_field(
                    "a project requires a parent project group",
                    "parent_ref",
                ))
            }
        };
        let _guard = self.lock(object_lock_key(parent_id.as_ref())).await?;

        let mut tx = self.write_tx().await?;
        if let Some(parent_id) = &parent_id {
            // The parent may have been removed since it was resolved
            ObjectRepository::get_by_id(&mut tx, parent_id).await?.ok_or_else(|| {
                CanopyError::not_exist(format!("project group {:?} doesn't exist", parent_id.as_str()))
            })?;
        }

        if ObjectRepository::get_child_by_name(&mut tx, parent_id.as_ref(), name).await?.is_some() {
            return Err(CanopyError::already_exists(format!(
                "object with name {:?} already exists in the parent project group",
                name
            )));
        }

        let node = ObjectNode { id: ObjectId::new(), kind, name: name.to_string(), parent_id };
        ObjectRepository::insert(&mut tx, &node).await?;
        let view = object_view(&mut tx, node).await?;
        Self::commit(tx).await?;

        info!(object_id = %view.id, path = %view.path, kind = %kind, "Object created");
        Ok(view)
    }

    /// Look up a node
    pub async fn get_object(&self, kind: ObjectKind, raw_ref: &str) -> Result<ObjectView> {
        let mut tx = self.read_tx().await?;
        let node = resolve_object(&mut tx, kind, raw_ref).await?;
        object_view(&mut tx, node).await
    }

    /// Delete a node and its secrets. Groups with children cannot be deleted.
    pub async fn delete_object(&self, kind: ObjectKind, raw_ref: &str) -> Result<()> {
        let result = self.delete_object_inner(kind, raw_ref).await;
        self.metrics.record_mutation(kind.as_str(), "delete", &outcome(&result));
        result
    }

    #[instrument(skip(self), fields(kind = %kind, object_ref = %raw_ref), name = "delete_object")]
    async fn delete_object_inner(&self, kind: ObjectKind, raw_ref: &str) -> Result<()> {
        self.ensure_writable("delete_object")?;

        let node = {
            let mut tx = self.read_tx().await?;
            resolve_object(&mut tx, kind, raw_ref).await?
        };
        let _guard = self.lock(object_lock_key(node.parent_id.as_ref())).await?;

        let mut tx = self.write_tx().await?;
        if ObjectRepository::count_children(&mut tx, &node.id).await? > 0 {
            return Err(CanopyError::bad_request(format!(
                "{} {:?} still has child objects",
                kind, raw_ref
            )));
        }
        if !ObjectRepository::delete(&mut tx, &node.id).await? {
            return Err(CanopyError::not_exist(format!("{} {:?} doesn't exist", kind, raw_ref)));
        }
        Self::commit(tx).await?;

        info!(object_id = %node.id, kind = %kind, "Object deleted");
        Ok(())
    }
}

/// Path of `parent_id` within the write transaction, which also confirms that
/// the parent still exists with the expected kind
async fn parent_path_in(
    tx: &mut Transaction<'static, Sqlite>,
    parent_type: ObjectKind,
    parent_id: &ObjectId,
) -> Result<String> {
    let arena = HierarchyArena::load(tx, parent_id).await?;
    match arena.get(parent_id) {
        Some(node) if node.kind == parent_type => arena.path_of(parent_id),
        _ => Err(CanopyError::not_exist(format!(
            "{} with id {:?} doesn't exist",
            parent_type,
            parent_id.as_str()
        ))),
    }
}

async fn object_view(tx: &mut Transaction<'static, Sqlite>, node: ObjectNode) -> Result<ObjectView> {
    let arena = HierarchyArena::load(tx, &node.id).await?;
    let path = arena.path_of(&node.id)?;
    Ok(ObjectView { id: node.id, name: node.name, kind: node.kind, path, parent_id: node.parent_id })
}
