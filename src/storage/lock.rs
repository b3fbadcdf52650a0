//! # Mutation Locks
//!
//! Mutual exclusion scoped to a key (in practice a parent object ID). A lock
//! is held by a [`LockGuard`] and released when the guard is dropped, so
//! early returns, errors and cancelled futures can never leak it.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::errors::{CanopyError, Result};

/// Source of scoped locks. Implementations may be backed by an external lock
/// service; the in-process [`LocalLockFactory`] serializes tasks of a single
/// instance.
#[async_trait]
pub trait LockFactory: Send + Sync {
    /// Block until the lock for `scope_key` is held or the acquire timeout
    /// elapses.
    async fn acquire(&self, scope_key: &str) -> Result<LockGuard>;
}

/// Held lock. Dropping it releases the lock.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard {
    scope_key: String,
    _inner: Box<dyn Send + Sync>,
}

impl LockGuard {
    pub fn new<G: Send + Sync + 'static>(scope_key: impl Into<String>, inner: G) -> Self {
        Self { scope_key: scope_key.into(), _inner: Box::new(inner) }
    }

    pub fn scope_key(&self) -> &str {
        &self.scope_key
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard").field("scope_key", &self.scope_key).finish()
    }
}

/// In-process lock factory keyed by scope
#[derive(Clone)]
pub struct LocalLockFactory {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
    acquire_timeout: Duration,
}

impl LocalLockFactory {
    pub fn new(acquire_timeout: Duration) -> Self {
        Self { locks: Arc::new(DashMap::new()), acquire_timeout }
    }

    /// Number of scopes currently tracked (held or awaited)
    pub fn active_scopes(&self) -> usize {
        self.locks.len()
    }
}

impl std::fmt::Debug for LocalLockFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalLockFactory")
            .field("active_scopes", &self.locks.len())
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

/// Releases the mutex and forgets the scope once nobody else references it
struct LocalLock {
    guard: Option<OwnedMutexGuard<()>>,
    scope_key: String,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl Drop for LocalLock {
    fn drop(&mut self) {
        self.guard.take();
        // The map's own reference is the only one left when no task holds or
        // awaits this scope.
        self.locks.remove_if(&self.scope_key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[async_trait]
impl LockFactory for LocalLockFactory {
    async fn acquire(&self, scope_key: &str) -> Result<LockGuard> {
        let mutex = self
            .locks
            .entry(scope_key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let guard = tokio::time::timeout(self.acquire_timeout, mutex.lock_owned())
            .await
            .map_err(|_| {
                CanopyError::internal(format!(
                    "timed out after {}ms acquiring lock {:?}",
                    self.acquire_timeout.as_millis(),
                    scope_key
                ))
            })?;

        let lock = LocalLock {
            guard: Some(guard),
            scope_key: scope_key.to_string(),
            locks: self.locks.clone(),
        };
        Ok(LockGuard::new(scope_key, lock))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_same_scope_is_exclusive() {
        let factory = LocalLockFactory::new(Duration::from_secs(5));
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let factory = factory.clone();
            let inside = inside.clone();
            let max_inside = max_inside.clone();
            handles.push(tokio::spawn(async move {
                let _guard = factory.acquire("secrets/parent-a").await.unwrap();
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_inside.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert_eq!(factory.active_scopes(), 0);
    }

    #[tokio::test]
    async fn test_different_scopes_do_not_contend() {
        let factory = LocalLockFactory::new(Duration::from_millis(200));
        let a = factory.acquire("secrets/parent-a").await.unwrap();
        let b = factory.acquire("secrets/parent-b").await.unwrap();
        assert_eq!(a.scope_key(), "secrets/parent-a");
        assert_eq!(b.scope_key(), "secrets/parent-b");
        assert_eq!(factory.active_scopes(), 2);
    }

    #[tokio::test]
    async fn test_acquire_times_out_while_held() {
        let factory = LocalLockFactory::new(Duration::from_millis(50));
        let _held = factory.acquire("secrets/parent-a").await.unwrap();

        let err = factory.acquire("secrets/parent-a").await.unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Internal);
    }

    #[tokio::test]
    async fn test_cancelled_holder_releases_lock() {
        let factory = LocalLockFactory::new(Duration::from_secs(1));

        let holder = {
            let factory = factory.clone();
            tokio::spawn(async move {
                let _guard = factory.acquire("secrets/parent-a").await.unwrap();
                tokio::time::sleep(Duration::from_secs(60)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        holder.abort();
        let _ = holder.await;

        let guard = factory.acquire("secrets/parent-a").await;
        assert!(guard.is_ok());
    }
}
