//! Content-side shortcut and variable caches.
//!
//! The caches are always either empty or a complete snapshot: a refresh
//! replaces the whole snapshot atomically instead of mutating it in
//! place, so the expansion path never observes a partial update.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::engine::variables::StaticVariable;
use crate::service::storage::{self, StorageArea};

/// One complete snapshot of the locally known triggers and variables.
#[derive(Debug, Default)]
pub struct CacheSnapshot {
    /// Normalized trigger keys, e.g. `/sig`.
    pub shortcuts: HashSet<String>,
    pub variables: Vec<StaticVariable>,
}

/// Cloneable handle to the current snapshot.
#[derive(Clone, Default)]
pub struct SharedCache {
    inner: Arc<RwLock<Arc<CacheSnapshot>>>,
}

impl SharedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot. Cheap to clone, never mutated in place.
    pub fn snapshot(&self) -> Arc<CacheSnapshot> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the whole snapshot.
    pub fn install(&self, snapshot: CacheSnapshot) {
        let snapshot = Arc::new(snapshot);
        match self.inner.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }

    pub fn contains_shortcut(&self, key: &str) -> bool {
        self.snapshot().shortcuts.contains(key)
    }

    /// Rebuild the snapshot from the shared storage area.
    pub fn reload_from(&self, storage: &StorageArea) {
        self.install(CacheSnapshot {
            shortcuts: storage.shortcuts().into_iter().collect(),
            variables: storage.variables(),
        });
    }
}

/// Listen for storage-change broadcasts and keep a cache in sync.
///
/// One of these runs per content context. A listener that lags behind the
/// broadcast just reloads the latest snapshot; the storage area always
/// holds the newest complete state.
pub fn spawn_sync(cache: SharedCache, storage: Arc<StorageArea>) -> JoinHandle<()> {
    let mut changes = storage.subscribe();
    tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(change) => {
                    let relevant = change.keys.iter().any(|key| {
                        key == storage::KEY_SHORTCUTS || key == storage::KEY_VARIABLES
                    });
                    if relevant {
                        cache.reload_from(&storage);
                    }
                }
                Err(RecvError::Lagged(_)) => cache.reload_from(&storage),
                Err(RecvError::Closed) => break,
            }
        }
    })
}
