// # Memory State Store
//
// In-memory implementation of StateStore.
//
// Nothing survives the process, so every run with a fresh store takes the
// bootstrap path (remote describe). Useful for tests and dry runs.

use std::sync::Arc;
use tokio::sync::RwLock;
use async_trait::async_trait;

use crate::traits::state_store::{StateStore, CachedState};
use crate::Error;

/// In-memory record cache
///
/// Clones share the same slot, so a test can keep a handle and inspect what
/// the reconciler wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<Option<CachedState>>>,
}

impl MemoryStateStore {
    /// Create a new empty memory state store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a cached record
    pub fn with_state(state: CachedState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(state))),
        }
    }

    /// Current contents
    pub async fn snapshot(&self) -> Option<CachedState> {
        self.inner.read().await.clone()
    }

    /// Drop the cached record
    pub async fn clear(&self) {
        *self.inner.write().await = None;
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<Option<CachedState>, Error> {
        Ok(self.inner.read().await.clone())
    }

    async fn store(&self, state: &CachedState) -> Result<(), Error> {
        *self.inner.write().await = Some(state.clone());
        Ok(())
    }
}
