//! In-memory store.

use dashmap::DashMap;
use std::sync::{Arc, RwLock};

use crate::error::WalletResult;
use crate::storage::{KeyValueStore, StoreOp};

/// A thread-safe in-memory store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<DashMap<String, String>>,
    /// Serializes batches so readers never observe half of one.
    commit: Arc<RwLock<()>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.iter().map(|r| r.key().clone()).collect();
        keys.sort();
        keys
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.commit.read().unwrap_or_else(|e| e.into_inner());
        self.inner.get(key).map(|r| r.value().clone())
    }

    fn apply(&self, ops: Vec<StoreOp>) -> WalletResult<()> {
        let _guard = self.commit.write().unwrap_or_else(|e| e.into_inner());
        for op in ops {
            match op {
                StoreOp::Put(key, value) => {
                    self.inner.insert(key, value);
                }
                StoreOp::Delete(key) => {
                    self.inner.remove(&key);
                }
            }
        }
        Ok(())
    }
}
