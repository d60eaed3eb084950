//! Persisted key-value state.
//!
//! # Data Flow
//! ```text
//! KeyRegistry / GasSettings / session token
//!     → KeyValueStore::apply(batch)   (all-or-nothing commit)
//!     → memory.rs (DashMap, ephemeral)
//!     → file.rs   (DashMap + JSON file, durable)
//! ```
//!
//! # Design Decisions
//! - Values are strings; callers own their encoding (JSON, base64)
//! - Writes are batched so a multi-key mutation commits as a unit
//! - Stores are shared as `Arc<dyn KeyValueStore>` and injected by the host

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::WalletResult;

/// Durable key for the ciphertext of one key record.
pub fn key_ciphertext_key(id: &str) -> String {
    format!("wallet.key.{}", id)
}

/// Durable key for the id → metadata map.
pub const KEY_METADATA: &str = "wallet.key_metadata";

/// Durable key for the active key id pointer.
pub const ACTIVE_KEY_ID: &str = "wallet.active_key_id";

/// Durable key for the user's gas price limit.
pub const GAS_PRICE_LIMIT: &str = "wallet.gas_price_limit";

/// Durable key for the auto-lock policy.
pub const AUTO_LOCK_POLICY: &str = "wallet.auto_lock";

/// Durable key for the pre-multi-key single ciphertext.
pub const LEGACY_KEY: &str = "wallet.legacy_key";

/// Session-store key for the resume token.
pub const SESSION_TOKEN: &str = "wallet.session";

/// One write in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Put(String, String),
    Delete(String),
}

impl StoreOp {
    pub fn put(key: impl Into<String>, value: impl Into<String>) -> Self {
        StoreOp::Put(key.into(), value.into())
    }

    pub fn delete(key: impl Into<String>) -> Self {
        StoreOp::Delete(key.into())
    }
}

/// String key-value storage.
pub trait KeyValueStore: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Option<String>;

    /// Commit a batch of writes. Either every op is visible afterwards or none is.
    fn apply(&self, ops: Vec<StoreOp>) -> WalletResult<()>;

    /// Write a single value.
    fn put(&self, key: &str, value: String) -> WalletResult<()> {
        self.apply(vec![StoreOp::Put(key.to_string(), value)])
    }

    /// Delete a single value.
    fn delete(&self, key: &str) -> WalletResult<()> {
        self.apply(vec![StoreOp::Delete(key.to_string())])
    }
}
