//! Key registry: named, encrypted keys with a single active selection.
//!
//! # Data Flow
//! ```text
//! mutation (insert / activate / rename / remove / migrate)
//!     → copy of the cached metadata map, modified
//!     → one StoreOp batch (ciphertext + metadata + active pointer)
//!     → KeyValueStore::apply
//!     → cache replaced only after the batch committed
//! ```
//!
//! # Invariants
//! - At most one record is active, and exactly one while any exist
//! - Ids are unique and never change
//! - No two records share an address

pub mod record;

pub use record::{KeyRecord, Removal, PENDING_ADDRESS_LABEL};

use alloy::primitives::Address;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::error::{WalletError, WalletResult};
use crate::storage::{self, KeyValueStore, StoreOp};
use record::StoredMetadata;

/// Display name given to a migrated legacy key.
pub const LEGACY_KEY_NAME: &str = "Imported key";

type MetadataMap = BTreeMap<String, StoredMetadata>;

/// Store-backed registry of encrypted keys.
pub struct KeyRegistry {
    store: Arc<dyn KeyValueStore>,
    cache: RwLock<MetadataMap>,
}

impl KeyRegistry {
    /// Load the registry, repairing the active flag if it is inconsistent.
    pub fn load(store: Arc<dyn KeyValueStore>) -> WalletResult<Self> {
        let mut map: MetadataMap = match store.get(storage::KEY_METADATA) {
            Some(json) => serde_json::from_str(&json)?,
            None => MetadataMap::new(),
        };

        let pointer = store.get(storage::ACTIVE_KEY_ID);
        let active = pointer
            .filter(|id| map.contains_key(id))
            .or_else(|| {
                ordered_ids(&map)
                    .into_iter()
                    .find(|id| map.get(id).is_some_and(|m| m.is_active))
            })
            .or_else(|| ordered_ids(&map).into_iter().next());
        for (id, meta) in map.iter_mut() {
            meta.is_active = active.as_deref() == Some(id.as_str());
        }

        tracing::debug!(keys = map.len(), active = ?active, "Key registry loaded");

        Ok(Self {
            store,
            cache: RwLock::new(map),
        })
    }

    fn snapshot(&self) -> MetadataMap {
        self.cache.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Persist `map` together with `extra` ops, then publish it.
    fn commit(&self, map: MetadataMap, extra: Vec<StoreOp>) -> WalletResult<()> {
        let mut ops = extra;
        ops.push(StoreOp::put(storage::KEY_METADATA, serde_json::to_string(&map)?));
        match map.iter().find(|(_, m)| m.is_active) {
            Some((id, _)) => ops.push(StoreOp::put(storage::ACTIVE_KEY_ID, id.clone())),
            None => ops.push(StoreOp::delete(storage::ACTIVE_KEY_ID)),
        }
        self.store.apply(ops)?;
        *self.cache.write().unwrap_or_else(|e| e.into_inner()) = map;
        Ok(())
    }

    /// All records in creation order.
    pub fn list(&self) -> Vec<KeyRecord> {
        let map = self.snapshot();
        ordered_ids(&map)
            .into_iter()
            .filter_map(|id| map.get(&id).cloned().map(|m| m.into_record(id)))
            .collect()
    }

    /// Number of stored keys.
    pub fn count(&self) -> usize {
        self.cache.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Look up a record.
    pub fn get(&self, id: &str) -> Option<KeyRecord> {
        let map = self.cache.read().unwrap_or_else(|e| e.into_inner());
        map.get(id).cloned().map(|m| m.into_record(id.to_string()))
    }

    /// The active record.
    pub fn active(&self) -> Option<KeyRecord> {
        self.list().into_iter().find(|r| r.is_active)
    }

    /// Find the record holding `address`.
    pub fn find_by_address(&self, address: &Address) -> Option<KeyRecord> {
        self.list().into_iter().find(|r| r.matches_address(address))
    }

    /// Ciphertext of a record.
    pub fn ciphertext(&self, id: &str) -> WalletResult<String> {
        if !self.cache.read().unwrap_or_else(|e| e.into_inner()).contains_key(id) {
            return Err(WalletError::NotFound(id.to_string()));
        }
        self.store
            .get(&storage::key_ciphertext_key(id))
            .ok_or_else(|| WalletError::Storage(format!("ciphertext missing for key {}", id)))
    }

    /// Store a new encrypted key. The first key is always activated.
    pub fn insert(
        &self,
        name: &str,
        address: Option<Address>,
        ciphertext: String,
    ) -> WalletResult<KeyRecord> {
        let mut map = self.snapshot();
        if let Some(address) = address {
            if map.values().any(|m| m.address == Some(address)) {
                return Err(WalletError::Duplicate(address.to_checksum(None)));
            }
        }

        let id = Uuid::new_v4().to_string();
        let created_at = next_created_at(&map);
        let is_active = map.is_empty();
        map.insert(
            id.clone(),
            StoredMetadata {
                name: name.to_string(),
                address,
                created_at,
                is_active,
            },
        );

        self.commit(
            map,
            vec![StoreOp::put(storage::key_ciphertext_key(&id), ciphertext)],
        )?;
        tracing::info!(key_id = %id, name = %name, active = is_active, "Key stored");

        self.get(&id)
            .ok_or_else(|| WalletError::Storage(format!("key {} vanished after insert", id)))
    }

    /// Make `id` the only active record.
    pub fn set_active(&self, id: &str) -> WalletResult<()> {
        let mut map = self.snapshot();
        if !map.contains_key(id) {
            return Err(WalletError::NotFound(id.to_string()));
        }
        for (key_id, meta) in map.iter_mut() {
            meta.is_active = key_id == id;
        }
        self.commit(map, Vec::new())
    }

    /// Record the derived address of a record that had none.
    pub fn set_address(&self, id: &str, address: Address) -> WalletResult<()> {
        let mut map = self.snapshot();
        if map
            .iter()
            .any(|(key_id, m)| key_id != id && m.address == Some(address))
        {
            return Err(WalletError::Duplicate(address.to_checksum(None)));
        }
        let meta = map
            .get_mut(id)
            .ok_or_else(|| WalletError::NotFound(id.to_string()))?;
        if meta.address == Some(address) {
            return Ok(());
        }
        meta.address = Some(address);
        self.commit(map, Vec::new())
    }

    /// Change a display name.
    pub fn rename(&self, id: &str, name: &str) -> WalletResult<()> {
        let mut map = self.snapshot();
        let meta = map
            .get_mut(id)
            .ok_or_else(|| WalletError::NotFound(id.to_string()))?;
        meta.name = name.to_string();
        self.commit(map, Vec::new())
    }

    /// Delete a record and its ciphertext.
    ///
    /// When the active record is removed the earliest remaining record
    /// becomes active.
    pub fn remove(&self, id: &str) -> WalletResult<Removal> {
        let mut map = self.snapshot();
        let removed = map
            .remove(id)
            .ok_or_else(|| WalletError::NotFound(id.to_string()))?
            .into_record(id.to_string());

        if removed.is_active {
            if let Some(next) = ordered_ids(&map).into_iter().next() {
                if let Some(meta) = map.get_mut(&next) {
                    meta.is_active = true;
                }
            }
        }

        self.commit(map, vec![StoreOp::delete(storage::key_ciphertext_key(id))])?;
        let new_active = self.active();
        tracing::info!(
            key_id = %id,
            was_active = removed.is_active,
            new_active = ?new_active.as_ref().map(|r| r.id.as_str()),
            "Key removed"
        );

        Ok(Removal { removed, new_active })
    }

    /// Wrap a legacy single-key blob into a record.
    ///
    /// Only runs while the registry is empty. The new record and the deletion
    /// of the legacy blob commit together, so repeated calls are no-ops.
    /// Returns the new record id when a migration happened.
    pub fn migrate_legacy_key(&self) -> WalletResult<Option<String>> {
        let Some(legacy) = self.store.get(storage::LEGACY_KEY) else {
            return Ok(None);
        };
        if self.count() > 0 {
            tracing::debug!("Legacy key present alongside registry records, leaving it untouched");
            return Ok(None);
        }

        let id = Uuid::new_v4().to_string();
        let mut map = MetadataMap::new();
        map.insert(
            id.clone(),
            StoredMetadata {
                name: LEGACY_KEY_NAME.to_string(),
                address: None,
                created_at: crate::unix_millis(),
                is_active: true,
            },
        );

        self.commit(
            map,
            vec![
                StoreOp::put(storage::key_ciphertext_key(&id), legacy),
                StoreOp::delete(storage::LEGACY_KEY),
            ],
        )?;
        tracing::info!(key_id = %id, "Migrated legacy key");
        Ok(Some(id))
    }
}

impl std::fmt::Debug for KeyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRegistry")
            .field("keys", &self.count())
            .finish()
    }
}

/// Ids ordered by creation time, ties broken by id.
fn ordered_ids(map: &MetadataMap) -> Vec<String> {
    let mut ids: Vec<(&u64, &String)> = map.iter().map(|(id, m)| (&m.created_at, id)).collect();
    ids.sort();
    ids.into_iter().map(|(_, id)| id.clone()).collect()
}

/// Creation timestamps are strictly increasing so insertion order survives
/// same-millisecond imports.
fn next_created_at(map: &MetadataMap) -> u64 {
    let latest = map.values().map(|m| m.created_at).max().unwrap_or(0);
    crate::unix_millis().max(latest + 1)
}
