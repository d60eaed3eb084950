//! Durable JSON-file store.

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::{WalletError, WalletResult};
use crate::storage::{KeyValueStore, StoreOp};

/// A store persisted as one JSON object on disk.
///
/// Every committed batch rewrites the file through a temporary sibling and a
/// rename, then updates the in-memory copy. If the write fails the in-memory
/// copy is left untouched.
#[derive(Debug, Clone)]
pub struct FileStore {
    inner: Arc<DashMap<String, String>>,
    path: PathBuf,
    commit: Arc<RwLock<()>>,
}

impl FileStore {
    /// Open a store, loading the file if it exists.
    pub fn open(path: impl AsRef<Path>) -> WalletResult<Self> {
        let path = path.as_ref().to_path_buf();
        let inner = Arc::new(DashMap::new());

        if path.exists() {
            let file = File::open(&path)?;
            let reader = BufReader::new(file);
            let map: BTreeMap<String, String> = serde_json::from_reader(reader)?;
            for (k, v) in map {
                inner.insert(k, v);
            }
            tracing::debug!(path = %path.display(), entries = inner.len(), "Loaded wallet state");
        }

        Ok(Self {
            inner,
            path,
            commit: Arc::new(RwLock::new(())),
        })
    }

    fn write_snapshot(&self, snapshot: &BTreeMap<String, String>) -> WalletResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        {
            let file = File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, snapshot)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path).map_err(|e| {
            WalletError::Storage(format!("failed to replace {}: {}", self.path.display(), e))
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.commit.read().unwrap_or_else(|e| e.into_inner());
        self.inner.get(key).map(|r| r.value().clone())
    }

    fn apply(&self, ops: Vec<StoreOp>) -> WalletResult<()> {
        let _guard = self.commit.write().unwrap_or_else(|e| e.into_inner());

        let mut snapshot: BTreeMap<String, String> = self
            .inner
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        for op in &ops {
            match op {
                StoreOp::Put(key, value) => {
                    snapshot.insert(key.clone(), value.clone());
                }
                StoreOp::Delete(key) => {
                    snapshot.remove(key);
                }
            }
        }

        self.write_snapshot(&snapshot)?;

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
