//! Wallet context: the one object a host builds and shares.
//!
//! # Data Flow
//! ```text
//! host
//!   → Wallet::open(config) / Wallet::new(config, stores, connector)
//!   → initialize()           memoized: migrate legacy key, connect, resume session
//!   → auth.rs                authenticate / unlock / lock / auto-lock
//!   → keys.rs                add / switch / remove / rename / list
//!   → transactions.rs        collaborator contract, gas, sends
//! ```
//!
//! # Concurrency
//! - Every registry or session mutation runs under one async mutex
//! - The mutex is released before any network I/O; derived accounts are
//!   installed only if the session generation is unchanged
//! - Concurrent `initialize()` calls await the same shared future
//! - The auto-lock timer holds a weak reference and never keeps the wallet alive

mod auth;
mod keys;
mod transactions;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use secrecy::{ExposeSecret, SecretString};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;

use crate::config::WalletConfig;
use crate::error::{WalletError, WalletResult};
use crate::network::{AlloyConnector, ConnectionManager, RpcConnector};
use crate::registry::KeyRegistry;
use crate::session::{AutoLockPolicy, AutoLockTimer, SessionMachine, SessionStatus};
use crate::storage::{FileStore, KeyValueStore, MemoryStore, AUTO_LOCK_POLICY};
use crate::tx::{GasSettings, TransactionPipeline};
use crate::unix_millis;
use crate::vault::{decrypt, validate_key_format};

type InitFuture = Shared<BoxFuture<'static, WalletResult<()>>>;

pub(crate) struct WalletInner {
    store: Arc<dyn KeyValueStore>,
    session_store: Arc<dyn KeyValueStore>,
    registry: KeyRegistry,
    network: Arc<ConnectionManager>,
    gas: Arc<GasSettings>,
    pipeline: TransactionPipeline,
    session: AsyncMutex<SessionMachine>,
    timer: AutoLockTimer,
    init: Mutex<Option<InitFuture>>,
    ready: AtomicBool,
}

/// Cloneable handle to one wallet.
#[derive(Clone)]
pub struct Wallet {
    inner: Arc<WalletInner>,
}

impl Wallet {
    /// Build a wallet over the given stores and RPC connector. No I/O beyond
    /// reading the stores.
    pub fn new(
        config: WalletConfig,
        store: Arc<dyn KeyValueStore>,
        session_store: Arc<dyn KeyValueStore>,
        connector: Arc<dyn RpcConnector>,
    ) -> WalletResult<Self> {
        let registry = KeyRegistry::load(store.clone())?;
        let gas = Arc::new(GasSettings::new(&config.gas, store.clone())?);
        let network = Arc::new(ConnectionManager::new(config.network.clone(), connector));
        let pipeline = TransactionPipeline::new(network.clone(), gas.clone(), &config.retry, &config.transactions);

        let policy = match store.get(AUTO_LOCK_POLICY) {
            Some(label) => label.parse().unwrap_or_else(|e| {
                tracing::warn!(stored = %label, error = %e, "Ignoring stored auto-lock policy");
                config.session.default_auto_lock
            }),
            None => config.session.default_auto_lock,
        };

        Ok(Self {
            inner: Arc::new(WalletInner {
                store,
                session_store,
                registry,
                network,
                gas,
                pipeline,
                session: AsyncMutex::new(SessionMachine::new(policy)),
                timer: AutoLockTimer::new(),
                init: Mutex::new(None),
                ready: AtomicBool::new(false),
            }),
        })
    }

    /// Build a wallet from configuration: file-backed durable store, session
    /// store from `session_path` (memory when unset), alloy HTTP transport.
    pub fn open(config: WalletConfig) -> WalletResult<Self> {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(Path::new(&config.storage.data_path))?);
        let session_store: Arc<dyn KeyValueStore> = match &config.storage.session_path {
            Some(path) => Arc::new(FileStore::open(Path::new(path))?),
            None => Arc::new(MemoryStore::new()),
        };
        Self::new(config, store, session_store, Arc::new(AlloyConnector))
    }

    /// Run startup once: migrate a legacy key, connect, and try to resume a
    /// persisted session.
    ///
    /// Concurrent callers share the in-flight run. A failed run is forgotten
    /// so a later call starts afresh.
    pub async fn initialize(&self) -> WalletResult<()> {
        let fut = {
            let mut slot = self.inner.init.lock().unwrap_or_else(|e| e.into_inner());
            match slot.as_ref() {
                Some(fut) => fut.clone(),
                None => {
                    let wallet = self.clone();
                    let fut = async move { wallet.run_initialize().await }.boxed().shared();
                    *slot = Some(fut.clone());
                    fut
                }
            }
        };

        let result = fut.clone().await;
        if result.is_err() {
            let mut slot = self.inner.init.lock().unwrap_or_else(|e| e.into_inner());
            if slot.as_ref().is_some_and(|current| current.ptr_eq(&fut)) {
                *slot = None;
            }
        }
        result
    }

    async fn run_initialize(&self) -> WalletResult<()> {
        tracing::info!(keys = self.inner.registry.count(), "Initializing wallet");

        if let Some(id) = self.inner.registry.migrate_legacy_key()? {
            tracing::info!(key_id = %id, "Legacy key wrapped into registry");
        }

        if let Err(e) = self.inner.network.ensure_connected().await {
            tracing::error!(error = %e, "Starting without a chain connection");
        }

        self.inner.session.lock().await.mark_initialized();
        let resumed = match self.resume_session().await {
            Ok(resumed) => resumed,
            Err(e) => {
                tracing::warn!(error = %e, "Session resume failed");
                false
            }
        };

        self.inner.ready.store(true, Ordering::SeqCst);
        tracing::info!(resumed, "Wallet initialized");
        Ok(())
    }

    /// Whether `initialize()` has completed.
    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst)
    }

    /// Current session status.
    pub async fn status(&self) -> SessionStatus {
        self.inner.session.lock().await.status()
    }

    /// Anything but `Unlocked` counts as locked.
    pub async fn is_locked(&self) -> bool {
        !self.inner.session.lock().await.is_unlocked()
    }

    pub async fn auto_lock_policy(&self) -> AutoLockPolicy {
        self.inner.session.lock().await.policy()
    }

    /// Persist a new auto-lock policy and re-arm the timer if unlocked.
    pub async fn set_auto_lock_policy(&self, policy: AutoLockPolicy) -> WalletResult<()> {
        let mut machine = self.inner.session.lock().await;
        self.inner.store.put(AUTO_LOCK_POLICY, policy.label().to_string())?;
        machine.set_policy(policy);
        if machine.is_unlocked() {
            self.arm_timer(&machine);
        }
        tracing::info!(policy = %policy, "Auto-lock policy updated");
        Ok(())
    }

    /// Decrypt a record under a proof. `None` when the proof does not open it.
    fn decrypt_record(&self, id: &str, proof: &SecretString) -> WalletResult<Option<SecretString>> {
        let ciphertext = self.inner.registry.ciphertext(id)?;
        match decrypt(&ciphertext, proof.expose_secret()) {
            Ok(key) if validate_key_format(key.expose_secret()) => Ok(Some(key)),
            Ok(_) | Err(_) => Ok(None),
        }
    }

    /// Schedule auto-lock for whatever remains of the inactivity window,
    /// replacing any pending timer.
    fn arm_timer(&self, machine: &SessionMachine) {
        let Some(window) = machine.policy().duration() else {
            self.inner.timer.cancel();
            return;
        };
        let idle = machine
            .session()
            .map_or(0, |session| unix_millis().saturating_sub(session.last_activity));
        let after = window.saturating_sub(Duration::from_millis(idle));
        let weak = Arc::downgrade(&self.inner);
        self.inner.timer.start(after, move || async move {
            if let Some(inner) = weak.upgrade() {
                Wallet { inner }.lock_with_reason("auto").await;
            }
        });
    }

    /// Require an unlocked session.
    fn ensure_unlocked(machine: &SessionMachine) -> WalletResult<()> {
        if machine.is_unlocked() {
            Ok(())
        } else {
            Err(WalletError::Auth(format!("wallet is {}", machine.status())))
        }
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("keys", &self.inner.registry.count())
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}
