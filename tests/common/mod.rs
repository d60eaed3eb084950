//! Shared utilities for integration testing: an in-process programmable chain.

#![allow(dead_code)]

use alloy::primitives::{keccak256, Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

use dapp_wallet::config::WalletConfig;
use dapp_wallet::network::{ChainRpc, Receipt, RpcConnector};
use dapp_wallet::storage::MemoryStore;
use dapp_wallet::{Wallet, WalletError, WalletResult};

/// Anvil's first two well-known dev keys.
pub const KEY_1: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const KEY_2: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
pub const ADDR_1: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
pub const ADDR_2: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";

pub const GWEI: u128 = 1_000_000_000;

/// How receipts come back for broadcast transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptMode {
    Success,
    Reverted,
    Never,
}

/// One fake endpoint. Everything is adjustable while tests run.
pub struct MockEndpoint {
    pub chain_id: AtomicU64,
    pub up: AtomicBool,
    /// Every call stalls for an hour before answering.
    pub hang: AtomicBool,
    pub gas_price: Mutex<Option<u128>>,
    pub estimate: Mutex<Option<u64>>,
    pub nonce: AtomicU64,
    pub receipts: Mutex<ReceiptMode>,
    pub sent: Mutex<Vec<Bytes>>,
    pub calls: AtomicUsize,
    pub estimates: Mutex<Vec<TransactionRequest>>,
}

impl MockEndpoint {
    pub fn new(chain_id: u64) -> Arc<Self> {
        Arc::new(Self {
            chain_id: AtomicU64::new(chain_id),
            up: AtomicBool::new(true),
            hang: AtomicBool::new(false),
            gas_price: Mutex::new(Some(3 * GWEI)),
            estimate: Mutex::new(Some(50_000)),
            nonce: AtomicU64::new(7),
            receipts: Mutex::new(ReceiptMode::Success),
            sent: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            estimates: Mutex::new(Vec::new()),
        })
    }

    pub fn down() -> Arc<Self> {
        let endpoint = Self::new(0);
        endpoint.up.store(false, Ordering::SeqCst);
        endpoint
    }

    pub fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Bytes> {
        self.sent.lock().unwrap().clone()
    }

    async fn check(&self) -> WalletResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3_600)).await;
        }
        if self.up.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(WalletError::Rpc("connection refused".into()))
        }
    }
}

struct MockRpc(Arc<MockEndpoint>);

#[async_trait]
impl ChainRpc for MockRpc {
    async fn chain_id(&self) -> WalletResult<u64> {
        self.0.check().await?;
        Ok(self.0.chain_id.load(Ordering::SeqCst))
    }

    async fn block_number(&self) -> WalletResult<u64> {
        self.0.check().await?;
        Ok(1_000)
    }

    async fn gas_price(&self) -> WalletResult<u128> {
        self.0.check().await?;
        (*self.0.gas_price.lock().unwrap()).ok_or_else(|| WalletError::Rpc("gas price unavailable".into()))
    }

    async fn balance(&self, _address: Address) -> WalletResult<U256> {
        self.0.check().await?;
        Ok(U256::from(10u64).pow(U256::from(18u64)))
    }

    async fn pending_nonce(&self, _address: Address) -> WalletResult<u64> {
        self.0.check().await?;
        Ok(self.0.nonce.load(Ordering::SeqCst))
    }

    async fn estimate_gas(&self, tx: TransactionRequest) -> WalletResult<u64> {
        self.0.check().await?;
        self.0.estimates.lock().unwrap().push(tx);
        (*self.0.estimate.lock().unwrap()).ok_or_else(|| WalletError::Rpc("execution reverted".into()))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> WalletResult<TxHash> {
        self.0.check().await?;
        let hash = keccak256(&raw);
        self.0.sent.lock().unwrap().push(raw);
        self.0.nonce.fetch_add(1, Ordering::SeqCst);
        Ok(hash)
    }

    async fn transaction_receipt(&self, hash: TxHash) -> WalletResult<Option<Receipt>> {
        self.0.check().await?;
        let mode = *self.0.receipts.lock().unwrap();
        Ok(match mode {
            ReceiptMode::Never => None,
            ReceiptMode::Success | ReceiptMode::Reverted => Some(Receipt {
                transaction_hash: hash,
                block_number: Some(1_001),
                gas_used: 42_000,
                success: mode == ReceiptMode::Success,
            }),
        })
    }
}

/// Maps endpoint URLs to mock endpoints and records which were opened.
#[derive(Default)]
pub struct MockConnector {
    endpoints: Mutex<HashMap<String, Arc<MockEndpoint>>>,
    opened: Mutex<Vec<String>>,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add(&self, url: &str, endpoint: Arc<MockEndpoint>) {
        self.endpoints.lock().unwrap().insert(normalize(url), endpoint);
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

fn normalize(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

impl RpcConnector for MockConnector {
    fn open(&self, endpoint: &Url) -> WalletResult<Arc<dyn ChainRpc>> {
        let key = normalize(endpoint.as_str());
        self.opened.lock().unwrap().push(key.clone());
        let target = self
            .endpoints
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_else(MockEndpoint::down);
        Ok(Arc::new(MockRpc(target)))
    }
}

/// Config pointing the main network at `urls`, with fast timeouts and retries.
pub fn test_config(urls: &[&str]) -> WalletConfig {
    let mut config = WalletConfig::default();
    config.network.endpoints.main = urls.iter().map(|u| u.to_string()).collect();
    config.network.probe_timeout_ms = 200;
    config.network.rpc_timeout_secs = 1;
    config.retry.max_attempts = 2;
    config.retry.base_delay_ms = 10;
    config.retry.max_delay_ms = 20;
    config.transactions.receipt_poll_ms = 10;
    config.transactions.receipt_timeout_secs = 1;
    config
}

/// A wallet over fresh in-memory stores plus handles to inspect them.
pub struct Harness {
    pub wallet: Wallet,
    pub store: Arc<MemoryStore>,
    pub session_store: Arc<MemoryStore>,
    pub connector: Arc<MockConnector>,
    pub endpoint: Arc<MockEndpoint>,
}

pub const PRIMARY: &str = "http://rpc-1.test";

impl Harness {
    /// One healthy main-network endpoint.
    pub fn new() -> Self {
        Self::with_config(test_config(&[PRIMARY]))
    }

    pub fn with_config(config: WalletConfig) -> Self {
        let connector = MockConnector::new();
        let endpoint = MockEndpoint::new(56);
        connector.add(PRIMARY, endpoint.clone());
        let store = Arc::new(MemoryStore::new());
        let session_store = Arc::new(MemoryStore::new());
        let wallet = Wallet::new(config, store.clone(), session_store.clone(), connector.clone()).unwrap();
        Self {
            wallet,
            store,
            session_store,
            connector,
            endpoint,
        }
    }

    /// A second wallet over the same stores, as a fresh process would see them.
    pub fn restart(&self, config: WalletConfig) -> Wallet {
        Wallet::new(config, self.store.clone(), self.session_store.clone(), self.connector.clone()).unwrap()
    }
}
