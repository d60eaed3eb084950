//! Endpoint selection, chain verification and connection state.
//!
//! # Responsibilities
//! - Probe candidate endpoints in order until one is healthy
//! - Refuse endpoints reporting the wrong chain id, and halt on it
//! - Publish a fully built [`ConnectionState`] or none at all
//! - Re-check chain identity on demand

use arc_swap::ArcSwapOption;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::config::NetworkConfig;
use crate::error::{WalletError, WalletResult};
use crate::network::rpc::{ChainRpc, RpcConnector};
use crate::network::types::{ConnectionState, Network};
use crate::observability::metrics;
use crate::resilience::with_timeout;

/// What a healthy endpoint reported while probing.
struct ProbeReport {
    chain_id: u64,
    latest_block: u64,
    gas_price: Option<u128>,
}

/// Owns the current connection. Shared as `Arc<ConnectionManager>`.
pub struct ConnectionManager {
    config: NetworkConfig,
    connector: Arc<dyn RpcConnector>,
    state: ArcSwapOption<ConnectionState>,
    /// Bumped by every connect attempt; only the newest attempt may publish.
    generation: AtomicU64,
    /// Set when an endpoint reported the wrong chain. Cleared by a successful connect.
    halted: ArcSwapOption<WalletError>,
}

impl ConnectionManager {
    pub fn new(config: NetworkConfig, connector: Arc<dyn RpcConnector>) -> Self {
        Self {
            config,
            connector,
            state: ArcSwapOption::empty(),
            generation: AtomicU64::new(0),
            halted: ArcSwapOption::empty(),
        }
    }

    /// Configured network.
    pub fn network(&self) -> Network {
        self.config.active
    }

    /// Per-call deadline for regular RPC traffic.
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.config.rpc_timeout_secs)
    }

    fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.config.probe_timeout_ms)
    }

    /// The published connection, if any.
    pub fn current(&self) -> Option<Arc<ConnectionState>> {
        self.state.load_full()
    }

    /// The chain mismatch that halted this manager, if any.
    pub fn halt_reason(&self) -> Option<WalletError> {
        self.halted.load_full().map(|e| (*e).clone())
    }

    /// Whether a chain mismatch has halted transactions.
    pub fn is_halted(&self) -> bool {
        self.halted.load().is_some()
    }

    /// Current connection, connecting to the configured network if there is none.
    ///
    /// Fails immediately while halted; only an explicit [`connect`](Self::connect)
    /// can clear a chain mismatch.
    pub async fn ensure_connected(&self) -> WalletResult<Arc<ConnectionState>> {
        if let Some(reason) = self.halt_reason() {
            return Err(reason);
        }
        match self.current() {
            Some(state) => Ok(state),
            None => self.connect(self.config.active).await,
        }
    }

    /// Probe the endpoints for `network` in order and adopt the first healthy one.
    ///
    /// Each endpoint must answer `eth_chainId` and `eth_blockNumber` within the
    /// probe timeout. `eth_gasPrice` is sampled but optional. A wrong chain id
    /// aborts the whole attempt without trying further endpoints.
    pub async fn connect(&self, network: Network) -> WalletResult<Arc<ConnectionState>> {
        let attempt = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let expected = self.config.expected_chain_id(network);
        let endpoints = self.config.endpoints_for(network);

        tracing::info!(
            network = %network,
            candidates = endpoints.len(),
            expected_chain_id = expected,
            "Connecting"
        );

        for (idx, raw) in endpoints.iter().enumerate() {
            let url: Url = match raw.parse() {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!(endpoint_idx = idx, url = %raw, error = %e, "Skipping invalid endpoint URL");
                    metrics::record_probe(raw, "invalid");
                    continue;
                }
            };

            let rpc = match self.connector.open(&url) {
                Ok(rpc) => rpc,
                Err(e) => {
                    tracing::warn!(endpoint_idx = idx, url = %url, error = %e, "Could not open endpoint");
                    metrics::record_probe(raw, "invalid");
                    continue;
                }
            };

            match self.probe(rpc.as_ref(), expected).await {
                Ok(report) => {
                    metrics::record_probe(raw, "healthy");
                    let state = Arc::new(ConnectionState {
                        network,
                        active_endpoint: url,
                        chain_id: report.chain_id,
                        latest_block: report.latest_block,
                        gas_price: report.gas_price,
                        verified: true,
                        rpc,
                    });
                    return self.publish(attempt, state);
                }
                Err(mismatch @ WalletError::NetworkMismatch { .. }) => {
                    metrics::record_probe(raw, "mismatch");
                    tracing::error!(
                        endpoint_idx = idx,
                        url = %url,
                        error = %mismatch,
                        "Endpoint reports the wrong chain, halting"
                    );
                    self.halt(attempt, mismatch.clone());
                    return Err(mismatch);
                }
                Err(e) => {
                    metrics::record_probe(raw, "unhealthy");
                    tracing::warn!(endpoint_idx = idx, url = %url, error = %e, "Endpoint failed probe, trying next");
                }
            }
        }

        if self.generation.load(Ordering::SeqCst) == attempt {
            self.state.store(None);
            metrics::record_connected(&network.to_string(), false);
        }
        tracing::error!(network = %network, "No healthy endpoint");
        Err(WalletError::Connectivity(format!(
            "no healthy endpoint for {} network",
            network
        )))
    }

    async fn probe(&self, rpc: &dyn ChainRpc, expected: u64) -> WalletResult<ProbeReport> {
        let limit = self.probe_timeout();
        let chain_id = with_timeout(limit, "eth_chainId", rpc.chain_id()).await?;
        let latest_block = with_timeout(limit, "eth_blockNumber", rpc.block_number()).await?;
        let gas_price = match with_timeout(limit, "eth_gasPrice", rpc.gas_price()).await {
            Ok(price) => Some(price),
            Err(e) => {
                tracing::debug!(error = %e, "Gas price sample unavailable");
                None
            }
        };

        if chain_id != expected {
            return Err(WalletError::NetworkMismatch {
                expected,
                actual: chain_id,
            });
        }

        Ok(ProbeReport {
            chain_id,
            latest_block,
            gas_price,
        })
    }

    fn publish(&self, attempt: u64, state: Arc<ConnectionState>) -> WalletResult<Arc<ConnectionState>> {
        if self.generation.load(Ordering::SeqCst) != attempt {
            tracing::debug!(url = %state.active_endpoint, "Connect attempt superseded, discarding result");
            return Err(WalletError::Connectivity(
                "connect attempt superseded by a newer one".to_string(),
            ));
        }

        self.state.store(Some(state.clone()));
        self.halted.store(None);
        metrics::record_connected(&state.network.to_string(), true);
        tracing::info!(
            network = %state.network,
            url = %state.active_endpoint,
            chain_id = state.chain_id,
            block = state.latest_block,
            "Connected"
        );
        Ok(state)
    }

    fn halt(&self, attempt: u64, reason: WalletError) {
        if self.generation.load(Ordering::SeqCst) != attempt {
            tracing::debug!(error = %reason, "Connect attempt superseded, not halting");
            return;
        }
        self.halted.store(Some(Arc::new(reason)));
        self.state.store(None);
        metrics::record_connected(&self.config.active.to_string(), false);
    }

    /// Re-query the chain id of the current connection.
    ///
    /// Returns `false` when there is no connection, the call fails, or the id
    /// differs from the expected one. A confirmed mismatch also halts.
    pub async fn verify_network_consistency(&self) -> bool {
        let Some(state) = self.current() else {
            tracing::warn!("Consistency check without a connection");
            return false;
        };
        let expected = self.config.expected_chain_id(state.network);

        match with_timeout(self.probe_timeout(), "eth_chainId", state.rpc.chain_id()).await {
            Ok(actual) if actual == expected => true,
            Ok(actual) => {
                let mismatch = WalletError::NetworkMismatch { expected, actual };
                tracing::error!(url = %state.active_endpoint, error = %mismatch, "Chain changed under connection");
                self.halted.store(Some(Arc::new(mismatch)));
                false
            }
            Err(e) => {
                tracing::warn!(url = %state.active_endpoint, error = %e, "Consistency check failed");
                false
            }
        }
    }

    /// Live gas price from the current endpoint, if one answers in time.
    pub async fn sample_gas_price(&self) -> Option<u128> {
        let state = self.current()?;
        match with_timeout(self.probe_timeout(), "eth_gasPrice", state.rpc.gas_price()).await {
            Ok(price) => Some(price),
            Err(e) => {
                tracing::debug!(error = %e, "Live gas price unavailable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::types::Receipt;
    use alloy::primitives::{Address, Bytes, TxHash, U256};
    use alloy::rpc::types::TransactionRequest;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Clone, Copy)]
    enum Behavior {
        Healthy(u64),
        /// Healthy, but every call takes this long.
        Slow(u64, Duration),
        Down,
        Hang,
    }

    struct StubRpc {
        behavior: Arc<Mutex<Behavior>>,
    }

    impl StubRpc {
        async fn answer<T>(&self, value: T) -> WalletResult<T> {
            let behavior = *self.behavior.lock().unwrap();
            match behavior {
                Behavior::Healthy(_) => Ok(value),
                Behavior::Slow(_, delay) => {
                    tokio::time::sleep(delay).await;
                    Ok(value)
                }
                Behavior::Down => Err(WalletError::Rpc("connection refused".into())),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(value)
                }
            }
        }
    }

    #[async_trait]
    impl ChainRpc for StubRpc {
        async fn chain_id(&self) -> WalletResult<u64> {
            let id = match *self.behavior.lock().unwrap() {
                Behavior::Healthy(id) | Behavior::Slow(id, _) => id,
                _ => 0,
            };
            self.answer(id).await
        }
        async fn block_number(&self) -> WalletResult<u64> {
            self.answer(100).await
        }
        async fn gas_price(&self) -> WalletResult<u128> {
            self.answer(3_000_000_000).await
        }
        async fn balance(&self, _: Address) -> WalletResult<U256> {
            self.answer(U256::ZERO).await
        }
        async fn pending_nonce(&self, _: Address) -> WalletResult<u64> {
            self.answer(0).await
        }
        async fn estimate_gas(&self, _: TransactionRequest) -> WalletResult<u64> {
            self.answer(21_000).await
        }
        async fn send_raw_transaction(&self, _: Bytes) -> WalletResult<TxHash> {
            self.answer(TxHash::ZERO).await
        }
        async fn transaction_receipt(&self, _: TxHash) -> WalletResult<Option<Receipt>> {
            self.answer(None).await
        }
    }

    #[derive(Default)]
    struct StubConnector {
        endpoints: Mutex<HashMap<String, Arc<Mutex<Behavior>>>>,
        opened: Mutex<Vec<String>>,
    }

    impl StubConnector {
        fn set(&self, url: &str, behavior: Behavior) {
            let mut endpoints = self.endpoints.lock().unwrap();
            match endpoints.get(url) {
                Some(slot) => *slot.lock().unwrap() = behavior,
                None => {
                    endpoints.insert(url.to_string(), Arc::new(Mutex::new(behavior)));
                }
            }
        }

        fn opened(&self) -> Vec<String> {
            self.opened.lock().unwrap().clone()
        }
    }

    impl RpcConnector for StubConnector {
        fn open(&self, endpoint: &Url) -> WalletResult<Arc<dyn ChainRpc>> {
            let key = endpoint.as_str().trim_end_matches('/').to_string();
            self.opened.lock().unwrap().push(key.clone());
            let behavior = self
                .endpoints
                .lock()
                .unwrap()
                .get(&key)
                .cloned()
                .unwrap_or_else(|| Arc::new(Mutex::new(Behavior::Down)));
            Ok(Arc::new(StubRpc { behavior }))
        }
    }

    const A: &str = "http://a.example";
    const B: &str = "http://b.example";
    const C: &str = "http://c.example";

    fn manager(connector: Arc<StubConnector>) -> ConnectionManager {
        let mut config = NetworkConfig::default();
        config.endpoints.main = vec![A.into(), B.into(), C.into()];
        config.probe_timeout_ms = 500;
        ConnectionManager::new(config, connector)
    }

    #[tokio::test]
    async fn test_fails_over_to_first_healthy_endpoint() {
        let connector = Arc::new(StubConnector::default());
        connector.set(A, Behavior::Down);
        connector.set(B, Behavior::Healthy(56));
        connector.set(C, Behavior::Healthy(56));
        let manager = manager(connector.clone());

        let state = manager.connect(Network::Main).await.unwrap();
        assert_eq!(state.active_endpoint.as_str().trim_end_matches('/'), B);
        assert_eq!(state.chain_id, 56);
        assert!(state.verified);
        assert_eq!(state.gas_price, Some(3_000_000_000));
        assert_eq!(connector.opened(), vec![A.to_string(), B.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_endpoint_times_out() {
        let connector = Arc::new(StubConnector::default());
        connector.set(A, Behavior::Hang);
        connector.set(B, Behavior::Healthy(56));
        let manager = manager(connector);

        let state = manager.connect(Network::Main).await.unwrap();
        assert_eq!(state.active_endpoint.as_str().trim_end_matches('/'), B);
    }

    #[tokio::test]
    async fn test_all_unhealthy_leaves_no_connection() {
        let connector = Arc::new(StubConnector::default());
        let manager = manager(connector);

        let err = manager.connect(Network::Main).await.unwrap_err();
        assert!(matches!(err, WalletError::Connectivity(_)));
        assert!(manager.current().is_none());
    }

    #[tokio::test]
    async fn test_mismatch_halts_without_failover() {
        let connector = Arc::new(StubConnector::default());
        connector.set(A, Behavior::Healthy(97));
        connector.set(B, Behavior::Healthy(56));
        let manager = manager(connector.clone());

        let err = manager.connect(Network::Main).await.unwrap_err();
        assert_eq!(
            err,
            WalletError::NetworkMismatch {
                expected: 56,
                actual: 97
            }
        );
        assert!(manager.current().is_none());
        assert!(manager.is_halted());
        assert_eq!(connector.opened(), vec![A.to_string()]);

        // ensure_connected does not retry while halted
        assert!(matches!(
            manager.ensure_connected().await,
            Err(WalletError::NetworkMismatch { .. })
        ));
        assert_eq!(connector.opened().len(), 1);

        // an explicit reconnect after the endpoint is fixed clears the halt
        connector.set(A, Behavior::Healthy(56));
        manager.connect(Network::Main).await.unwrap();
        assert!(!manager.is_halted());
    }

    #[tokio::test]
    async fn test_verify_network_consistency() {
        let connector = Arc::new(StubConnector::default());
        connector.set(A, Behavior::Healthy(56));
        let manager = manager(connector.clone());

        assert!(!manager.verify_network_consistency().await);

        manager.connect(Network::Main).await.unwrap();
        assert!(manager.verify_network_consistency().await);

        connector.set(A, Behavior::Down);
        assert!(!manager.verify_network_consistency().await);
        assert!(!manager.is_halted());

        connector.set(A, Behavior::Healthy(1));
        assert!(!manager.verify_network_consistency().await);
        assert!(manager.is_halted());
    }

    /// Main pool is `A` only, test pool is `B` only.
    fn split_manager(connector: Arc<StubConnector>) -> Arc<ConnectionManager> {
        let mut config = NetworkConfig::default();
        config.endpoints.main = vec![A.into()];
        config.endpoints.test = vec![B.into()];
        config.probe_timeout_ms = 500;
        Arc::new(ConnectionManager::new(config, connector))
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_connect_never_publishes() {
        let connector = Arc::new(StubConnector::default());
        connector.set(A, Behavior::Slow(56, Duration::from_millis(300)));
        connector.set(B, Behavior::Healthy(97));
        let manager = split_manager(connector);

        let slow = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.connect(Network::Main).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;

        let newer = manager.connect(Network::Test).await.unwrap();
        assert_eq!(newer.chain_id, 97);

        let err = slow.await.unwrap().unwrap_err();
        assert!(matches!(err, WalletError::Connectivity(ref msg) if msg.contains("superseded")));

        let current = manager.current().unwrap();
        assert_eq!(current.active_endpoint.as_str().trim_end_matches('/'), B);
        assert_eq!(current.network, Network::Test);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_mismatch_does_not_halt() {
        let connector = Arc::new(StubConnector::default());
        // main expects 56; this endpoint reports 97 after a delay
        connector.set(A, Behavior::Slow(97, Duration::from_millis(300)));
        connector.set(B, Behavior::Healthy(97));
        let manager = split_manager(connector);

        let slow = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.connect(Network::Main).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        manager.connect(Network::Test).await.unwrap();

        let err = slow.await.unwrap().unwrap_err();
        assert!(matches!(err, WalletError::NetworkMismatch { expected: 56, actual: 97 }));
        assert!(!manager.is_halted());
        assert!(manager.ensure_connected().await.is_ok());
        assert_eq!(manager.current().unwrap().network, Network::Test);
    }
}
