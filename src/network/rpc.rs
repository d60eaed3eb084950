//! Chain RPC boundary and its alloy-backed implementation.
//!
//! # Responsibilities
//! - Define the calls the wallet needs from a chain node
//! - Open a client for an endpoint URL
//! - Map transport errors into [`WalletError::Rpc`]
//!
//! Deadlines are applied by the callers (connection manager, pipeline) so
//! every implementation gets the same timeout behavior.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

use crate::error::{WalletError, WalletResult};
use crate::network::types::Receipt;

/// Calls the wallet makes against a chain node.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// `eth_chainId`.
    async fn chain_id(&self) -> WalletResult<u64>;

    /// `eth_blockNumber`.
    async fn block_number(&self) -> WalletResult<u64>;

    /// `eth_gasPrice`, in wei.
    async fn gas_price(&self) -> WalletResult<u128>;

    /// `eth_getBalance` at the latest block.
    async fn balance(&self, address: Address) -> WalletResult<U256>;

    /// `eth_getTransactionCount` at the pending block.
    async fn pending_nonce(&self, address: Address) -> WalletResult<u64>;

    /// `eth_estimateGas`.
    async fn estimate_gas(&self, tx: TransactionRequest) -> WalletResult<u64>;

    /// `eth_sendRawTransaction`.
    async fn send_raw_transaction(&self, raw: Bytes) -> WalletResult<TxHash>;

    /// `eth_getTransactionReceipt`.
    async fn transaction_receipt(&self, hash: TxHash) -> WalletResult<Option<Receipt>>;
}

/// Opens a [`ChainRpc`] for an endpoint.
pub trait RpcConnector: Send + Sync {
    fn open(&self, endpoint: &Url) -> WalletResult<Arc<dyn ChainRpc>>;
}

fn rpc_err(e: impl std::fmt::Display) -> WalletError {
    WalletError::Rpc(e.to_string())
}

/// JSON-RPC over HTTP via alloy.
pub struct AlloyRpc {
    provider: DynProvider,
    endpoint: Url,
}

impl AlloyRpc {
    /// Build an HTTP provider for `endpoint`. No request is made.
    pub fn connect_http(endpoint: Url) -> Self {
        let provider = ProviderBuilder::new().connect_http(endpoint.clone()).erased();
        Self { provider, endpoint }
    }
}

#[async_trait]
impl ChainRpc for AlloyRpc {
    async fn chain_id(&self) -> WalletResult<u64> {
        self.provider.get_chain_id().await.map_err(rpc_err)
    }

    async fn block_number(&self) -> WalletResult<u64> {
        self.provider.get_block_number().await.map_err(rpc_err)
    }

    async fn gas_price(&self) -> WalletResult<u128> {
        self.provider.get_gas_price().await.map_err(rpc_err)
    }

    async fn balance(&self, address: Address) -> WalletResult<U256> {
        self.provider.get_balance(address).await.map_err(rpc_err)
    }

    async fn pending_nonce(&self, address: Address) -> WalletResult<u64> {
        self.provider
            .get_transaction_count(address)
            .pending()
            .await
            .map_err(rpc_err)
    }

    async fn estimate_gas(&self, tx: TransactionRequest) -> WalletResult<u64> {
        self.provider.estimate_gas(tx).await.map_err(rpc_err)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> WalletResult<TxHash> {
        let pending = self
            .provider
            .send_raw_transaction(&raw)
            .await
            .map_err(rpc_err)?;
        Ok(*pending.tx_hash())
    }

    async fn transaction_receipt(&self, hash: TxHash) -> WalletResult<Option<Receipt>> {
        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(rpc_err)?;
        Ok(receipt.map(|r| Receipt {
            transaction_hash: r.transaction_hash,
            block_number: r.block_number,
            gas_used: r.gas_used,
            success: r.status(),
        }))
    }
}

impl std::fmt::Debug for AlloyRpc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlloyRpc")
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

/// Default connector: HTTP(S) endpoints through alloy.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlloyConnector;

impl RpcConnector for AlloyConnector {
    fn open(&self, endpoint: &Url) -> WalletResult<Arc<dyn ChainRpc>> {
        match endpoint.scheme() {
            "http" | "https" => Ok(Arc::new(AlloyRpc::connect_http(endpoint.clone()))),
            other => Err(WalletError::Config(format!(
                "unsupported endpoint scheme '{}' for {}",
                other, endpoint
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connector_rejects_unknown_scheme() {
        let url: Url = "ftp://example.com".parse().unwrap();
        assert!(matches!(AlloyConnector.open(&url), Err(WalletError::Config(_))));
    }

    #[test]
    fn test_connector_accepts_https() {
        let url: Url = "https://bsc-dataseed.binance.org".parse().unwrap();
        assert!(AlloyConnector.open(&url).is_ok());
    }
}
