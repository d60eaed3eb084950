//! Account initialization and contract transaction submission.
//!
//! # Responsibilities
//! - Derive the signing account against a live connection, with retries
//! - Assemble gas limit, gas price and nonce for a call
//! - Sign locally, broadcast once, and wait for the receipt
//!
//! Sends are never retried: a failure is reported once to the caller.

use alloy::network::TransactionBuilder;
use alloy::primitives::TxHash;
use alloy::rpc::types::TransactionRequest;
use arc_swap::ArcSwapOption;
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::config::{RetryConfig, TransactionConfig};
use crate::error::{WalletError, WalletResult};
use crate::network::{ChainRpc, ConnectionManager, Receipt};
use crate::observability::metrics;
use crate::resilience::{retry_with_backoff, with_timeout, BackoffPolicy};
use crate::tx::account::{derive_account, Account};
use crate::tx::contract::{ContractCall, TxOptions};
use crate::tx::gas::{compute_safe_price, format_gwei, gas_limit_with_buffer, GasSettings};

/// Owns the ephemeral account and submits transactions through the
/// connection manager.
pub struct TransactionPipeline {
    network: Arc<ConnectionManager>,
    gas: Arc<GasSettings>,
    retry: BackoffPolicy,
    receipt_timeout: Duration,
    receipt_poll: Duration,
    account: ArcSwapOption<Account>,
}

impl TransactionPipeline {
    pub fn new(
        network: Arc<ConnectionManager>,
        gas: Arc<GasSettings>,
        retry: &RetryConfig,
        transactions: &TransactionConfig,
    ) -> Self {
        Self {
            network,
            gas,
            retry: BackoffPolicy::from(retry),
            receipt_timeout: Duration::from_secs(transactions.receipt_timeout_secs),
            receipt_poll: Duration::from_millis(transactions.receipt_poll_ms),
            account: ArcSwapOption::empty(),
        }
    }

    pub fn account(&self) -> Option<Arc<Account>> {
        self.account.load_full()
    }

    /// Drop the account. Called on lock and key removal.
    pub fn clear_account(&self) {
        if self.account.swap(None).is_some() {
            tracing::debug!("Signing account cleared");
        }
    }

    /// Derive the account for `key`, reconnecting between attempts as needed.
    /// The result is not installed; see [`set_account`](Self::set_account).
    ///
    /// A chain mismatch or malformed key ends the attempts immediately.
    pub async fn initialize_account_with_retry(&self, key: &SecretString) -> WalletResult<Arc<Account>> {
        let account = retry_with_backoff(self.retry, "initialize_account", |attempt| async move {
            metrics::record_account_init_attempt();
            let connection = self.network.ensure_connected().await?;
            let account = derive_account(key, &connection)?;

            match with_timeout(self.network.rpc_timeout(), "eth_getBalance", connection.rpc.balance(account.address())).await {
                Ok(balance) => tracing::info!(
                    address = %account.address(),
                    chain_id = account.chain_id(),
                    balance_wei = %balance,
                    attempt,
                    "Account ready"
                ),
                Err(e) => tracing::warn!(
                    address = %account.address(),
                    error = %e,
                    "Balance probe failed, continuing"
                ),
            }
            Ok(account)
        })
        .await?;

        Ok(Arc::new(account))
    }

    /// Install a derived account for signing.
    pub fn set_account(&self, account: Arc<Account>) {
        self.account.store(Some(account));
    }

    /// Sign and submit a contract call, then wait for its receipt.
    pub async fn send_contract_transaction(&self, call: &ContractCall, options: TxOptions) -> WalletResult<Receipt> {
        let result = self.submit(call, options).await;
        metrics::record_transaction(match &result {
            Ok(_) => "confirmed",
            Err(WalletError::Submission(_)) | Err(WalletError::Timeout { .. }) => "failed",
            Err(_) => "rejected",
        });
        result
    }

    async fn submit(&self, call: &ContractCall, options: TxOptions) -> WalletResult<Receipt> {
        let account = self
            .account()
            .ok_or_else(|| WalletError::Auth("wallet is locked, no signing account".to_string()))?;
        if let Some(reason) = self.network.halt_reason() {
            return Err(reason);
        }
        let connection = self
            .network
            .current()
            .ok_or_else(|| WalletError::Connectivity("not connected".to_string()))?;
        if connection.chain_id != account.chain_id() {
            return Err(WalletError::Signing(format!(
                "account was derived for chain {} but the connection is on chain {}",
                account.chain_id(),
                connection.chain_id
            )));
        }

        let rpc = connection.rpc.as_ref();
        let rpc_timeout = self.network.rpc_timeout();
        let data = call.encode()?;

        let base = TransactionRequest::default()
            .with_from(account.address())
            .with_to(call.to)
            .with_input(data)
            .with_value(options.value);

        let gas_limit = match options.gas_limit {
            Some(limit) => limit,
            None => match with_timeout(rpc_timeout, "eth_estimateGas", rpc.estimate_gas(base.clone())).await {
                Ok(estimate) => gas_limit_with_buffer(estimate, self.gas.policy().limit_multiplier),
                Err(e) => {
                    let fallback = self.gas.fallback_gas_limit();
                    tracing::warn!(error = %e, fallback, "Gas estimation failed, using fallback limit");
                    fallback
                }
            },
        };

        let gas_price = match options.gas_price {
            Some(price) => price,
            None => compute_safe_price(self.network.sample_gas_price().await, &self.gas.policy()),
        };

        let nonce = with_timeout(rpc_timeout, "eth_getTransactionCount", rpc.pending_nonce(account.address()))
            .await
            .map_err(|e| WalletError::Submission(format!("could not fetch nonce: {}", e)))?;

        let request = base
            .with_nonce(nonce)
            .with_gas_limit(gas_limit)
            .with_gas_price(gas_price);
        let (local_hash, raw) = account.sign_transaction(request).await?;

        tracing::info!(
            to = %call.to,
            method = %call.method,
            nonce,
            gas_limit,
            gas_price_gwei = %format_gwei(gas_price),
            tx_hash = %local_hash,
            "Submitting transaction"
        );

        let hash = with_timeout(rpc_timeout, "eth_sendRawTransaction", rpc.send_raw_transaction(raw))
            .await
            .map_err(|e| WalletError::Submission(format!("broadcast failed: {}", e)))?;
        if hash != local_hash {
            tracing::warn!(local = %local_hash, remote = %hash, "Node returned a different transaction hash");
        }

        let receipt = self.wait_for_receipt(rpc, hash).await?;
        if !receipt.success {
            return Err(WalletError::Submission(format!("transaction {} reverted", hash)));
        }
        tracing::info!(tx_hash = %hash, block = ?receipt.block_number, gas_used = receipt.gas_used, "Transaction confirmed");
        Ok(receipt)
    }

    async fn wait_for_receipt(&self, rpc: &dyn ChainRpc, hash: TxHash) -> WalletResult<Receipt> {
        let rpc_timeout = self.network.rpc_timeout();
        let poll = async {
            let mut ticker = interval(self.receipt_poll);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match with_timeout(rpc_timeout, "eth_getTransactionReceipt", rpc.transaction_receipt(hash)).await {
                    Ok(Some(receipt)) => return receipt,
                    Ok(None) => tracing::debug!(tx_hash = %hash, "Transaction pending"),
                    Err(e) => tracing::warn!(tx_hash = %hash, error = %e, "Receipt lookup failed"),
                }
            }
        };

        timeout(self.receipt_timeout, poll).await.map_err(|_| {
            WalletError::Submission(format!(
                "transaction {} not mined within {} s",
                hash,
                self.receipt_timeout.as_secs()
            ))
        })
    }
}
