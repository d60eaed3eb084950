//! Collaborator-facing surface: identity, connection, gas and sends.

use alloy::primitives::Address;
use std::sync::Arc;

use crate::error::{WalletError, WalletResult};
use crate::network::{ConnectionState, Receipt};
use crate::tx::{ContractCall, TxOptions};
use crate::wallet::Wallet;

impl Wallet {
    /// Whether callers should route transactions through this wallet.
    pub async fn should_use_private_key_for_transactions(&self) -> bool {
        self.key_count() > 0 && !self.is_locked().await
    }

    /// Address of the signing key while unlocked.
    pub async fn address(&self) -> Option<Address> {
        if self.is_locked().await {
            return None;
        }
        match self.inner.pipeline.account() {
            Some(account) => Some(account.address()),
            None => self.active_key().and_then(|record| record.address),
        }
    }

    /// The verified connection, if any.
    pub fn connection_handle(&self) -> Option<Arc<ConnectionState>> {
        self.inner.network.current()
    }

    /// Reconnect to the configured network and re-derive the account.
    ///
    /// This is the only way to clear a chain mismatch halt.
    pub async fn reconnect(&self) -> WalletResult<Arc<ConnectionState>> {
        let connection = self.inner.network.connect(self.inner.network.network()).await?;
        let snapshot = {
            let machine = self.inner.session.lock().await;
            self.inner.pipeline.clear_account();
            Self::signing_snapshot(&machine)
        };
        self.refresh_account(snapshot).await;
        Ok(connection)
    }

    /// Re-check the chain id of the current endpoint.
    pub async fn verify_network_consistency(&self) -> bool {
        self.inner.network.verify_network_consistency().await
    }

    /// Validate and persist the gas price limit (gwei). Returns wei.
    pub fn save_gas_limit(&self, gwei: &str) -> WalletResult<u128> {
        self.inner.gas.save_gas_limit(gwei)
    }

    /// Gas price limit in wei.
    pub fn gas_price_limit(&self) -> u128 {
        self.inner.gas.gas_price_limit()
    }

    /// Sign and submit a contract call with the active key.
    ///
    /// The account is re-derived first when it is missing or was derived for
    /// a different connection; the session lock is not held meanwhile. The
    /// send itself is attempted once.
    pub async fn send_contract_transaction(&self, call: &ContractCall, options: TxOptions) -> WalletResult<Receipt> {
        let rederive = {
            let mut machine = self.inner.session.lock().await;
            Self::ensure_unlocked(&machine)?;
            if let Some(reason) = self.inner.network.halt_reason() {
                return Err(reason);
            }

            let stale = match (self.inner.pipeline.account(), self.inner.network.current()) {
                (Some(account), Some(connection)) => account.chain_id() != connection.chain_id,
                _ => true,
            };
            self.touch(&mut machine)?;
            if stale {
                let snapshot = Self::signing_snapshot(&machine)
                    .ok_or_else(|| WalletError::Auth("no key loaded for signing".to_string()))?;
                Some(snapshot)
            } else {
                None
            }
        };

        if let Some((key, generation)) = rederive {
            if !self.load_account(&key, generation).await? {
                return Err(WalletError::Auth(
                    "session changed while preparing the signing account".to_string(),
                ));
            }
        }

        self.inner.pipeline.send_contract_transaction(call, options).await
    }
}
