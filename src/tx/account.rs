//! Signing account derived from the decrypted active key.

use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

use crate::error::{WalletError, WalletResult};
use crate::network::ConnectionState;

fn parse_signer(key: &SecretString) -> WalletResult<PrivateKeySigner> {
    let raw = key.expose_secret();
    let hex = raw.strip_prefix("0x").unwrap_or(raw);
    hex.parse::<PrivateKeySigner>()
        .map_err(|_| WalletError::Format("private key is not a valid secp256k1 scalar".to_string()))
}

/// Address for a key without needing a connection.
pub fn derive_address(key: &SecretString) -> WalletResult<Address> {
    Ok(parse_signer(key)?.address())
}

/// Combine a decrypted key with a live connection.
pub fn derive_account(key: &SecretString, connection: &ConnectionState) -> WalletResult<Account> {
    let signer = parse_signer(key)?.with_chain_id(Some(connection.chain_id));
    Ok(Account {
        address: signer.address(),
        chain_id: connection.chain_id,
        signer,
    })
}

/// In-memory signing credential. Never persisted.
#[derive(Clone)]
pub struct Account {
    signer: PrivateKeySigner,
    address: Address,
    chain_id: u64,
}

impl Account {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Sign a fully populated request. Returns the hash and EIP-2718 bytes.
    pub async fn sign_transaction(&self, tx: TransactionRequest) -> WalletResult<(TxHash, Bytes)> {
        let wallet = EthereumWallet::from(self.signer.clone());
        let envelope = tx
            .with_chain_id(self.chain_id)
            .build(&wallet)
            .await
            .map_err(|e| WalletError::Signing(format!("failed to sign transaction: {}", e)))?;
        let hash = *envelope.tx_hash();
        Ok((hash, Bytes::from(envelope.encoded_2718())))
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}
