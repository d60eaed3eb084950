//! Network identity, connection state and receipts.

use alloy::primitives::TxHash;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use url::Url;

use crate::error::WalletError;
use crate::network::rpc::ChainRpc;

/// Logical network the wallet operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Main,
    Test,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Main => f.write_str("main"),
            Network::Test => f.write_str("test"),
        }
    }
}

impl FromStr for Network {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "main" | "mainnet" => Ok(Network::Main),
            "test" | "testnet" => Ok(Network::Test),
            other => Err(WalletError::Config(format!("unknown network '{}'", other))),
        }
    }
}

/// A verified connection to one endpoint. Rebuilt on every connect.
#[derive(Clone)]
pub struct ConnectionState {
    /// Network this connection was established for.
    pub network: Network,
    /// Endpoint that passed the health probes.
    pub active_endpoint: Url,
    /// Chain id reported by the endpoint.
    pub chain_id: u64,
    /// Block height seen during probing.
    pub latest_block: u64,
    /// Gas price sampled during probing, if the endpoint answered.
    pub gas_price: Option<u128>,
    /// Chain id matched the expected id for `network`.
    pub verified: bool,
    /// Client bound to `active_endpoint`.
    pub rpc: Arc<dyn ChainRpc>,
}

impl fmt::Debug for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionState")
            .field("network", &self.network)
            .field("active_endpoint", &self.active_endpoint.as_str())
            .field("chain_id", &self.chain_id)
            .field("latest_block", &self.latest_block)
            .field("gas_price", &self.gas_price)
            .field("verified", &self.verified)
            .finish()
    }
}

/// Outcome of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub transaction_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_parsing() {
        assert_eq!("main".parse::<Network>().unwrap(), Network::Main);
        assert_eq!("TESTNET".parse::<Network>().unwrap(), Network::Test);
        assert!("devnet".parse::<Network>().is_err());
        assert_eq!(Network::Test.to_string(), "test");
    }
}
