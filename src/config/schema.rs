//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the wallet.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::network::Network;
use crate::session::AutoLockPolicy;

/// Root configuration for the wallet.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WalletConfig {
    /// Endpoint pools and chain identity.
    pub network: NetworkConfig,

    /// Where durable and session state live.
    pub storage: StorageConfig,

    /// Session defaults.
    pub session: SessionConfig,

    /// Gas governance bounds.
    pub gas: GasConfig,

    /// Account initialization retry settings.
    pub retry: RetryConfig,

    /// Submission settings.
    pub transactions: TransactionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Network the wallet operates on.
    pub active: Network,

    /// Ordered endpoint candidates per network.
    pub endpoints: EndpointPools,

    /// Expected chain identifiers per network.
    pub chain_ids: ChainIds,

    /// Timeout for each individual health probe in milliseconds.
    pub probe_timeout_ms: u64,

    /// Timeout for regular RPC calls in seconds.
    pub rpc_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            active: Network::Main,
            endpoints: EndpointPools::default(),
            chain_ids: ChainIds::default(),
            probe_timeout_ms: 5_000,
            rpc_timeout_secs: 15,
        }
    }
}

impl NetworkConfig {
    /// Endpoint candidates for a network, in priority order.
    pub fn endpoints_for(&self, network: Network) -> &[String] {
        match network {
            Network::Main => &self.endpoints.main,
            Network::Test => &self.endpoints.test,
        }
    }

    /// Chain id an endpoint must report for a network.
    pub fn expected_chain_id(&self, network: Network) -> u64 {
        match network {
            Network::Main => self.chain_ids.main,
            Network::Test => self.chain_ids.test,
        }
    }
}

/// Ordered endpoint lists.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointPools {
    pub main: Vec<String>,
    pub test: Vec<String>,
}

impl Default for EndpointPools {
    fn default() -> Self {
        Self {
            main: vec![
                "https://bsc-dataseed.binance.org".to_string(),
                "https://bsc-dataseed1.defibit.io".to_string(),
                "https://bsc-dataseed1.ninicoin.io".to_string(),
                "https://bsc-rpc.publicnode.com".to_string(),
            ],
            test: vec![
                "https://data-seed-prebsc-1-s1.binance.org:8545".to_string(),
                "https://data-seed-prebsc-2-s1.binance.org:8545".to_string(),
                "https://bsc-testnet-rpc.publicnode.com".to_string(),
            ],
        }
    }
}

/// Expected chain ids.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainIds {
    pub main: u64,
    pub test: u64,
}

impl Default for ChainIds {
    fn default() -> Self {
        Self { main: 56, test: 97 }
    }
}

/// Storage locations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Durable JSON file holding keys, metadata and preferences.
    pub data_path: String,

    /// Session token file. When unset the session only lives in memory.
    pub session_path: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_path: "wallet-state.json".to_string(),
            session_path: None,
        }
    }
}

/// Session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Auto-lock policy used until the user picks one.
    pub default_auto_lock: AutoLockPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_auto_lock: AutoLockPolicy::Hours24,
        }
    }
}

/// Gas governance configuration. Prices are decimal gwei strings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GasConfig {
    /// Lowest gas price limit a user may save.
    pub min_gwei: String,

    /// Highest gas price limit a user may save.
    pub max_gwei: String,

    /// Gas price limit until the user saves one.
    pub default_limit_gwei: String,

    /// Gas price used when no live network price is available.
    pub default_price_gwei: String,

    /// Multiplier applied to the node's gas estimate (1.2 = 20% buffer).
    pub limit_multiplier: f64,

    /// Gas limit used when estimation fails.
    pub fallback_gas_limit: u64,

    /// Bump applied to the live network price, in percent.
    pub price_bump_percent: u64,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            min_gwei: "0.1".to_string(),
            max_gwei: "100".to_string(),
            default_limit_gwei: "10".to_string(),
            default_price_gwei: "3".to_string(),
            limit_multiplier: 1.2,
            fallback_gas_limit: 500_000,
            price_bump_percent: 10,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 8_000,
        }
    }
}

/// Transaction submission configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransactionConfig {
    /// How long to wait for a receipt after broadcast.
    pub receipt_timeout_secs: u64,

    /// Receipt polling interval in milliseconds.
    pub receipt_poll_ms: u64,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            receipt_timeout_secs: 120,
            receipt_poll_ms: 2_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}
