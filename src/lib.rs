//! Client-resident custodial wallet.
//!
//! # Architecture Overview
//!
//! ```text
//!   host application / CLI
//!            │
//!            ▼
//!   ┌─────────────────────────────────────────────────────────┐
//!   │ wallet::Wallet                                           │
//!   │   ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌─────────┐ │
//!   │   │ session  │  │ registry │  │ network  │  │   tx    │ │
//!   │   │ lock/    │  │ keys +   │  │ failover │  │ gas,    │ │
//!   │   │ timer    │  │ metadata │  │ chain id │  │ signing │ │
//!   │   └────┬─────┘  └────┬─────┘  └────┬─────┘  └────┬────┘ │
//!   │        │        ┌────▼─────┐       │             │      │
//!   │        └───────▶│  vault   │       │             │      │
//!   │                 └────┬─────┘       │             │      │
//!   │                 ┌────▼─────┐       ▼             ▼      │
//!   │                 │ storage  │   ChainRpc (alloy HTTP)    │
//!   │                 └──────────┘                            │
//!   │  cross-cutting: config · error · observability ·        │
//!   │                 resilience (timeouts, retry, backoff)   │
//!   └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod network;
pub mod observability;
pub mod registry;
pub mod resilience;
pub mod session;
pub mod storage;
pub mod tx;
pub mod vault;
pub mod wallet;

pub use config::WalletConfig;
pub use error::{WalletError, WalletResult};
pub use wallet::Wallet;

/// Milliseconds since the Unix epoch.
pub(crate) fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
