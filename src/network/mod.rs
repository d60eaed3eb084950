//! Network connectivity.
//!
//! # Data Flow
//! ```text
//! connect(network)
//!     → manager.rs (ordered endpoint candidates from config)
//!     → rpc.rs (RpcConnector opens a ChainRpc per candidate)
//!     → probe: eth_chainId, eth_blockNumber, eth_gasPrice under timeout
//!     → chain id check → publish ConnectionState or halt
//! ```
//!
//! # Design Decisions
//! - A connection is published whole or not at all
//! - A chain mismatch is a configuration defect: no failover, no retry
//! - The RPC boundary is a trait so tests and hosts can substitute transports

pub mod manager;
pub mod rpc;
pub mod types;

pub use manager::ConnectionManager;
pub use rpc::{AlloyConnector, AlloyRpc, ChainRpc, RpcConnector};
pub use types::{ConnectionState, Network, Receipt};
