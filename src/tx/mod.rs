//! Transaction pipeline.
//!
//! # Data Flow
//! ```text
//! unlock / switch
//!     → pipeline.rs initialize_account_with_retry
//!         → ConnectionManager::ensure_connected → account.rs derive_account
//!
//! send_contract_transaction(call, options)
//!     → contract.rs (calldata)
//!     → gas.rs (estimate * multiplier | fallback, safe price)
//!     → pending nonce → account.rs sign → broadcast → poll receipt
//! ```

pub mod account;
pub mod contract;
pub mod gas;
pub mod pipeline;

pub use account::{derive_account, derive_address, Account};
pub use contract::{ContractCall, TxOptions};
pub use gas::{compute_safe_price, format_gwei, parse_gwei, GasPolicy, GasSettings};
pub use pipeline::TransactionPipeline;
