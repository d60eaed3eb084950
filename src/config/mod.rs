//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → WalletConfig (validated, immutable)
//!     → moved into the Wallet context at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; endpoint pools are static
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    ChainIds, EndpointPools, GasConfig, NetworkConfig, ObservabilityConfig, RetryConfig,
    SessionConfig, StorageConfig, TransactionConfig, WalletConfig,
};
pub use validation::ValidationError;
