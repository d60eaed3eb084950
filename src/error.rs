//! Crate-wide error taxonomy.

use thiserror::Error;

/// Errors surfaced by wallet operations.
///
/// Every variant carries owned data only so results can be cloned out of the
/// shared initialization future.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalletError {
    /// Malformed private key.
    #[error("Invalid key format: {0}")]
    Format(String),

    /// Wrong password or no valid session.
    #[error("Authentication required: {0}")]
    Auth(String),

    /// Unknown key id.
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Key for this address is already imported.
    #[error("Key already imported for address {0}")]
    Duplicate(String),

    /// No endpoint passed the health checks.
    #[error("Network unreachable: {0}")]
    Connectivity(String),

    /// Endpoint reports a different chain than the configured network.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    NetworkMismatch { expected: u64, actual: u64 },

    /// Local signing failed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Broadcast or receipt retrieval failed.
    #[error("Transaction submission failed: {0}")]
    Submission(String),

    /// Value outside its permitted bounds.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// RPC request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("{operation} timed out after {millis} ms")]
    Timeout { operation: String, millis: u64 },

    /// Persistent state could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl WalletError {
    /// Whether account initialization may retry after this error.
    ///
    /// A chain mismatch is a configuration defect and authentication errors
    /// will not resolve on their own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WalletError::Connectivity(_) | WalletError::Rpc(_) | WalletError::Timeout { .. }
        )
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(e: serde_json::Error) -> Self {
        WalletError::Storage(format!("serialization: {}", e))
    }
}

impl From<std::io::Error> for WalletError {
    fn from(e: std::io::Error) -> Self {
        WalletError::Storage(e.to_string())
    }
}

/// Result type for wallet operations.
pub type WalletResult<T> = Result<T, WalletError>;
