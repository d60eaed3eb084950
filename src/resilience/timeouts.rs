//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap RPC calls and health probes with a deadline
//! - Cancel operations cleanly on timeout (the inner future is dropped)
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors

use std::future::IntoFuture;
use std::time::Duration;
use tokio::time::timeout;

use crate::error::{WalletError, WalletResult};

/// Run a fallible call under a deadline, flattening the timeout into
/// [`WalletError::Timeout`].
pub async fn with_timeout<F, T>(limit: Duration, operation: &str, fut: F) -> WalletResult<T>
where
    F: IntoFuture<Output = WalletResult<T>>,
{
    match timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(WalletError::Timeout {
            operation: operation.to_string(),
            millis: limit.as_millis() as u64,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let result: WalletResult<u64> = with_timeout(Duration::from_millis(50), "slow", async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(1)
        })
        .await;

        assert_eq!(
            result.unwrap_err(),
            WalletError::Timeout {
                operation: "slow".to_string(),
                millis: 50
            }
        );
    }

    #[tokio::test]
    async fn test_passes_through_result() {
        let ok: WalletResult<u64> = with_timeout(Duration::from_secs(1), "fast", async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err: WalletResult<u64> = with_timeout(Duration::from_secs(1), "fast", async {
            Err(WalletError::Rpc("refused".into()))
        })
        .await;
        assert_eq!(err.unwrap_err(), WalletError::Rpc("refused".into()));
    }
}
