//! Retry logic.
//!
//! # Responsibilities
//! - Execute a fallible async operation with exponential backoff + jitter
//! - Stop early on errors that retrying cannot fix
//!
//! # Design Decisions
//! - Bounded attempts, never infinite
//! - Non-retryable errors (chain mismatch, auth) surface immediately
//! - The last error is returned when attempts are exhausted

use std::future::Future;

use crate::error::WalletResult;
use crate::resilience::backoff::BackoffPolicy;

/// Run `operation` until it succeeds, a non-retryable error occurs, or the
/// policy's attempts are exhausted.
///
/// The closure receives the 1-based attempt number.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: BackoffPolicy,
    label: &str,
    mut operation: F,
) -> WalletResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = WalletResult<T>>,
{
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(operation = label, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if !e.is_retryable() => {
                tracing::error!(operation = label, attempt, error = %e, "Non-retryable failure");
                return Err(e);
            }
            Err(e) if attempt >= policy.max_attempts => {
                tracing::error!(operation = label, attempts = attempt, error = %e, "Retries exhausted");
                return Err(e);
            }
            Err(e) => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    operation = label,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Attempt failed, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WalletError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn policy(max_attempts: u32) -> BackoffPolicy {
        BackoffPolicy {
            max_attempts,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_failures() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(policy(3), "probe", |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(WalletError::Rpc("down".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_attempts() {
        let calls = AtomicU32::new(0);
        let result: WalletResult<()> = retry_with_backoff(policy(3), "probe", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(WalletError::Connectivity("none".into())) }
        })
        .await;

        assert!(matches!(result, Err(WalletError::Connectivity(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mismatch_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: WalletResult<()> = retry_with_backoff(policy(5), "probe", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(WalletError::NetworkMismatch {
                    expected: 56,
                    actual: 97,
                })
            }
        })
        .await;

        assert!(matches!(result, Err(WalletError::NetworkMismatch { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
