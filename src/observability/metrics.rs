//! Metrics collection.
//!
//! # Metrics
//! - `wallet_endpoint_probe_total` (counter): probe outcomes by endpoint and result
//! - `wallet_connected` (gauge): 1=verified connection, 0=none, by network
//! - `wallet_transactions_total` (counter): submissions by outcome
//! - `wallet_lock_events_total` (counter): locks by reason
//! - `wallet_account_init_attempts_total` (counter): account initialization attempts
//!
//! # Design Decisions
//! - Uses the `metrics` facade only; the host installs a recorder if it wants export
//! - Without a recorder every call is a no-op

use metrics::{counter, gauge};

/// Record the result of probing an endpoint.
pub fn record_probe(endpoint: &str, outcome: &'static str) {
    counter!(
        "wallet_endpoint_probe_total",
        "endpoint" => endpoint.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record whether a verified connection exists.
pub fn record_connected(network: &str, connected: bool) {
    gauge!("wallet_connected", "network" => network.to_string())
        .set(if connected { 1.0 } else { 0.0 });
}

/// Record a transaction submission outcome.
pub fn record_transaction(outcome: &'static str) {
    counter!("wallet_transactions_total", "outcome" => outcome).increment(1);
}

/// Record a lock event.
pub fn record_lock(reason: &'static str) {
    counter!("wallet_lock_events_total", "reason" => reason).increment(1);
}

/// Record an account initialization attempt.
pub fn record_account_init_attempt() {
    counter!("wallet_account_init_attempts_total").increment(1);
}
