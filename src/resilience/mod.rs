//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! RPC call or health probe:
//!     → timeouts.rs (enforce per-call deadline)
//!
//! Account initialization:
//!     → retries.rs (bounded attempts)
//!     → backoff.rs (exponential delay + jitter between attempts)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Only account initialization retries; transaction sends are surfaced once

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use backoff::BackoffPolicy;
pub use retries::retry_with_backoff;
pub use timeouts::with_timeout;
