//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stderr (fmt or JSON lines)
//!     → whatever metrics recorder the host installs
//! ```

pub mod logging;
pub mod metrics;
