//! Session and auto-lock.
//!
//! # Data Flow
//! ```text
//! authenticate / unlock / resume (wallet::auth)
//!     → state.rs (Locked → Authenticating → Unlocked | Locked)
//!     → token.rs (persist proof for silent resume)
//!     → timer.rs (arm auto-lock per policy.rs)
//! lock / expiry
//!     → state.rs (wipe secrets) → token.rs (clear) → timer.rs (cancel)
//! ```

pub mod policy;
pub mod state;
pub mod timer;
pub mod token;

pub use policy::AutoLockPolicy;
pub use state::{Session, SessionMachine, SessionStatus};
pub use timer::AutoLockTimer;
pub use token::SessionToken;
