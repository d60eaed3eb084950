//! Key vault: encryption of key material at rest.
//!
//! # Data Flow
//! ```text
//! master password
//!     → format.rs (derive_password_proof)
//!     → cipher.rs (encrypt/decrypt under the proof)
//!     → format.rs (validate_key_format gates every decrypted value)
//! ```
//!
//! # Security Constraints
//! - Pure functions, no I/O
//! - Failures are values, never panics, and never include plaintext
//! - Decrypted material is returned as `SecretString`

pub mod cipher;
pub mod format;

pub use cipher::{decrypt, encrypt, DecryptError};
pub use format::{derive_password_proof, validate_key_format};
