//! Reversible keystream cipher for key material at rest.
//!
//! The plaintext is XORed with a keystream derived from the password
//! (keccak-256 of the password, repeated) and then base64 encoded. This is
//! obfuscation, not authenticated encryption: a wrong password produces
//! garbage rather than an authentication failure, which callers detect by
//! running the result through [`validate_key_format`](super::validate_key_format).

use alloy::primitives::keccak256;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use secrecy::SecretString;
use thiserror::Error;
use zeroize::Zeroizing;

/// Decryption failure. Never carries plaintext.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecryptError {
    /// Ciphertext is not valid base64.
    #[error("ciphertext is not valid base64")]
    Encoding,
    /// Decrypted bytes are not text, usually a wrong password.
    #[error("decrypted data is not valid text")]
    NotText,
}

fn keystream(password: &str) -> [u8; 32] {
    keccak256(password.as_bytes()).0
}

fn xor_in_place(data: &mut [u8], password: &str) {
    let stream = Zeroizing::new(keystream(password));
    for (byte, k) in data.iter_mut().zip(stream.iter().cycle()) {
        *byte ^= k;
    }
}

/// Encrypt `plaintext` under `password`.
pub fn encrypt(plaintext: &str, password: &str) -> String {
    let mut bytes = Zeroizing::new(plaintext.as_bytes().to_vec());
    xor_in_place(&mut bytes, password);
    STANDARD.encode(bytes.as_slice())
}

/// Decrypt `ciphertext` under `password`.
pub fn decrypt(ciphertext: &str, password: &str) -> Result<SecretString, DecryptError> {
    let mut bytes = STANDARD
        .decode(ciphertext.trim())
        .map_err(|_| DecryptError::Encoding)?;
    xor_in_place(&mut bytes, password);

    match String::from_utf8(bytes) {
        Ok(text) => Ok(SecretString::from(text)),
        Err(e) => {
            drop(Zeroizing::new(e.into_bytes()));
            Err(DecryptError::NotText)
        }
    }
}
