//! Private key format gate.

use alloy::hex;
use alloy::primitives::keccak256;
use secrecy::SecretString;

/// Accept exactly 64 hex characters, with or without a `0x` prefix.
pub fn validate_key_format(candidate: &str) -> bool {
    let body = candidate.strip_prefix("0x").unwrap_or(candidate);
    body.len() == 64 && body.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Derive the session secret from a master password.
///
/// Keys are encrypted under this proof rather than the raw password, so a
/// persisted session token can unlock without the password itself.
pub fn derive_password_proof(password: &str) -> SecretString {
    SecretString::from(hex::encode(keccak256(password.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_accepts_valid_keys() {
        let key = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        assert!(validate_key_format(key));
        assert!(validate_key_format(&format!("0x{}", key)));
        assert!(validate_key_format(&key.to_uppercase()));
    }

    #[test]
    fn test_rejects_malformed_keys() {
        let key = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        assert!(!validate_key_format(""));
        assert!(!validate_key_format("0x"));
        assert!(!validate_key_format(&key[..63]));
        assert!(!validate_key_format(&format!("{}0", key)));
        assert!(!validate_key_format(&format!("0x0x{}", &key[2..])));
        assert!(!validate_key_format(&key.replace('a', "g")));
        assert!(!validate_key_format(&format!(" {}", &key[1..])));
    }

    #[test]
    fn test_password_proof() {
        let proof = derive_password_proof("pw1");
        assert_eq!(proof.expose_secret().len(), 64);
        assert_eq!(
            proof.expose_secret(),
            derive_password_proof("pw1").expose_secret()
        );
        assert_ne!(
            proof.expose_secret(),
            derive_password_proof("pw2").expose_secret()
        );
    }
}
