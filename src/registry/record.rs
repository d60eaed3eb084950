//! Key record types.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// Shown wherever a record's address has not been derived yet.
pub const PENDING_ADDRESS_LABEL: &str = "pending unlock";

/// Metadata of one stored key. The ciphertext lives under its own storage key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Opaque unique id (UUID v4), immutable.
    pub id: String,
    /// User-facing display name.
    pub name: String,
    /// Derived address. `None` for migrated legacy keys until first unlock.
    pub address: Option<Address>,
    /// Creation time, milliseconds since the Unix epoch.
    pub created_at: u64,
    /// Whether this is the key used for signing.
    pub is_active: bool,
}

impl KeyRecord {
    /// Address for display, or the pending label.
    pub fn address_label(&self) -> String {
        self.address
            .map(|a| a.to_checksum(None))
            .unwrap_or_else(|| PENDING_ADDRESS_LABEL.to_string())
    }

    /// Case-insensitive address match.
    pub fn matches_address(&self, address: &Address) -> bool {
        self.address.as_ref() == Some(address)
    }
}

/// Persisted metadata, keyed by id in the metadata map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StoredMetadata {
    pub name: String,
    #[serde(default)]
    pub address: Option<Address>,
    pub created_at: u64,
    #[serde(default)]
    pub is_active: bool,
}

impl StoredMetadata {
    pub fn into_record(self, id: String) -> KeyRecord {
        KeyRecord {
            id,
            name: self.name,
            address: self.address,
            created_at: self.created_at,
            is_active: self.is_active,
        }
    }
}

/// Outcome of removing a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    /// The removed record.
    pub removed: KeyRecord,
    /// The record that is active afterwards, if any.
    pub new_active: Option<KeyRecord>,
}

impl Removal {
    /// Whether the removed key was the active one.
    pub fn was_active(&self) -> bool {
        self.removed.is_active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn test_address_label() {
        let mut record = KeyRecord {
            id: "id".into(),
            name: "A".into(),
            address: None,
            created_at: 0,
            is_active: false,
        };
        assert_eq!(record.address_label(), PENDING_ADDRESS_LABEL);

        record.address = Some(address!("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"));
        assert_eq!(record.address_label(), "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    }

    #[test]
    fn test_address_match_ignores_case() {
        let record = KeyRecord {
            id: "id".into(),
            name: "A".into(),
            address: Some("0xF39FD6E51AAD88F6F4CE6AB8827279CFFFB92266".parse().unwrap()),
            created_at: 0,
            is_active: true,
        };
        let lower: Address = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap();
        assert!(record.matches_address(&lower));
    }

    #[test]
    fn test_metadata_tolerates_missing_address() {
        let stored: StoredMetadata =
            serde_json::from_str(r#"{"name":"Imported","created_at":5}"#).unwrap();
        assert_eq!(stored.address, None);
        assert!(!stored.is_active);
    }
}
