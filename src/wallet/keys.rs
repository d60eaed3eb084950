//! Key management on top of the registry.

use secrecy::{ExposeSecret, SecretString};

use crate::error::{WalletError, WalletResult};
use crate::registry::KeyRecord;
use crate::tx::derive_address;
use crate::vault::{encrypt, validate_key_format};
use crate::wallet::Wallet;

impl Wallet {
    /// Import a private key under a display name.
    ///
    /// Requires an unlocked session; the key is encrypted under the session's
    /// password proof. The first key becomes active and is loaded for signing.
    pub async fn add_key(&self, private_key: &str, name: &str) -> WalletResult<KeyRecord> {
        let mut machine = self.inner.session.lock().await;
        Self::ensure_unlocked(&machine)?;

        let key = SecretString::from(private_key.trim().to_string());
        if !validate_key_format(key.expose_secret()) {
            return Err(WalletError::Format(
                "private key must be 64 hex characters, optionally 0x-prefixed".to_string(),
            ));
        }
        let name = display_name(name)?;
        let address = derive_address(&key)?;
        if let Some(existing) = self.inner.registry.find_by_address(&address) {
            tracing::warn!(existing = %existing.id, "Rejected duplicate key import");
            return Err(WalletError::Duplicate(format!(
                "{} is already stored as '{}'",
                address, existing.name
            )));
        }

        let ciphertext = {
            let session = machine
                .session()
                .ok_or_else(|| WalletError::Auth("no active session".to_string()))?;
            encrypt(key.expose_secret(), session.password_proof.expose_secret())
        };
        let record = self.inner.registry.insert(&name, Some(address), ciphertext)?;
        tracing::info!(key_id = %record.id, address = %address, active = record.is_active, "Key imported");

        if !record.is_active {
            self.touch(&mut machine)?;
            return Ok(record);
        }

        machine.replace_key(Some(record.id.clone()), Some(key));
        self.inner.pipeline.clear_account();
        self.touch(&mut machine)?;
        let snapshot = Self::signing_snapshot(&machine);
        drop(machine);

        self.refresh_account(snapshot).await;
        Ok(record)
    }

    /// Make `id` the signing key.
    pub async fn switch_active_key(&self, id: &str) -> WalletResult<()> {
        let mut machine = self.inner.session.lock().await;
        Self::ensure_unlocked(&machine)?;

        let record = self
            .inner
            .registry
            .get(id)
            .ok_or_else(|| WalletError::NotFound(format!("no key with id {}", id)))?;
        let key = {
            let session = machine
                .session()
                .ok_or_else(|| WalletError::Auth("no active session".to_string()))?;
            self.decrypt_record(id, &session.password_proof)?
        }
        .ok_or_else(|| WalletError::Auth(format!("key {} does not open with the current password", id)))?;

        self.fill_address(id, record.address.is_none(), &key)?;
        self.inner.registry.set_active(id)?;
        machine.replace_key(Some(id.to_string()), Some(key));
        self.inner.pipeline.clear_account();
        self.touch(&mut machine)?;
        let snapshot = Self::signing_snapshot(&machine);
        drop(machine);

        tracing::info!(key_id = %id, "Active key switched");
        self.refresh_account(snapshot).await;
        Ok(())
    }

    /// Delete a key. Removing the active key falls back to the earliest
    /// remaining one; removing the last key locks the wallet.
    pub async fn remove_key(&self, id: &str) -> WalletResult<()> {
        let mut machine = self.inner.session.lock().await;
        Self::ensure_unlocked(&machine)?;

        let removal = self.inner.registry.remove(id)?;
        if !removal.was_active() {
            return self.touch(&mut machine);
        }

        self.inner.pipeline.clear_account();
        let Some(next) = removal.new_active else {
            self.teardown(&mut machine, "last_key_removed");
            return Ok(());
        };

        // The removed key is still loaded; every exit below either replaces
        // it or tears the session down.
        let opened = match machine.session() {
            Some(session) => self.decrypt_record(&next.id, &session.password_proof),
            None => Ok(None),
        };
        let key = match opened {
            Ok(Some(key)) => key,
            Ok(None) => {
                tracing::warn!(key_id = %next.id, "Fallback key does not open with the current password, locking");
                self.teardown(&mut machine, "fallback_unreadable");
                return Ok(());
            }
            Err(e) => {
                tracing::error!(key_id = %next.id, error = %e, "Fallback key unreadable, locking");
                self.teardown(&mut machine, "fallback_unreadable");
                return Err(e);
            }
        };
        if let Err(e) = self.fill_address(&next.id, next.address.is_none(), &key) {
            self.teardown(&mut machine, "fallback_unreadable");
            return Err(e);
        }

        machine.replace_key(Some(next.id.clone()), Some(key));
        self.touch(&mut machine)?;
        let snapshot = Self::signing_snapshot(&machine);
        drop(machine);

        tracing::info!(key_id = %next.id, "Fell back to next key");
        self.refresh_account(snapshot).await;
        Ok(())
    }

    /// Change a key's display name.
    pub async fn rename_key(&self, id: &str, name: &str) -> WalletResult<()> {
        let _guard = self.inner.session.lock().await;
        let name = display_name(name)?;
        self.inner.registry.rename(id, &name)?;
        tracing::info!(key_id = %id, "Key renamed");
        Ok(())
    }

    /// All keys in creation order.
    pub fn list_keys(&self) -> Vec<KeyRecord> {
        self.inner.registry.list()
    }

    pub fn active_key(&self) -> Option<KeyRecord> {
        self.inner.registry.active()
    }

    pub fn key_count(&self) -> usize {
        self.inner.registry.count()
    }
}

fn display_name(name: &str) -> WalletResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(WalletError::Validation("key name must not be empty".to_string()));
    }
    Ok(trimmed.to_string())
}
