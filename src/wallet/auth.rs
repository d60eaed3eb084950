//! Authentication, locking and session resume.

use secrecy::{ExposeSecret, SecretString};

use crate::error::WalletResult;
use crate::observability::metrics;
use crate::session::{Session, SessionMachine, SessionToken};
use crate::tx::derive_address;
use crate::unix_millis;
use crate::vault::derive_password_proof;
use crate::wallet::Wallet;

impl Wallet {
    /// Check a password against the registry and open a session.
    ///
    /// With no keys stored, any password is accepted and becomes the master
    /// password. Otherwise the password must open at least one record; the
    /// active record is tried first. Returns `Ok(false)` on a wrong password,
    /// leaving the previous state untouched.
    pub async fn authenticate(&self, password: &str) -> WalletResult<bool> {
        self.initialize().await?;
        let mut machine = self.inner.session.lock().await;
        let previous = machine.begin_authenticating();
        let proof = derive_password_proof(password);

        if self.inner.registry.count() == 0 {
            self.establish(&mut machine, proof, None)?;
            tracing::info!("Master password set, empty registry");
            return Ok(true);
        }

        let mut candidates = self.inner.registry.list();
        candidates.sort_by_key(|record| !record.is_active);

        let mut opened = None;
        for record in candidates {
            match self.decrypt_record(&record.id, &proof) {
                Ok(Some(key)) => {
                    opened = Some((record, key));
                    break;
                }
                Ok(None) => {}
                Err(e) => {
                    machine.abort_authenticating(previous);
                    return Err(e);
                }
            }
        }

        let Some((record, key)) = opened else {
            machine.abort_authenticating(previous);
            tracing::warn!("Authentication failed");
            return Ok(false);
        };

        if let Err(e) = self.fill_address(&record.id, record.address.is_none(), &key) {
            machine.abort_authenticating(previous);
            return Err(e);
        }
        if !record.is_active {
            tracing::warn!(key_id = %record.id, "Active key did not open, switching to the first key that did");
            if let Err(e) = self.inner.registry.set_active(&record.id) {
                machine.abort_authenticating(previous);
                return Err(e);
            }
        }

        self.establish(&mut machine, proof, Some((record.id.clone(), key)))?;
        let snapshot = Self::signing_snapshot(&machine);
        drop(machine);

        tracing::info!(key_id = %record.id, "Authenticated");
        self.refresh_account(snapshot).await;
        Ok(true)
    }

    /// Open the active record specifically. A wrong password re-locks.
    pub async fn unlock(&self, password: &str) -> WalletResult<bool> {
        self.initialize().await?;
        let mut machine = self.inner.session.lock().await;
        machine.begin_authenticating();
        let proof = derive_password_proof(password);

        let Some(active) = self.inner.registry.active() else {
            self.establish(&mut machine, proof, None)?;
            tracing::info!("Unlocked with empty registry");
            return Ok(true);
        };

        let key = match self.decrypt_record(&active.id, &proof) {
            Ok(Some(key)) => key,
            Ok(None) => {
                self.teardown(&mut machine, "failed_unlock");
                tracing::warn!(key_id = %active.id, "Unlock failed");
                return Ok(false);
            }
            Err(e) => {
                self.teardown(&mut machine, "failed_unlock");
                return Err(e);
            }
        };

        if let Err(e) = self.fill_address(&active.id, active.address.is_none(), &key) {
            self.teardown(&mut machine, "failed_unlock");
            return Err(e);
        }
        self.establish(&mut machine, proof, Some((active.id.clone(), key)))?;
        let snapshot = Self::signing_snapshot(&machine);
        drop(machine);

        tracing::info!(key_id = %active.id, "Unlocked");
        self.refresh_account(snapshot).await;
        Ok(true)
    }

    /// Destroy the session and every in-memory secret. Idempotent.
    pub async fn lock(&self) {
        self.lock_with_reason("manual").await;
    }

    pub(crate) async fn lock_with_reason(&self, reason: &'static str) {
        let mut machine = self.inner.session.lock().await;
        self.teardown(&mut machine, reason);
    }

    /// Restart the inactivity window. No-op while locked.
    pub async fn reset_activity(&self) -> WalletResult<()> {
        let mut machine = self.inner.session.lock().await;
        if !machine.is_unlocked() {
            return Ok(());
        }
        self.touch(&mut machine)
    }

    /// Silent re-authentication from a persisted token.
    ///
    /// Any failure discards the token and leaves the wallet locked.
    pub(crate) async fn resume_session(&self) -> WalletResult<bool> {
        let mut machine = self.inner.session.lock().await;
        let Some(token) = SessionToken::load(self.inner.session_store.as_ref()) else {
            return Ok(false);
        };

        let resumed = match self.try_resume(&mut machine, &token) {
            Ok(resumed) => resumed,
            Err(e) => {
                self.teardown(&mut machine, "resume_failed");
                return Err(e);
            }
        };
        if !resumed {
            self.teardown(&mut machine, "resume_failed");
            return Ok(false);
        }

        let snapshot = Self::signing_snapshot(&machine);
        drop(machine);

        tracing::info!(key_id = ?token.active_key_id, "Session resumed");
        self.refresh_account(snapshot).await;
        Ok(true)
    }

    fn try_resume(&self, machine: &mut SessionMachine, token: &SessionToken) -> WalletResult<bool> {
        if machine.policy().is_expired(token.last_activity, unix_millis()) {
            tracing::info!(policy = %machine.policy(), "Persisted session expired");
            return Ok(false);
        }

        let active = self.inner.registry.active();
        let active_id = active.as_ref().map(|r| r.id.clone());
        if token.active_key_id != active_id {
            tracing::info!(
                token_key = ?token.active_key_id,
                active_key = ?active_id,
                "Persisted session refers to a key that is no longer active"
            );
            return Ok(false);
        }

        let proof = SecretString::from(token.password_proof.clone());
        machine.begin_authenticating();

        let unlocked = match active {
            None => None,
            Some(record) => {
                let Some(key) = self.decrypt_record(&record.id, &proof)? else {
                    tracing::warn!(key_id = %record.id, "Persisted session no longer opens the active key");
                    return Ok(false);
                };
                self.fill_address(&record.id, record.address.is_none(), &key)?;
                Some((record.id, key))
            }
        };
        self.establish_at(machine, proof, unlocked, token.created_at, token.last_activity)?;
        Ok(true)
    }

    /// Install a new session and arm the timer.
    pub(super) fn establish(
        &self,
        machine: &mut SessionMachine,
        proof: SecretString,
        unlocked: Option<(String, SecretString)>,
    ) -> WalletResult<()> {
        let now = unix_millis();
        self.establish_at(machine, proof, unlocked, now, now)
    }

    fn establish_at(
        &self,
        machine: &mut SessionMachine,
        proof: SecretString,
        unlocked: Option<(String, SecretString)>,
        created_at: u64,
        last_activity: u64,
    ) -> WalletResult<()> {
        let (active_key_id, key) = match unlocked {
            Some((id, key)) => (Some(id), Some(key)),
            None => (None, None),
        };
        machine.establish(
            Session {
                active_key_id,
                password_proof: proof,
                created_at,
                last_activity,
            },
            key,
        );
        self.inner.pipeline.clear_account();
        if let Err(e) = self.persist_token(machine) {
            self.teardown(machine, "persist_failed");
            return Err(e);
        }
        self.arm_timer(machine);
        Ok(())
    }

    /// Copy of the decrypted key plus the generation it belongs to, so the
    /// account can be derived with the session lock released.
    pub(super) fn signing_snapshot(machine: &SessionMachine) -> Option<(SecretString, u64)> {
        if !machine.is_unlocked() {
            return None;
        }
        let key = machine.decrypted_key()?;
        Some((SecretString::from(key.expose_secret().to_string()), machine.generation()))
    }

    /// Derive the signing account without holding the session lock, then
    /// install it only if the session is still the one it was derived for.
    ///
    /// Returns `Ok(false)` when the session was locked or replaced meanwhile.
    pub(super) async fn load_account(&self, key: &SecretString, generation: u64) -> WalletResult<bool> {
        let account = self.inner.pipeline.initialize_account_with_retry(key).await?;

        let machine = self.inner.session.lock().await;
        if !machine.is_unlocked() || machine.generation() != generation {
            tracing::debug!(
                derived_for = generation,
                current = machine.generation(),
                "Session changed while deriving, discarding account"
            );
            return Ok(false);
        }
        self.inner.pipeline.set_account(account);
        Ok(true)
    }

    /// Best-effort [`load_account`](Self::load_account). Failure leaves the
    /// session unlocked; the next send retries.
    pub(super) async fn refresh_account(&self, snapshot: Option<(SecretString, u64)>) {
        let Some((key, generation)) = snapshot else {
            return;
        };
        if let Err(e) = self.load_account(&key, generation).await {
            tracing::warn!(error = %e, "Signing account unavailable for now");
        }
    }

    /// Wipe secrets, forget the token, stop the timer.
    pub(super) fn teardown(&self, machine: &mut SessionMachine, reason: &'static str) {
        let held = machine.clear();
        self.inner.pipeline.clear_account();
        self.inner.timer.cancel();
        if let Err(e) = SessionToken::clear(self.inner.session_store.as_ref()) {
            tracing::warn!(error = %e, "Failed to clear session token");
        }
        if held {
            metrics::record_lock(reason);
            tracing::info!(reason, "Wallet locked");
        }
    }

    /// Record activity, persist it and re-arm the timer.
    pub(super) fn touch(&self, machine: &mut SessionMachine) -> WalletResult<()> {
        machine.touch(unix_millis());
        self.persist_token(machine)?;
        self.arm_timer(machine);
        Ok(())
    }

    pub(super) fn persist_token(&self, machine: &SessionMachine) -> WalletResult<()> {
        let Some(session) = machine.session() else {
            return Ok(());
        };
        SessionToken {
            active_key_id: session.active_key_id.clone(),
            password_proof: session.password_proof.expose_secret().to_string(),
            created_at: session.created_at,
            last_activity: session.last_activity,
        }
        .save(self.inner.session_store.as_ref())
    }

    /// Record the address of a migrated key on its first decrypt.
    pub(super) fn fill_address(&self, id: &str, missing: bool, key: &SecretString) -> WalletResult<()> {
        if !missing {
            return Ok(());
        }
        let address = derive_address(key)?;
        self.inner.registry.set_address(id, address)?;
        tracing::info!(key_id = %id, address = %address, "Derived address for migrated key");
        Ok(())
    }
}
