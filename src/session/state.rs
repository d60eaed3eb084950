//! Session state machine.
//!
//! ```text
//! Uninitialized ──initialize──▶ Locked ◀──lock/expiry── Unlocked
//!                                  │                        ▲
//!                                  └──▶ Authenticating ─────┘
//!                                          │ failure
//!                                          ▼
//!                                        Locked
//! ```
//!
//! The machine only holds state. Decryption, timers and persistence are
//! driven by `wallet::auth`, which owns the transitions.

use secrecy::SecretString;
use std::fmt;

use crate::session::policy::AutoLockPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Uninitialized,
    Locked,
    Authenticating,
    Unlocked,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionStatus::Uninitialized => "uninitialized",
            SessionStatus::Locked => "locked",
            SessionStatus::Authenticating => "authenticating",
            SessionStatus::Unlocked => "unlocked",
        };
        f.write_str(label)
    }
}

/// Proof that the user supplied the master password.
pub struct Session {
    pub active_key_id: Option<String>,
    pub password_proof: SecretString,
    pub created_at: u64,
    pub last_activity: u64,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("active_key_id", &self.active_key_id)
            .field("created_at", &self.created_at)
            .field("last_activity", &self.last_activity)
            .finish_non_exhaustive()
    }
}

/// Current status plus whatever secrets the status allows.
///
/// Invariant: `session` and `decrypted_key` are only populated while `Unlocked`.
/// `generation` changes whenever either of them is replaced or dropped.
#[derive(Debug)]
pub struct SessionMachine {
    status: SessionStatus,
    session: Option<Session>,
    decrypted_key: Option<SecretString>,
    policy: AutoLockPolicy,
    generation: u64,
}

impl SessionMachine {
    pub fn new(policy: AutoLockPolicy) -> Self {
        Self {
            status: SessionStatus::Uninitialized,
            session: None,
            decrypted_key: None,
            policy,
            generation: 0,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_unlocked(&self) -> bool {
        self.status == SessionStatus::Unlocked
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn decrypted_key(&self) -> Option<&SecretString> {
        self.decrypted_key.as_ref()
    }

    /// Work started under one generation must not publish into another.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn policy(&self) -> AutoLockPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: AutoLockPolicy) {
        self.policy = policy;
    }

    /// `Uninitialized` becomes `Locked`; other states are left alone.
    pub fn mark_initialized(&mut self) {
        if self.status == SessionStatus::Uninitialized {
            self.status = SessionStatus::Locked;
        }
    }

    /// Enter `Authenticating`. Returns the status to restore if the attempt fails.
    pub fn begin_authenticating(&mut self) -> SessionStatus {
        let previous = self.status;
        self.status = SessionStatus::Authenticating;
        previous
    }

    /// Abandon an authentication attempt.
    pub fn abort_authenticating(&mut self, previous: SessionStatus) {
        if self.status == SessionStatus::Authenticating {
            self.status = previous;
        }
    }

    /// Install a session. `decrypted_key` is `None` only for an empty registry.
    pub fn establish(&mut self, session: Session, decrypted_key: Option<SecretString>) {
        self.session = Some(session);
        self.decrypted_key = decrypted_key;
        self.status = SessionStatus::Unlocked;
        self.generation += 1;
    }

    /// Swap the decrypted key after a switch, keeping the session.
    pub fn replace_key(&mut self, key_id: Option<String>, decrypted_key: Option<SecretString>) {
        if let Some(session) = self.session.as_mut() {
            session.active_key_id = key_id;
        }
        self.decrypted_key = decrypted_key;
        self.generation += 1;
    }

    /// Drop every secret and return to `Locked`. Returns whether anything was held.
    pub fn clear(&mut self) -> bool {
        let held = self.session.is_some() || self.decrypted_key.is_some();
        self.session = None;
        self.decrypted_key = None;
        self.status = SessionStatus::Locked;
        self.generation += 1;
        held
    }

    /// Record activity. No-op while locked.
    pub fn touch(&mut self, now_ms: u64) {
        if let Some(session) = self.session.as_mut() {
            session.last_activity = now_ms;
        }
    }
}
