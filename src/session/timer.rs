//! Single abortable auto-lock task.
//!
//! At most one lock callback is ever scheduled: `start` aborts the previous
//! task before spawning the next. A firing task detaches itself from the slot
//! before running its callback, so a callback that cancels the timer (as
//! `lock()` does) never aborts itself mid-flight.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

type Slot = Option<JoinHandle<()>>;

/// Tracked auto-lock timer. Cloning shares the same slot.
#[derive(Clone, Default)]
pub struct AutoLockTimer {
    slot: Arc<Mutex<Slot>>,
    generation: Arc<AtomicU64>,
}

impl AutoLockTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `on_expiry` after `after`, replacing any pending timer.
    pub fn start<F, Fut>(&self, after: Duration, on_expiry: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slot = match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = slot.take() {
            previous.abort();
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let shared_slot = self.slot.clone();
        let shared_generation = self.generation.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            {
                let mut slot = match shared_slot.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                if shared_generation.load(Ordering::SeqCst) != generation {
                    return;
                }
                *slot = None;
            }
            tracing::info!(after_secs = after.as_secs(), "Auto-lock timer expired");
            on_expiry().await;
        });

        *slot = Some(handle);
        tracing::debug!(after_secs = after.as_secs(), "Auto-lock timer armed");
    }

    /// Abort the pending timer, if any. Idempotent.
    pub fn cancel(&self) {
        let mut slot = match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = slot.take() {
            handle.abort();
            tracing::debug!("Auto-lock timer cancelled");
        }
    }

    /// Whether a timer is currently scheduled.
    pub fn is_armed(&self) -> bool {
        match self.slot.lock() {
            Ok(slot) => slot.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        }
    }
}
