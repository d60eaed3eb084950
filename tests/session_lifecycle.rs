//! Auto-lock, policy persistence and persisted-session expiry.

use std::sync::atomic::Ordering;
use std::time::Duration;

use dapp_wallet::config::WalletConfig;
use dapp_wallet::session::{AutoLockPolicy, SessionStatus, SessionToken};
use dapp_wallet::storage::{KeyValueStore, AUTO_LOCK_POLICY, SESSION_TOKEN};

mod common;
use common::*;

const HOUR: Duration = Duration::from_secs(3_600);

async fn unlocked() -> Harness {
    let h = Harness::new();
    assert!(h.wallet.authenticate("pw").await.unwrap());
    h.wallet.add_key(KEY_1, "A").await.unwrap();
    h
}

async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_auto_lock_fires_after_inactivity() {
    let h = unlocked().await;

    tokio::time::sleep(23 * HOUR).await;
    settle().await;
    assert_eq!(h.wallet.status().await, SessionStatus::Unlocked);

    tokio::time::sleep(HOUR + Duration::from_secs(1)).await;
    settle().await;
    assert_eq!(h.wallet.status().await, SessionStatus::Locked);
    assert_eq!(h.wallet.address().await, None);
    assert!(h.session_store.get(SESSION_TOKEN).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_activity_pushes_the_deadline() {
    let h = unlocked().await;

    tokio::time::sleep(20 * HOUR).await;
    h.wallet.reset_activity().await.unwrap();

    tokio::time::sleep(20 * HOUR).await;
    settle().await;
    assert!(!h.wallet.is_locked().await);

    tokio::time::sleep(5 * HOUR).await;
    settle().await;
    assert!(h.wallet.is_locked().await);
}

#[tokio::test(start_paused = true)]
async fn test_never_policy_keeps_session_open() {
    let h = unlocked().await;
    h.wallet.set_auto_lock_policy(AutoLockPolicy::Never).await.unwrap();

    tokio::time::sleep(365 * 24 * HOUR).await;
    settle().await;
    assert!(!h.wallet.is_locked().await);
}

#[tokio::test(start_paused = true)]
async fn test_manual_lock_cancels_the_timer() {
    let h = unlocked().await;
    tokio::time::sleep(12 * HOUR).await;
    h.wallet.lock().await;
    assert!(h.wallet.unlock("pw").await.unwrap());

    // the first session's deadline passes without effect
    tokio::time::sleep(13 * HOUR).await;
    settle().await;
    assert!(!h.wallet.is_locked().await);

    tokio::time::sleep(12 * HOUR).await;
    settle().await;
    assert!(h.wallet.is_locked().await);
}

#[tokio::test]
async fn test_policy_is_persisted() {
    let h = Harness::new();
    h.wallet.set_auto_lock_policy(AutoLockPolicy::Days7).await.unwrap();
    assert_eq!(h.store.get(AUTO_LOCK_POLICY).as_deref(), Some("7d"));

    let again = h.restart(test_config(&[PRIMARY]));
    assert_eq!(again.auto_lock_policy().await, AutoLockPolicy::Days7);
}

#[tokio::test]
async fn test_garbage_stored_policy_falls_back_to_default() {
    let h = Harness::new();
    h.store.put(AUTO_LOCK_POLICY, "fortnight".to_string()).unwrap();

    let again = h.restart(test_config(&[PRIMARY]));
    assert_eq!(again.auto_lock_policy().await, AutoLockPolicy::Hours24);
}

#[tokio::test]
async fn test_expired_session_is_not_resumed() {
    let h = unlocked().await;
    h.wallet.set_auto_lock_policy(AutoLockPolicy::Days3).await.unwrap();

    let mut token = SessionToken::load(h.session_store.as_ref()).unwrap();
    token.last_activity -= 4 * 24 * 3_600 * 1_000;
    token.save(h.session_store.as_ref()).unwrap();

    let resumed = h.restart(test_config(&[PRIMARY]));
    resumed.initialize().await.unwrap();
    assert_eq!(resumed.status().await, SessionStatus::Locked);
    assert!(h.session_store.get(SESSION_TOKEN).is_none());
}

#[tokio::test]
async fn test_recent_session_is_resumed_under_longer_policy() {
    let h = unlocked().await;
    h.wallet.set_auto_lock_policy(AutoLockPolicy::Days7).await.unwrap();

    let mut token = SessionToken::load(h.session_store.as_ref()).unwrap();
    token.last_activity -= 4 * 24 * 3_600 * 1_000;
    token.save(h.session_store.as_ref()).unwrap();

    let resumed = h.restart(test_config(&[PRIMARY]));
    resumed.initialize().await.unwrap();
    assert_eq!(resumed.status().await, SessionStatus::Unlocked);

    // resuming is not activity
    let stored = SessionToken::load(h.session_store.as_ref()).unwrap();
    assert_eq!(stored.last_activity, token.last_activity);
    assert_eq!(stored.created_at, token.created_at);
}

#[tokio::test(start_paused = true)]
async fn test_resumed_session_keeps_its_remaining_window() {
    let h = unlocked().await;
    let mut token = SessionToken::load(h.session_store.as_ref()).unwrap();
    token.last_activity -= 23 * 3_600 * 1_000;
    token.save(h.session_store.as_ref()).unwrap();

    let resumed = h.restart(test_config(&[PRIMARY]));
    resumed.initialize().await.unwrap();
    assert_eq!(resumed.status().await, SessionStatus::Unlocked);

    tokio::time::sleep(HOUR - Duration::from_secs(60)).await;
    settle().await;
    assert!(!resumed.is_locked().await);

    tokio::time::sleep(Duration::from_secs(120)).await;
    settle().await;
    assert!(resumed.is_locked().await);
}

#[tokio::test(start_paused = true)]
async fn test_lock_is_not_blocked_by_account_derivation() {
    let h = unlocked().await;
    h.wallet.lock().await;

    // long rpc timeout so the balance call stalls derivation
    let mut config = WalletConfig::default();
    config.network.endpoints.main = vec![PRIMARY.to_string()];
    let wallet = h.restart(config);
    wallet.initialize().await.unwrap();
    h.endpoint.hang.store(true, Ordering::SeqCst);

    let auth = {
        let wallet = wallet.clone();
        tokio::spawn(async move { wallet.authenticate("pw").await })
    };
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(wallet.status().await, SessionStatus::Unlocked);
    assert!(!auth.is_finished());

    let started = tokio::time::Instant::now();
    wallet.lock().await;
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(wallet.is_locked().await);

    // the stalled derivation finishes later and must not revive the session
    assert!(auth.await.unwrap().unwrap());
    assert!(wallet.is_locked().await);
    assert_eq!(wallet.address().await, None);
    assert!(!wallet.should_use_private_key_for_transactions().await);
}

#[tokio::test]
async fn test_unreadable_token_is_discarded() {
    let h = Harness::new();
    h.session_store.put(SESSION_TOKEN, "{not json".to_string()).unwrap();

    h.wallet.initialize().await.unwrap();
    assert_eq!(h.wallet.status().await, SessionStatus::Locked);
    assert!(h.session_store.get(SESSION_TOKEN).is_none());
}
