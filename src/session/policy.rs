//! Auto-lock durations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::WalletError;

const HOUR: u64 = 60 * 60;
const DAY: u64 = 24 * HOUR;

/// How long a session may stay unlocked without activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AutoLockPolicy {
    #[default]
    #[serde(rename = "24h")]
    Hours24,
    #[serde(rename = "3d")]
    Days3,
    #[serde(rename = "7d")]
    Days7,
    #[serde(rename = "14d")]
    Days14,
    #[serde(rename = "30d")]
    Days30,
    #[serde(rename = "90d")]
    Days90,
    #[serde(rename = "never")]
    Never,
}

impl AutoLockPolicy {
    pub const ALL: [AutoLockPolicy; 7] = [
        AutoLockPolicy::Hours24,
        AutoLockPolicy::Days3,
        AutoLockPolicy::Days7,
        AutoLockPolicy::Days14,
        AutoLockPolicy::Days30,
        AutoLockPolicy::Days90,
        AutoLockPolicy::Never,
    ];

    /// Inactivity window, or `None` when the timer is disabled.
    pub fn duration(self) -> Option<Duration> {
        let secs = match self {
            AutoLockPolicy::Hours24 => DAY,
            AutoLockPolicy::Days3 => 3 * DAY,
            AutoLockPolicy::Days7 => 7 * DAY,
            AutoLockPolicy::Days14 => 14 * DAY,
            AutoLockPolicy::Days30 => 30 * DAY,
            AutoLockPolicy::Days90 => 90 * DAY,
            AutoLockPolicy::Never => return None,
        };
        Some(Duration::from_secs(secs))
    }

    /// Persisted label.
    pub fn label(self) -> &'static str {
        match self {
            AutoLockPolicy::Hours24 => "24h",
            AutoLockPolicy::Days3 => "3d",
            AutoLockPolicy::Days7 => "7d",
            AutoLockPolicy::Days14 => "14d",
            AutoLockPolicy::Days30 => "30d",
            AutoLockPolicy::Days90 => "90d",
            AutoLockPolicy::Never => "never",
        }
    }

    /// Whether a session last active at `last_activity_ms` has expired at `now_ms`.
    pub fn is_expired(self, last_activity_ms: u64, now_ms: u64) -> bool {
        match self.duration() {
            Some(window) => now_ms.saturating_sub(last_activity_ms) >= window.as_millis() as u64,
            None => false,
        }
    }
}

impl fmt::Display for AutoLockPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AutoLockPolicy {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                WalletError::Validation(format!(
                    "unknown auto-lock policy '{}', expected one of 24h, 3d, 7d, 14d, 30d, 90d, never",
                    s
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip() {
        for policy in AutoLockPolicy::ALL {
            assert_eq!(policy.label().parse::<AutoLockPolicy>().unwrap(), policy);
        }
        assert!("2h".parse::<AutoLockPolicy>().is_err());
    }

    #[test]
    fn test_expiry() {
        let day_ms = 24 * 60 * 60 * 1000;
        assert!(!AutoLockPolicy::Hours24.is_expired(0, day_ms - 1));
        assert!(AutoLockPolicy::Hours24.is_expired(0, day_ms));
        assert!(!AutoLockPolicy::Days3.is_expired(0, day_ms * 2));
        assert!(!AutoLockPolicy::Never.is_expired(0, u64::MAX));
    }

    #[test]
    fn test_default_is_24h() {
        assert_eq!(AutoLockPolicy::default(), AutoLockPolicy::Hours24);
        assert_eq!(AutoLockPolicy::Never.duration(), None);
    }
}
