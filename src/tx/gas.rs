//! Gas governance.
//!
//! # Responsibilities
//! - Parse and format gwei amounts
//! - Persist the user's gas price limit, rejecting out-of-range values
//! - Compute the price actually used for a transaction
//! - Pad node gas estimates

use alloy::primitives::utils::{format_units, parse_units};
use alloy::primitives::U256;
use std::sync::Arc;

use crate::config::GasConfig;
use crate::error::{WalletError, WalletResult};
use crate::storage::{KeyValueStore, GAS_PRICE_LIMIT};

/// Parse a decimal gwei string into wei.
pub fn parse_gwei(value: &str) -> WalletResult<u128> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.starts_with('-') {
        return Err(WalletError::Validation(format!(
            "'{}' is not a valid gwei amount",
            value
        )));
    }
    let wei: U256 = parse_units(trimmed, "gwei")
        .map_err(|e| WalletError::Validation(format!("'{}' is not a valid gwei amount: {}", value, e)))?
        .get_absolute();
    u128::try_from(wei)
        .map_err(|_| WalletError::Validation(format!("'{}' gwei is out of range", value)))
}

/// Format wei as a trimmed decimal gwei string ("5", "0.1").
pub fn format_gwei(wei: u128) -> String {
    match format_units(U256::from(wei), "gwei") {
        Ok(formatted) => {
            if formatted.contains('.') {
                formatted
                    .trim_end_matches('0')
                    .trim_end_matches('.')
                    .to_string()
            } else {
                formatted
            }
        }
        Err(_) => format!("{} wei", wei),
    }
}

/// Price bounds in effect for one submission. Prices are wei.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasPolicy {
    /// The user's gas price limit.
    pub max_price: u128,
    pub default_price: u128,
    pub limit_multiplier: f64,
    pub price_bump_percent: u64,
}

/// Price to submit with.
///
/// A live price above the limit is capped at the limit. Otherwise the live
/// price is bumped by `price_bump_percent` and capped. Without a live price
/// the default is used.
pub fn compute_safe_price(network_price: Option<u128>, policy: &GasPolicy) -> u128 {
    match network_price {
        None => policy.default_price,
        Some(price) if price > policy.max_price => policy.max_price,
        Some(price) => {
            let bumped = price.saturating_mul(100 + policy.price_bump_percent as u128) / 100;
            bumped.min(policy.max_price)
        }
    }
}

/// Node estimate padded by the multiplier, rounded up.
pub fn gas_limit_with_buffer(estimate: u64, multiplier: f64) -> u64 {
    let padded = (estimate as f64 * multiplier).ceil();
    if padded >= u64::MAX as f64 {
        u64::MAX
    } else {
        padded as u64
    }
}

/// Persisted gas preferences.
pub struct GasSettings {
    store: Arc<dyn KeyValueStore>,
    min_limit: u128,
    max_limit: u128,
    default_limit: u128,
    default_price: u128,
    limit_multiplier: f64,
    price_bump_percent: u64,
    fallback_gas_limit: u64,
}

impl GasSettings {
    pub fn new(config: &GasConfig, store: Arc<dyn KeyValueStore>) -> WalletResult<Self> {
        let parse = |field: &str, value: &str| {
            parse_gwei(value).map_err(|e| WalletError::Config(format!("gas.{}: {}", field, e)))
        };
        Ok(Self {
            store,
            min_limit: parse("min_gwei", &config.min_gwei)?,
            max_limit: parse("max_gwei", &config.max_gwei)?,
            default_limit: parse("default_limit_gwei", &config.default_limit_gwei)?,
            default_price: parse("default_price_gwei", &config.default_price_gwei)?,
            limit_multiplier: config.limit_multiplier,
            price_bump_percent: config.price_bump_percent,
            fallback_gas_limit: config.fallback_gas_limit,
        })
    }

    /// Validate and persist a gas price limit given in gwei. Returns the limit in wei.
    pub fn save_gas_limit(&self, gwei: &str) -> WalletResult<u128> {
        let wei = parse_gwei(gwei)?;
        if wei < self.min_limit || wei > self.max_limit {
            return Err(WalletError::Validation(format!(
                "gas price limit {} gwei is outside the allowed range {}..={} gwei",
                gwei.trim(),
                format_gwei(self.min_limit),
                format_gwei(self.max_limit)
            )));
        }
        self.store.put(GAS_PRICE_LIMIT, format_gwei(wei))?;
        tracing::info!(limit_gwei = %format_gwei(wei), "Gas price limit saved");
        Ok(wei)
    }

    /// Current gas price limit in wei. Falls back to the default when nothing
    /// valid is stored.
    pub fn gas_price_limit(&self) -> u128 {
        let Some(stored) = self.store.get(GAS_PRICE_LIMIT) else {
            return self.default_limit;
        };
        match parse_gwei(&stored) {
            Ok(wei) if (self.min_limit..=self.max_limit).contains(&wei) => wei,
            Ok(_) | Err(_) => {
                tracing::warn!(stored = %stored, "Ignoring invalid stored gas price limit");
                self.default_limit
            }
        }
    }

    /// Bounds for the next submission.
    pub fn policy(&self) -> GasPolicy {
        let limit = self.gas_price_limit();
        GasPolicy {
            max_price: limit,
            default_price: self.default_price.min(limit),
            limit_multiplier: self.limit_multiplier,
            price_bump_percent: self.price_bump_percent,
        }
    }

    /// Gas limit used when estimation fails.
    pub fn fallback_gas_limit(&self) -> u64 {
        self.fallback_gas_limit
    }
}
