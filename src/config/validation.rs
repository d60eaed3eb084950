//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate endpoint pools (non-empty, parsable URLs)
//! - Validate value ranges (timeouts > 0, gas bounds ordered)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: WalletConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::WalletConfig;
use crate::network::Network;
use crate::tx::gas::parse_gwei;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &WalletConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for network in [Network::Main, Network::Test] {
        let field = format!("network.endpoints.{}", network);
        let endpoints = config.network.endpoints_for(network);
        if endpoints.is_empty() {
            errors.push(ValidationError::new(&field, "at least one endpoint is required"));
        }
        for endpoint in endpoints {
            if let Err(e) = endpoint.parse::<url::Url>() {
                errors.push(ValidationError::new(&field, format!("invalid URL '{}': {}", endpoint, e)));
            }
        }
    }

    if config.network.chain_ids.main == config.network.chain_ids.test {
        errors.push(ValidationError::new(
            "network.chain_ids",
            "main and test networks must use different chain ids",
        ));
    }
    if config.network.probe_timeout_ms == 0 {
        errors.push(ValidationError::new("network.probe_timeout_ms", "must be greater than zero"));
    }
    if config.network.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("network.rpc_timeout_secs", "must be greater than zero"));
    }

    let gas = &config.gas;
    let min = check_gwei(&mut errors, "gas.min_gwei", &gas.min_gwei);
    let max = check_gwei(&mut errors, "gas.max_gwei", &gas.max_gwei);
    let limit = check_gwei(&mut errors, "gas.default_limit_gwei", &gas.default_limit_gwei);
    check_gwei(&mut errors, "gas.default_price_gwei", &gas.default_price_gwei);

    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            errors.push(ValidationError::new("gas", "min_gwei must not exceed max_gwei"));
        } else if let Some(limit) = limit {
            if limit < min || limit > max {
                errors.push(ValidationError::new(
                    "gas.default_limit_gwei",
                    "must lie within [min_gwei, max_gwei]",
                ));
            }
        }
    }
    if gas.limit_multiplier.is_nan() || gas.limit_multiplier < 1.0 {
        errors.push(ValidationError::new("gas.limit_multiplier", "must be at least 1.0"));
    }
    if gas.fallback_gas_limit < 21_000 {
        errors.push(ValidationError::new("gas.fallback_gas_limit", "must be at least 21000"));
    }

    if config.retry.max_attempts == 0 {
        errors.push(ValidationError::new("retry.max_attempts", "must be greater than zero"));
    }
    if config.retry.base_delay_ms > config.retry.max_delay_ms {
        errors.push(ValidationError::new("retry", "base_delay_ms must not exceed max_delay_ms"));
    }
    if config.transactions.receipt_poll_ms == 0 {
        errors.push(ValidationError::new("transactions.receipt_poll_ms", "must be greater than zero"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_gwei(errors: &mut Vec<ValidationError>, field: &str, value: &str) -> Option<u128> {
    match parse_gwei(value) {
        Ok(wei) => Some(wei),
        Err(e) => {
            errors.push(ValidationError::new(field, e.to_string()));
            None
        }
    }
}
