//! Configuration validation.
//!
//! Serde handles the syntax; this pass handles the semantics. All errors
//! are collected and returned together rather than failing on the first,
//! so a bad config file can be fixed in one edit.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::GuardConfig;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("policy '{0}' must allow at least one attempt")]
    ZeroAttempts(&'static str),

    #[error("policy '{0}' must have a non-zero window")]
    ZeroWindow(&'static str),

    #[error("sweep interval must be non-zero")]
    ZeroSweepInterval,

    #[error("invalid metrics address '{0}'")]
    BadMetricsAddress(String),

    #[error("empty header skip prefix")]
    EmptySkipPrefix,
}

/// Validate a configuration, returning every violation found.
pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let policies = [
        ("strict", &config.rate_limit.strict),
        ("login", &config.rate_limit.login),
        ("api", &config.rate_limit.api),
    ];
    for (name, policy) in policies {
        if policy.max_attempts == 0 {
            errors.push(ValidationError::ZeroAttempts(name));
        }
        if policy.window_secs == 0 {
            errors.push(ValidationError::ZeroWindow(name));
        }
    }

    if config.rate_limit.sweep_interval_secs == 0 {
        errors.push(ValidationError::ZeroSweepInterval);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::BadMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.headers.skip_prefixes.iter().any(|p| p.is_empty()) {
        errors.push(ValidationError::EmptySkipPrefix);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
