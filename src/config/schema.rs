//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the guard
//! layer. All types derive Serde traits for deserialization from config
//! files, and every section defaults to a sane development value.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::security::rate_limit::RatePolicy;

/// Root configuration for the storefront security layer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    /// Attempt quotas and janitor cadence.
    pub rate_limit: RateLimitConfig,

    /// Security response header behavior.
    pub headers: HeadersConfig,

    /// Payment gateway secrets (overlaid from the environment).
    pub secrets: SecretsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// One named attempt quota.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct PolicyConfig {
    /// Attempts admitted per window.
    pub max_attempts: u32,

    /// Window length in seconds.
    pub window_secs: u64,
}

impl PolicyConfig {
    fn to_policy(self, name: &'static str) -> RatePolicy {
        RatePolicy::new(name, self.max_attempts, Duration::from_secs(self.window_secs))
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Registration and password reset: 3 attempts per 15 minutes.
    pub strict: PolicyConfig,

    /// Login: 5 attempts per minute.
    pub login: PolicyConfig,

    /// General API traffic: 30 requests per minute.
    pub api: PolicyConfig,

    /// Janitor sweep interval in seconds.
    pub sweep_interval_secs: u64,
}

impl RateLimitConfig {
    pub fn strict_policy(&self) -> RatePolicy {
        self.strict.to_policy("strict")
    }

    pub fn login_policy(&self) -> RatePolicy {
        self.login.to_policy("login")
    }

    pub fn api_policy(&self) -> RatePolicy {
        self.api.to_policy("api")
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            strict: PolicyConfig {
                max_attempts: 3,
                window_secs: 15 * 60,
            },
            login: PolicyConfig {
                max_attempts: 5,
                window_secs: 60,
            },
            api: PolicyConfig {
                max_attempts: 30,
                window_secs: 60,
            },
            sweep_interval_secs: 5 * 60,
        }
    }
}

/// Security response header configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeadersConfig {
    /// Enable the header middleware.
    pub enabled: bool,

    /// Production deployment: adds Strict-Transport-Security.
    pub production: bool,

    /// Path prefixes the header table skips (static assets, image endpoints).
    pub skip_prefixes: Vec<String>,
}

impl Default for HeadersConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            production: false,
            skip_prefixes: vec![
                "/static/".to_string(),
                "/assets/".to_string(),
                "/images/".to_string(),
            ],
        }
    }
}

/// Payment gateway secrets.
///
/// The file values are placeholders for development; `load_config` overlays
/// `PAYMENT_SECRET` and `WEBHOOK_SECRET` from the environment when present.
/// An empty secret makes the verifier reject everything.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SecretsConfig {
    /// Key for payment-completion callback signatures.
    pub payment_secret: String,

    /// Key for gateway webhook signatures.
    pub webhook_secret: String,
}

impl SecretsConfig {
    /// Overlay secrets from the process environment.
    pub fn overlay_env(&mut self) {
        if let Ok(secret) = std::env::var("PAYMENT_SECRET") {
            self.payment_secret = secret;
        }
        if let Ok(secret) = std::env::var("WEBHOOK_SECRET") {
            self.webhook_secret = secret;
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_named_policies() {
        let config = RateLimitConfig::default();

        assert_eq!(config.strict_policy(), RatePolicy::strict());
        assert_eq!(config.login_policy(), RatePolicy::login());
        assert_eq!(config.api_policy(), RatePolicy::api());
        assert_eq!(config.sweep_interval(), Duration::from_secs(300));
    }

    #[test]
    fn empty_file_deserializes_to_defaults() {
        let config: GuardConfig = toml::from_str("").unwrap();
        assert!(config.headers.enabled);
        assert!(!config.headers.production);
        assert_eq!(config.rate_limit.login.max_attempts, 5);
    }

    #[test]
    fn sections_override_independently() {
        let config: GuardConfig = toml::from_str(
            r#"
            [headers]
            production = true

            [rate_limit.login]
            max_attempts = 10
            window_secs = 120
            "#,
        )
        .unwrap();

        assert!(config.headers.production);
        assert_eq!(config.rate_limit.login.max_attempts, 10);
        assert_eq!(
            config.rate_limit.login_policy().window,
            Duration::from_secs(120)
        );
        // Untouched sections keep their defaults.
        assert_eq!(config.rate_limit.strict.max_attempts, 3);
    }
}
