//! Structured logging initialization.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::schema::ObservabilityConfig;

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured level applies to this
/// crate. Call once at startup; host applications that install their own
/// subscriber skip this.
pub fn init(config: &ObservabilityConfig) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("storefront_guard={}", config.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
