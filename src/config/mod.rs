//! Configuration subsystem.
//!
//! # Data Flow
//! ```text
//! guard.toml ──▶ loader.rs (read, parse)
//!                    │
//!                    ▼
//!              env overlay (PAYMENT_SECRET, WEBHOOK_SECRET)
//!                    │
//!                    ▼
//!              validation.rs (all errors at once)
//!                    │
//!                    ▼
//!              GuardConfig accepted into the system
//! ```
//!
//! # Design Decisions
//! - Serde handles syntax; validation handles semantics
//! - Secrets come from the environment, never from the config file alone
//! - Every section defaults so an empty file is a working dev config

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{GuardConfig, HeadersConfig, ObservabilityConfig, RateLimitConfig, SecretsConfig};
