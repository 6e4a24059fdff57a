//! Request security layer for the Looms & Petals storefront.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → security/headers.rs (attach security response headers, never blocks)
//!     → security/rate_limit.rs (per-IP attempt quotas on auth endpoints)
//!     → security/signature.rs (verify payment gateway callbacks)
//!     → Pass to route handlers
//! ```
//!
//! # Design Decisions
//! - The limiter store is an injectable object, not a module-level singleton
//! - All expiry decisions go through an injectable clock for deterministic tests
//! - Quota exhaustion and failed verification are normal outcomes, not errors
//! - State is in-memory and per-process; a restart resets counters and blocks

pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::GuardConfig;
pub use lifecycle::Shutdown;
pub use security::clock::{Clock, ManualClock, SystemClock};
pub use security::headers::{apply_security_headers, security_headers_middleware};
pub use security::janitor::Janitor;
pub use security::rate_limit::{
    client_identifier, rate_limit_middleware, Decision, RateLimitState, RateLimiter, RatePolicy,
};
pub use security::signature::{verify_payment, verify_webhook};
