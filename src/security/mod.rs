//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (attach security response headers)
//!     → rate_limit.rs (check per-IP attempt quotas)
//!     → signature.rs (authenticate payment gateway callbacks)
//!     → Pass to route handlers
//! ```
//!
//! # Design Decisions
//! - Fail closed: a missing secret rejects every signature
//! - Denials are normal decisions, not errors
//! - No trust in client input: forwarded-IP headers fall back to "unknown"

pub mod clock;
pub mod headers;
pub mod janitor;
pub mod rate_limit;
pub mod signature;
