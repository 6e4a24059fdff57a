//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Security layer produces:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (denial, block, signature, sweep counters)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Metric updates are cheap counter increments, never locks
//! - Denials and verification failures log at warn with the client key,
//!   never with secret material

pub mod logging;
pub mod metrics;
