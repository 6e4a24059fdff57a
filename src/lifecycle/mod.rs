//! Lifecycle coordination.
//!
//! # Design Decisions
//! - One broadcast channel fans the shutdown signal out to every
//!   long-running task (currently the janitor)
//! - Tasks subscribe at spawn time and exit their loops on receive, so
//!   tests never leak background tasks

pub mod shutdown;

pub use shutdown::Shutdown;
