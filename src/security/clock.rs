//! Time source abstraction for the limiter.
//!
//! Window and block expiry must be testable without real sleeping, so the
//! limiter never calls `Instant::now()` directly. Production wiring uses
//! [`SystemClock`]; tests drive a [`ManualClock`].

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Monotonic time source consulted for every expiry decision.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// The real monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        *self.now.lock().expect("clock mutex poisoned") += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().expect("clock mutex poisoned")
    }
}
