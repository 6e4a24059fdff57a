//! Background cleanup of expired limiter records.
//!
//! Expired attempt windows are only replaced when their identifier shows up
//! again, so a one-off crawler would otherwise pin memory forever. The
//! janitor sweeps on a fixed interval, bounding the store to identifiers
//! active within roughly one interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::observability::metrics;
use crate::security::rate_limit::RateLimiter;

pub struct Janitor {
    limiter: Arc<RateLimiter>,
    interval: Duration,
}

impl Janitor {
    pub fn new(limiter: Arc<RateLimiter>, interval: Duration) -> Self {
        Self { limiter, interval }
    }

    /// Run the sweep loop until the shutdown signal arrives.
    ///
    /// Spawn this on its own task; it shares the limiter's locking with the
    /// request path, so a record being incremented is never swept mid-write.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval = ?self.interval, "Rate limiter janitor starting");

        let mut ticker = time::interval(self.interval);
        // The first tick fires immediately; skip it so a fresh store is not
        // swept before it has seen any traffic.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.limiter.sweep();
                    if removed > 0 {
                        metrics::record_sweep(removed);
                        tracing::debug!(removed, "Swept expired limiter records");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Janitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;
    use crate::security::clock::ManualClock;
    use crate::security::rate_limit::RatePolicy;

    #[tokio::test]
    async fn janitor_sweeps_and_stops_on_shutdown() {
        let clock = ManualClock::new();
        let limiter = Arc::new(RateLimiter::with_clock(Arc::new(clock.clone())));
        let policy = RatePolicy::new("test", 3, Duration::from_millis(10));

        limiter.check("10.0.0.1", &policy);
        limiter.check("10.0.0.2", &policy);
        clock.advance(Duration::from_millis(50));

        let shutdown = Shutdown::new();
        let janitor = Janitor::new(limiter.clone(), Duration::from_millis(5));
        let handle = tokio::spawn(janitor.run(shutdown.subscribe()));

        // Give the janitor a couple of ticks to observe the expired records.
        time::sleep(Duration::from_millis(30)).await;
        assert_eq!(limiter.tracked_identifiers(), 0);

        shutdown.trigger();
        time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("janitor must exit on shutdown")
            .expect("janitor task panicked");
    }
}
