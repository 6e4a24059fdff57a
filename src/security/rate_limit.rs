//! Fixed-window rate limiting for attempt-sensitive endpoints.
//!
//! Registration, login, and password-reset handlers consult the limiter
//! before doing any work; payment callbacks and static assets never do.
//! Windows reset entirely at fixed boundaries, so up to twice the quota can
//! pass across a boundary. That is standard fixed-window behavior and the
//! accepted trade-off here.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;

use crate::observability::metrics;
use crate::security::clock::{Clock, SystemClock};

/// One rate-limit rule: how many attempts fit in one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    /// Name used in logs and metrics labels.
    pub name: &'static str,
    pub max_attempts: u32,
    pub window: Duration,
}

impl RatePolicy {
    pub const fn new(name: &'static str, max_attempts: u32, window: Duration) -> Self {
        Self {
            name,
            max_attempts,
            window,
        }
    }

    /// Registration and password reset: 3 attempts per 15 minutes.
    pub const fn strict() -> Self {
        Self::new("strict", 3, Duration::from_secs(15 * 60))
    }

    /// Login: 5 attempts per minute.
    pub const fn login() -> Self {
        Self::new("login", 5, Duration::from_secs(60))
    }

    /// General API traffic: 30 requests per minute.
    pub const fn api() -> Self {
        Self::new("api", 30, Duration::from_secs(60))
    }
}

/// Outcome of a quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    /// Attempts left in the current window after this call.
    pub remaining: u32,
    /// When the current window expires.
    pub reset_at: Option<Instant>,
}

/// Attempt counter for one identifier within one window.
#[derive(Debug, Clone, Copy)]
struct AttemptRecord {
    count: u32,
    reset_at: Instant,
}

/// Keyed attempt counter store with explicit blocks.
///
/// Construct one per process and share it behind an `Arc`; tests construct
/// isolated instances with a [`ManualClock`](crate::security::clock::ManualClock).
/// State lives in memory only: a restart or a second instance starts with
/// fresh counters, which slows brute force rather than eliminating it.
pub struct RateLimiter {
    /// The read-check-increment in `check` is a critical section. A plain
    /// unsynchronized read/compare/write would lose updates under concurrent
    /// load and let more than `max_attempts` through.
    attempts: Mutex<HashMap<String, AttemptRecord>>,
    /// Explicit blocks, separate from organic quota exhaustion.
    blocks: DashMap<String, Instant>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            attempts: Mutex::new(HashMap::new()),
            blocks: DashMap::new(),
            clock,
        }
    }

    /// Current instant on the limiter's clock.
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Is this caller allowed to proceed right now?
    ///
    /// A window is expired only when `now` is strictly past its reset
    /// instant; the boundary instant still belongs to the old window.
    /// Denials do not increment the stored count.
    pub fn check(&self, identifier: &str, policy: &RatePolicy) -> Decision {
        let now = self.clock.now();
        let mut attempts = self.attempts.lock().expect("rate limiter mutex poisoned");

        match attempts.get_mut(identifier) {
            Some(record) if now <= record.reset_at => {
                if record.count >= policy.max_attempts {
                    Decision {
                        allowed: false,
                        remaining: 0,
                        reset_at: Some(record.reset_at),
                    }
                } else {
                    record.count += 1;
                    Decision {
                        allowed: true,
                        remaining: policy.max_attempts - record.count,
                        reset_at: Some(record.reset_at),
                    }
                }
            }
            _ => {
                // Fresh identifier, or the previous window has expired.
                let reset_at = now + policy.window;
                attempts.insert(
                    identifier.to_string(),
                    AttemptRecord { count: 1, reset_at },
                );
                Decision {
                    allowed: true,
                    remaining: policy.max_attempts.saturating_sub(1),
                    reset_at: Some(reset_at),
                }
            }
        }
    }

    /// Forget all attempts for an identifier, e.g. after a successful login.
    pub fn reset(&self, identifier: &str) {
        self.attempts
            .lock()
            .expect("rate limiter mutex poisoned")
            .remove(identifier);
    }

    /// Block an identifier outright for the given duration, overwriting any
    /// existing block.
    pub fn block(&self, identifier: &str, duration: Duration) {
        let blocked_until = self.clock.now() + duration;
        self.blocks.insert(identifier.to_string(), blocked_until);
        metrics::record_block_event("block");
        tracing::warn!(client = %identifier, ?duration, "Client blocked");
    }

    /// True iff an unexpired block exists. An expired block record is
    /// deleted during the lookup.
    pub fn is_blocked(&self, identifier: &str) -> bool {
        let now = self.clock.now();
        self.blocks.remove_if(identifier, |_, until| *until <= now);
        self.blocks.contains_key(identifier)
    }

    /// Lift a block early.
    pub fn unblock(&self, identifier: &str) {
        if self.blocks.remove(identifier).is_some() {
            metrics::record_block_event("unblock");
        }
    }

    /// Remove every attempt record whose window has expired and every
    /// expired block. Returns how many records were removed.
    ///
    /// Called by the janitor; holds the same locks as the request path so a
    /// record being incremented is never deleted underneath the writer.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();

        let mut attempts = self.attempts.lock().expect("rate limiter mutex poisoned");
        let before = attempts.len();
        attempts.retain(|_, record| record.reset_at >= now);
        let mut removed = before - attempts.len();
        drop(attempts);

        let before_blocks = self.blocks.len();
        self.blocks.retain(|_, until| *until > now);
        removed += before_blocks.saturating_sub(self.blocks.len());

        removed
    }

    /// Number of live attempt records (expired-but-unswept included).
    pub fn tracked_identifiers(&self) -> usize {
        self.attempts
            .lock()
            .expect("rate limiter mutex poisoned")
            .len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Rate-limiting key for a request: first entry of `x-forwarded-for`,
/// falling back to `x-real-ip`, falling back to `"unknown"`.
///
/// Callers behind a proxy that sets neither header all collapse onto the
/// shared `"unknown"` identifier. That coarse fallback is intentional.
pub fn client_identifier(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    "unknown".to_string()
}

/// State for the rate-limit middleware: the shared store plus the policy
/// this route group is guarded by.
pub struct RateLimitState {
    pub limiter: Arc<RateLimiter>,
    pub policy: RatePolicy,
}

/// Middleware guarding attempt-sensitive routes.
///
/// Denials short-circuit with `429 Too Many Requests` and a `Retry-After`
/// hint; blocked clients are refused without consuming quota.
pub async fn rate_limit_middleware(
    State(state): State<Arc<RateLimitState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = client_identifier(request.headers());

    if state.limiter.is_blocked(&key) {
        tracing::warn!(client = %key, "Blocked client refused");
        metrics::record_rate_limited("blocked");
        return too_many_attempts(None, 0);
    }

    let decision = state.limiter.check(&key, &state.policy);
    if decision.allowed {
        next.run(request).await
    } else {
        tracing::warn!(client = %key, policy = state.policy.name, "Rate limit exceeded");
        metrics::record_rate_limited(state.policy.name);
        let retry_after = decision
            .reset_at
            .map(|at| at.saturating_duration_since(state.limiter.now()));
        too_many_attempts(retry_after, decision.remaining)
    }
}

fn too_many_attempts(retry_after: Option<Duration>, remaining: u32) -> Response {
    let mut response = Response::new(Body::from("Too many attempts, please try again later"));
    *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
    if let Some(wait) = retry_after {
        let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
        response.headers_mut().insert("retry-after", secs.into());
    }
    response
        .headers_mut()
        .insert("x-ratelimit-remaining", remaining.into());
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::clock::ManualClock;

    fn limiter_with_manual_clock() -> (RateLimiter, ManualClock) {
        let clock = ManualClock::new();
        let limiter = RateLimiter::with_clock(Arc::new(clock.clone()));
        (limiter, clock)
    }

    #[test]
    fn fresh_identifier_is_allowed() {
        let (limiter, _clock) = limiter_with_manual_clock();
        let policy = RatePolicy::login();

        let decision = limiter.check("10.0.0.1", &policy);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, policy.max_attempts - 1);
        assert!(decision.reset_at.is_some());
    }

    #[test]
    fn remaining_decreases_then_denies_without_counting() {
        let (limiter, _clock) = limiter_with_manual_clock();
        let policy = RatePolicy::new("test", 5, Duration::from_secs(60));

        for expected in [4, 3, 2, 1, 0] {
            let decision = limiter.check("10.0.0.1", &policy);
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected);
        }

        // Denied calls must not touch the stored count, so the window keeps
        // denying for its entire remainder no matter how often it is hit.
        for _ in 0..3 {
            let denied = limiter.check("10.0.0.1", &policy);
            assert!(!denied.allowed);
            assert_eq!(denied.remaining, 0);
        }
    }

    #[test]
    fn window_expiry_restarts_counting() {
        let (limiter, clock) = limiter_with_manual_clock();
        let policy = RatePolicy::new("test", 2, Duration::from_secs(60));

        limiter.check("10.0.0.1", &policy);
        limiter.check("10.0.0.1", &policy);
        let first_reset = limiter.check("10.0.0.1", &policy).reset_at;

        clock.advance(Duration::from_secs(61));

        let decision = limiter.check("10.0.0.1", &policy);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, policy.max_attempts - 1);
        assert!(decision.reset_at > first_reset, "window must advance");
    }

    #[test]
    fn boundary_instant_belongs_to_old_window() {
        let (limiter, clock) = limiter_with_manual_clock();
        let policy = RatePolicy::new("test", 1, Duration::from_secs(60));

        limiter.check("10.0.0.1", &policy);
        clock.advance(Duration::from_secs(60));

        // now == reset_at: not expired yet, so the exhausted window denies.
        assert!(!limiter.check("10.0.0.1", &policy).allowed);

        clock.advance(Duration::from_nanos(1));
        assert!(limiter.check("10.0.0.1", &policy).allowed);
    }

    #[test]
    fn reset_forgets_prior_attempts() {
        let (limiter, _clock) = limiter_with_manual_clock();
        let policy = RatePolicy::new("test", 2, Duration::from_secs(60));

        limiter.check("10.0.0.1", &policy);
        limiter.check("10.0.0.1", &policy);
        assert!(!limiter.check("10.0.0.1", &policy).allowed);

        limiter.reset("10.0.0.1");

        let decision = limiter.check("10.0.0.1", &policy);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, policy.max_attempts - 1);
    }

    #[test]
    fn identifiers_are_isolated() {
        let (limiter, _clock) = limiter_with_manual_clock();
        let policy = RatePolicy::new("test", 1, Duration::from_secs(60));

        limiter.check("10.0.0.1", &policy);
        assert!(!limiter.check("10.0.0.1", &policy).allowed);
        assert!(limiter.check("10.0.0.2", &policy).allowed);
    }

    #[test]
    fn block_expires_and_record_is_dropped() {
        let (limiter, clock) = limiter_with_manual_clock();

        limiter.block("10.0.0.1", Duration::from_secs(1));
        assert!(limiter.is_blocked("10.0.0.1"));

        clock.advance(Duration::from_millis(1001));
        assert!(!limiter.is_blocked("10.0.0.1"));
        // The expired record was deleted by the lookup itself.
        assert_eq!(limiter.blocks.len(), 0);
    }

    #[test]
    fn unblock_lifts_block_early() {
        let (limiter, _clock) = limiter_with_manual_clock();

        limiter.block("10.0.0.1", Duration::from_secs(3600));
        assert!(limiter.is_blocked("10.0.0.1"));

        limiter.unblock("10.0.0.1");
        assert!(!limiter.is_blocked("10.0.0.1"));
    }

    #[test]
    fn block_overwrite_extends_duration() {
        let (limiter, clock) = limiter_with_manual_clock();

        limiter.block("10.0.0.1", Duration::from_secs(1));
        limiter.block("10.0.0.1", Duration::from_secs(10));

        clock.advance(Duration::from_secs(2));
        assert!(limiter.is_blocked("10.0.0.1"));
    }

    #[test]
    fn sweep_removes_only_expired_records() {
        let (limiter, clock) = limiter_with_manual_clock();
        let short = RatePolicy::new("short", 3, Duration::from_secs(10));
        let long = RatePolicy::new("long", 3, Duration::from_secs(600));

        limiter.check("10.0.0.1", &short);
        limiter.check("10.0.0.2", &long);
        limiter.block("10.0.0.3", Duration::from_secs(5));

        clock.advance(Duration::from_secs(60));
        let removed = limiter.sweep();

        assert_eq!(removed, 2);
        assert_eq!(limiter.tracked_identifiers(), 1);
        // The surviving window still counts attempts.
        assert!(limiter.check("10.0.0.2", &long).allowed);
    }

    #[test]
    fn concurrent_burst_allows_exactly_max_attempts() {
        let limiter = Arc::new(RateLimiter::new());
        let policy = RatePolicy::new("burst", 5, Duration::from_secs(60));

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || limiter.check("10.0.0.1", &policy).allowed)
            })
            .collect();

        let allowed = handles
            .into_iter()
            .map(|h| h.join().expect("checker thread panicked"))
            .filter(|&allowed| allowed)
            .count();

        assert_eq!(allowed, 5, "no race may admit more than max_attempts");
    }

    #[test]
    fn identifier_prefers_first_forwarded_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            " 203.0.113.7 , 10.0.0.1".parse().unwrap(),
        );
        headers.insert("x-real-ip", "10.9.9.9".parse().unwrap());
        assert_eq!(client_identifier(&headers), "203.0.113.7");
    }

    #[test]
    fn identifier_falls_back_to_real_ip_then_unknown() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "10.9.9.9".parse().unwrap());
        assert_eq!(client_identifier(&headers), "10.9.9.9");

        assert_eq!(client_identifier(&HeaderMap::new()), "unknown");
    }
}
