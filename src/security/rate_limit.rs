//! Fixed-window request counter keyed by an arbitrary string (client IP,
//! username, ...).
//!
//! Counters live in process memory behind a `Mutex`, which is sufficient
//! for a single-server deployment. Scaling out requires externalizing
//! the counters to a shared store with atomic increment+expire behind
//! this same interface; the in-memory map then remains as the
//! single-process fallback and test double.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started_at: Instant,
}

/// Outcome of one rate-limit check.
#[derive(Debug, Clone, Copy)]
pub struct RateDecision {
    pub allowed: bool,
    /// Requests left in the current window (0 when denied).
    pub remaining: u32,
    /// Time until the current window resets.
    pub reset_after: Duration,
}

pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(max_requests: u32, window_seconds: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_seconds),
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Count one request against `key` and decide whether it is allowed.
    pub fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now())
    }

    /// Deterministic variant used by the tests; `now` is injected so no
    /// test has to sleep through a real window.
    pub fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let window = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started_at: now,
        });

        // Expired windows are lazily reset on next access.
        if now.duration_since(window.started_at) >= self.window {
            window.count = 0;
            window.started_at = now;
        }

        let elapsed = now.duration_since(window.started_at);
        let reset_after = self.window.saturating_sub(elapsed);

        if window.count >= self.max_requests {
            return RateDecision {
                allowed: false,
                remaining: 0,
                reset_after,
            };
        }

        window.count += 1;

        RateDecision {
            allowed: true,
            remaining: self.max_requests - window.count,
            reset_after,
        }
    }

    /// Drop every expired window. Called periodically by the maintenance
    /// scheduler so abandoned keys do not accumulate.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let before = windows.len();
        windows.retain(|_, w| now.duration_since(w.started_at) < self.window);
        before - windows.len()
    }

    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourth_request_in_window_is_denied() {
        let limiter = RateLimiter::new(3, 60);
        let t0 = Instant::now();

        let results: Vec<bool> = (0..4)
            .map(|i| limiter.check_at("1.2.3.4", t0 + Duration::from_secs(i)).allowed)
            .collect();

        assert_eq!(results, vec![true, true, true, false]);
    }

    #[test]
    fn test_window_expiry_resets_counter() {
        let limiter = RateLimiter::new(3, 60);
        let t0 = Instant::now();

        for _ in 0..3 {
            assert!(limiter.check_at("k", t0).allowed);
        }
        assert!(!limiter.check_at("k", t0 + Duration::from_secs(59)).allowed);

        // Window elapsed: next call is allowed again.
        let decision = limiter.check_at("k", t0 + Duration::from_secs(60));
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 2);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new(1, 60);
        let t0 = Instant::now();

        assert!(limiter.check_at("a", t0).allowed);
        assert!(!limiter.check_at("a", t0).allowed);
        assert!(limiter.check_at("b", t0).allowed);
    }

    #[test]
    fn test_remaining_counts_down() {
        let limiter = RateLimiter::new(3, 60);
        let t0 = Instant::now();

        assert_eq!(limiter.check_at("k", t0).remaining, 2);
        assert_eq!(limiter.check_at("k", t0).remaining, 1);
        assert_eq!(limiter.check_at("k", t0).remaining, 0);
        assert_eq!(limiter.check_at("k", t0).remaining, 0);
    }

    #[test]
    fn test_sweep_drops_only_expired_windows() {
        let limiter = RateLimiter::new(3, 60);
        let t0 = Instant::now();

        limiter.check_at("old", t0);
        limiter.check_at("fresh", t0 + Duration::from_secs(30));
        assert_eq!(limiter.tracked_keys(), 2);

        let removed = limiter.sweep_at(t0 + Duration::from_secs(61));
        assert_eq!(removed, 1);
        assert_eq!(limiter.tracked_keys(), 1);
    }
}
