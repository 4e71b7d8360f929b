//! Rolling-window rate limiter.
//!
//! Admits at most `rate` requests per window. A window opens at the first
//! decision made after the previous one has expired; unused budget does not
//! carry over. Bursts up to the full rate are admitted immediately, and the
//! state is O(1) regardless of the rate.

use crate::application::ports::{Clock, RateLimiter};
use crate::domain::config::RateLimiterConfig;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug)]
struct WindowState {
    window_start: Instant,
    admitted: u32,
}

impl WindowState {
    fn reset(&mut self, now: Instant) {
        // Never move the window backwards, even if the clock reads are reordered.
        if now > self.window_start {
            self.window_start = now;
        }
        self.admitted = 0;
    }
}

/// Window rate limiter.
///
/// The expiry check, budget check and increment run under one lock, so
/// concurrent callers can never push the admitted count above the rate.
///
/// # Example
/// ```
/// use rate_bench::{RateLimiter, RateLimiterConfig, SystemClock, WindowRateLimiter};
/// use std::sync::Arc;
///
/// let config = RateLimiterConfig::per_second(2).unwrap();
/// let limiter = WindowRateLimiter::new(config, Arc::new(SystemClock::new()));
///
/// assert!(limiter.allow_request());
/// assert!(limiter.allow_request());
/// assert!(!limiter.allow_request());
/// ```
#[derive(Debug)]
pub struct WindowRateLimiter {
    config: RateLimiterConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<WindowState>,
}

impl WindowRateLimiter {
    /// Create a limiter whose first window starts now.
    pub fn new(config: RateLimiterConfig, clock: Arc<dyn Clock>) -> Self {
        let window_start = clock.now();
        Self {
            config,
            clock,
            state: Mutex::new(WindowState {
                window_start,
                admitted: 0,
            }),
        }
    }

    /// Get the limiter configuration.
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }
}

impl RateLimiter for WindowRateLimiter {
    fn allow_request(&self) -> bool {
        let mut state = self.state.lock();
        let now = self.clock.now();

        // The boundary instant belongs to the new window. Compare elapsed time
        // so that windows too large to add to an `Instant` never overflow.
        if now.saturating_duration_since(state.window_start) >= self.config.window() {
            state.reset(now);
        }

        if state.admitted < self.config.rate() {
            state.admitted += 1;
            true
        } else {
            false
        }
    }

    fn reset_window(&self) {
        let mut state = self.state.lock();
        let now = self.clock.now();
        state.reset(now);
    }
}
