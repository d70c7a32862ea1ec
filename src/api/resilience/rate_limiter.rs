//! Sliding window rate limiter implementation
//!
//! Keeps the timestamp of every admitted request inside the trailing window
//! and admits a new one only while fewer than `max_requests` remain. The log
//! is purged on every admission check, so the decision is exact at window
//! boundaries.

use super::clock::{system_clock, SharedClock};
use super::config::RateLimitConfig;
use log::debug;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Sliding log rate limiter for outbound CRM requests
#[derive(Debug, Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<RateLimiterInner>>,
    config: RateLimitConfig,
    clock: SharedClock,
}

#[derive(Debug, Default)]
struct RateLimiterInner {
    /// Admitted request timestamps, epoch millis, in admission order
    requests: VecDeque<i64>,
    requests_made: u64,
    requests_rejected: u64,
}

impl RateLimiter {
    /// Create a new rate limiter with the given configuration
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, system_clock())
    }

    /// Create a rate limiter that reads time from `clock`
    pub fn with_clock(config: RateLimitConfig, clock: SharedClock) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RateLimiterInner::default())),
            config,
            clock,
        }
    }

    /// Admit a request if the window has room, recording it on success
    pub fn can_make_request(&self) -> bool {
        let now = self.clock.now_millis();
        let mut inner = self.lock();

        self.purge(&mut inner, now);

        if inner.requests.len() >= self.config.max_requests {
            inner.requests_rejected += 1;
            debug!(
                "Rate limiter: Request rejected, {} requests in the last {}ms",
                inner.requests.len(),
                self.window_millis()
            );
            return false;
        }

        inner.requests.push_back(now);
        inner.requests_made += 1;
        true
    }

    /// Time until the oldest recorded request leaves the window
    pub fn wait_time(&self) -> Duration {
        let now = self.clock.now_millis();
        let inner = self.lock();

        match inner.requests.iter().min() {
            None => Duration::ZERO,
            Some(&oldest) => {
                let wait = self.window_millis() - (now - oldest);
                Duration::from_millis(wait.max(0) as u64)
            }
        }
    }

    /// Admissions left in the current window
    pub fn remaining_requests(&self) -> usize {
        let now = self.clock.now_millis();
        let mut inner = self.lock();

        self.purge(&mut inner, now);
        self.config.max_requests.saturating_sub(inner.requests.len())
    }

    /// Epoch millis at which the oldest recorded request expires, or now
    pub fn reset_time(&self) -> i64 {
        let now = self.clock.now_millis();
        let inner = self.lock();

        match inner.requests.iter().min() {
            None => now,
            Some(&oldest) => oldest + self.window_millis(),
        }
    }

    /// Get current rate limiter statistics
    pub fn stats(&self) -> RateLimiterStats {
        let inner = self.lock();
        RateLimiterStats {
            in_window: inner.requests.len(),
            requests_made: inner.requests_made,
            requests_rejected: inner.requests_rejected,
            max_requests: self.config.max_requests,
            window: self.config.window,
        }
    }

    /// Get the rate limiter configuration
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn purge(&self, inner: &mut RateLimiterInner, now: i64) {
        let window_start = now - self.window_millis();
        inner.requests.retain(|&ts| ts > window_start);
    }

    fn window_millis(&self) -> i64 {
        self.config.window.as_millis() as i64
    }

    fn lock(&self) -> MutexGuard<'_, RateLimiterInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Rate limiter statistics
#[derive(Debug, Clone)]
pub struct RateLimiterStats {
    /// Requests currently recorded (may include expired ones until the next purge)
    pub in_window: usize,
    pub requests_made: u64,
    pub requests_rejected: u64,
    pub max_requests: usize,
    pub window: Duration,
}

impl RateLimiterStats {
    /// Calculate the acceptance rate (approved / total)
    pub fn acceptance_rate(&self) -> f64 {
        let total = self.requests_made + self.requests_rejected;
        if total == 0 {
            1.0
        } else {
            self.requests_made as f64 / total as f64
        }
    }
}
