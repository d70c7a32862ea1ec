//! Per-client inbound rate limiting
//!
//! One sliding window limiter per client key (the peer IP). The table of
//! clients is bounded: it is cleared whenever a full window has passed since
//! the last reset, and when a new client arrives at capacity.

use crate::api::resilience::clock::{system_clock, SharedClock};
use crate::api::resilience::{RateLimitConfig, RateLimiter};
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Default bound on the number of tracked clients
pub const DEFAULT_MAX_CLIENTS: usize = 10_000;

#[derive(Debug, Clone)]
pub struct InboundLimiter {
    config: RateLimitConfig,
    clock: SharedClock,
    max_clients: usize,
    state: Arc<Mutex<ClientTable>>,
}

#[derive(Debug)]
struct ClientTable {
    limiters: HashMap<String, RateLimiter>,
    /// Epoch millis of the last full reset
    reset_at: i64,
}

impl ClientTable {
    fn reset(&mut self, now: i64) {
        self.limiters.clear();
        self.reset_at = now;
    }
}

impl InboundLimiter {
    /// Create an inbound limiter applying `config` to each client
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, system_clock())
    }

    /// Create an inbound limiter reading time from `clock`
    pub fn with_clock(config: RateLimitConfig, clock: SharedClock) -> Self {
        Self::with_capacity(config, clock, DEFAULT_MAX_CLIENTS)
    }

    /// Create an inbound limiter tracking at most `max_clients` clients
    pub fn with_capacity(config: RateLimitConfig, clock: SharedClock, max_clients: usize) -> Self {
        let reset_at = clock.now_millis();
        Self {
            config,
            clock,
            max_clients: max_clients.max(1),
            state: Arc::new(Mutex::new(ClientTable {
                limiters: HashMap::new(),
                reset_at,
            })),
        }
    }

    /// Admit a request from `key`, or return how long it should wait
    pub fn check(&self, key: &str) -> Result<(), Duration> {
        let now = self.clock.now_millis();
        let mut table = self.lock();

        if now - table.reset_at >= self.config.window.as_millis() as i64 {
            debug!("Resetting inbound limiter table ({} clients)", table.limiters.len());
            table.reset(now);
        }

        if !table.limiters.contains_key(key) && table.limiters.len() >= self.max_clients {
            warn!(
                "Inbound limiter tracking {} clients, resetting table",
                table.limiters.len()
            );
            table.reset(now);
        }

        let limiter = table
            .limiters
            .entry(key.to_string())
            .or_insert_with(|| RateLimiter::with_clock(self.config.clone(), self.clock.clone()));

        if limiter.can_make_request() {
            Ok(())
        } else {
            Err(limiter.wait_time())
        }
    }

    /// Number of clients currently holding a limiter
    pub fn tracked_clients(&self) -> usize {
        self.lock().limiters.len()
    }

    fn lock(&self) -> MutexGuard<'_, ClientTable> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
