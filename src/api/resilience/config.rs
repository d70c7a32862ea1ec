//! Resilience configuration with builder pattern
//!
//! Groups the retry, rate limiting, field cache and logging settings used by
//! the CRM client, with defaults matching the CRM's published limits.

use std::time::Duration;

/// Global resilience configuration for CRM operations
#[derive(Debug, Clone, Default)]
pub struct ResilienceConfig {
    pub retry: RetryConfig,
    pub rate_limit: RateLimitConfig,
    pub cache: CacheConfig,
    pub monitoring: MonitoringConfig,
}

/// Retry executor configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Upper bound (exclusive) of the uniform jitter added to each delay
    pub max_jitter: Duration,
}

/// Sliding window limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window: Duration,
}

/// Field definition cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub field_definitions_ttl: Duration,
}

/// Structured logging configuration
#[derive(Debug, Clone)]
pub struct MonitoringConfig {
    pub request_logging: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_jitter: Duration::from_millis(1000),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100, // CRM allows 100 requests per minute
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    /// Allow `max_requests` per trailing `window`
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            field_definitions_ttl: Duration::from_secs(5 * 60),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            request_logging: true,
        }
    }
}

impl ResilienceConfig {
    /// Create a builder starting from the defaults
    pub fn builder() -> ResilienceConfigBuilder {
        ResilienceConfigBuilder::new()
    }

    /// Single attempt, no delays and no logging (for tests)
    pub fn disabled() -> Self {
        Self {
            retry: RetryConfig {
                max_attempts: 1,
                base_delay: Duration::ZERO,
                max_jitter: Duration::ZERO,
            },
            rate_limit: RateLimitConfig {
                max_requests: usize::MAX,
                window: Duration::from_secs(60),
            },
            cache: CacheConfig::default(),
            monitoring: MonitoringConfig {
                request_logging: false,
            },
        }
    }
}

/// Builder for ResilienceConfig
#[derive(Debug, Default)]
pub struct ResilienceConfigBuilder {
    config: ResilienceConfig,
}

impl ResilienceConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ResilienceConfig::default(),
        }
    }

    /// Set maximum attempts per call
    pub fn max_retries(mut self, attempts: u32) -> Self {
        self.config.retry.max_attempts = attempts;
        self
    }

    /// Set base delay for exponential backoff
    pub fn base_retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry.base_delay = delay;
        self
    }

    /// Set upper bound of the random jitter
    pub fn max_jitter(mut self, jitter: Duration) -> Self {
        self.config.retry.max_jitter = jitter;
        self
    }

    /// Set outbound rate limiting
    pub fn rate_limit(mut self, max_requests: usize, window: Duration) -> Self {
        self.config.rate_limit = RateLimitConfig::new(max_requests, window);
        self
    }

    /// Set field definition cache lifetime
    pub fn field_cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache.field_definitions_ttl = ttl;
        self
    }

    /// Enable or disable request logging
    pub fn request_logging(mut self, enabled: bool) -> Self {
        self.config.monitoring.request_logging = enabled;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> ResilienceConfig {
        self.config
    }
}
