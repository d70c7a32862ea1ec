//! Production resilience features
//!
//! Provides the sliding window rate limiter, retry policy, injectable clock
//! and structured logging used for every CRM interaction.

pub mod clock;
pub mod config;
pub mod logging;
pub mod rate_limiter;
pub mod retry;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::{CacheConfig, MonitoringConfig, RateLimitConfig, ResilienceConfig, ResilienceConfigBuilder, RetryConfig};
pub use logging::{ApiLogger, OperationContext};
pub use rate_limiter::{RateLimiter, RateLimiterStats};
pub use retry::RetryPolicy;
