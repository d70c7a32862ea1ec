//! Integration tests for the resilience stack
//!
//! Exercises the retry policy, sliding window limiter, field cache and
//! structured logger through the public API.

use click_tracker::api::resilience::{ApiLogger, MonitoringConfig};
use click_tracker::api::{
    ApiError, CrmError, FieldDefinitionCache, ManualClock, RateLimitConfig, RateLimiter, ResilienceConfig,
    RetryConfig, RetryPolicy,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Collects warn-and-above log lines emitted anywhere in this test binary
struct CapturingLogger;

static CAPTURED: Mutex<Vec<String>> = Mutex::new(Vec::new());
static LOGGER: CapturingLogger = CapturingLogger;

impl log::Log for CapturingLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Warn
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            CAPTURED
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(record.args().to_string());
        }
    }

    fn flush(&self) {}
}

fn captured_lines_containing(needle: &str) -> usize {
    CAPTURED
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .filter(|line| line.contains(needle))
        .count()
}

/// Test that ResilienceConfig can be built with all components
#[test]
fn test_resilience_config_integration() {
    let config = ResilienceConfig::builder()
        .max_retries(4)
        .base_retry_delay(Duration::from_millis(250))
        .rate_limit(50, Duration::from_secs(30))
        .field_cache_ttl(Duration::from_secs(120))
        .request_logging(true)
        .build();

    assert_eq!(config.retry.max_attempts, 4);
    assert_eq!(config.retry.base_delay, Duration::from_millis(250));
    assert_eq!(config.retry.max_jitter, Duration::from_millis(1000));
    assert_eq!(config.rate_limit.max_requests, 50);
    assert_eq!(config.rate_limit.window, Duration::from_secs(30));
    assert_eq!(config.cache.field_definitions_ttl, Duration::from_secs(120));
    assert!(config.monitoring.request_logging);
}

/// Admissions never exceed capacity, and wait time falls to zero as the window passes
#[test]
fn test_rate_limiting_integration() {
    let clock = Arc::new(ManualClock::new(0));
    let limiter = RateLimiter::with_clock(RateLimitConfig::new(3, Duration::from_millis(1_000)), clock.clone());

    for _ in 0..3 {
        assert!(limiter.can_make_request());
    }
    assert!(!limiter.can_make_request());
    assert_eq!(limiter.remaining_requests(), 0);

    let mut previous = limiter.wait_time();
    assert!(previous > Duration::ZERO && previous <= Duration::from_millis(1_000));

    for _ in 0..12 {
        clock.advance(Duration::from_millis(100));
        let wait = limiter.wait_time();
        assert!(wait <= previous);
        previous = wait;
    }
    assert_eq!(previous, Duration::ZERO);
    assert!(limiter.can_make_request());

    let stats = limiter.stats();
    assert_eq!(stats.requests_made, 4);
    assert_eq!(stats.requests_rejected, 1);
}

/// Cloned limiters share one window
#[test]
fn test_rate_limiter_clones_share_state() {
    let limiter = RateLimiter::new(RateLimitConfig::new(2, Duration::from_secs(60)));
    let other = limiter.clone();

    assert!(limiter.can_make_request());
    assert!(other.can_make_request());
    assert!(!limiter.can_make_request());
}

/// Backoff elapsed time is the sum of the exponential steps plus bounded jitter
#[tokio::test(start_paused = true)]
async fn test_retry_backoff_timing() {
    let policy = RetryPolicy::new(
        ResilienceConfig::builder()
            .max_retries(4)
            .base_retry_delay(Duration::from_millis(1000))
            .build()
            .retry,
    );
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();
    let started = tokio::time::Instant::now();

    let value = policy
        .execute(|| {
            let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if attempt < 4 {
                    Err(CrmError::from(ApiError::transport("connection reset")))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await
        .unwrap();

    assert_eq!(value, 4);
    let elapsed = started.elapsed();
    // 1000 + 2000 + 4000, plus [0, 1000) jitter per wait
    assert!(elapsed >= Duration::from_millis(7000), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(10_000), "elapsed {:?}", elapsed);
}

/// A cache miss racing another miss both fetch; the later store wins
#[tokio::test]
async fn test_concurrent_cache_refresh_last_writer_wins() {
    use click_tracker::api::models::{FieldDefinition, FieldDefinitionList};

    let clock = Arc::new(ManualClock::new(0));
    let cache = FieldDefinitionCache::with_clock(Duration::from_secs(300), clock);
    let listing = |id: &str, key: &str| FieldDefinitionList {
        custom_fields: vec![FieldDefinition {
            id: Some(id.to_string()),
            field_key: Some(key.to_string()),
            name: None,
        }],
    };

    let (slow_tx, slow_rx) = tokio::sync::oneshot::channel::<()>();
    let first_listing = listing("f1", "first");
    let second_listing = listing("f2", "second");

    let slow = cache.get_or_refresh(|| async move {
        slow_rx.await.ok();
        Ok(second_listing)
    });
    let fast = async {
        let fields = cache.get_or_refresh(|| async move { Ok(first_listing) }).await;
        slow_tx.send(()).ok();
        fields
    };

    let (second, first) = tokio::join!(slow, fast);
    assert_eq!(first.unwrap()["f1"], "first");
    assert_eq!(second.unwrap()["f2"], "second");

    let cached = cache.fresh().unwrap();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached["f2"], "second");
}

/// Test structured logging with correlation tracking
#[test]
fn test_logging_integration() {
    let logger = ApiLogger::new(MonitoringConfig { request_logging: true });

    let context = logger.start_operation("update_field", "C1");
    assert_eq!(context.operation, "update_field");
    assert_eq!(context.resource, "C1");

    logger.log_request(&context, "PUT", "https://crm.test/v1/contacts/C1");
    logger.log_retry(
        &context,
        1,
        &CrmError::from(ApiError::new(503, "HTTP_503", "unavailable")),
        Duration::from_millis(1500),
    );
    logger.log_rate_limited(&context, Duration::from_millis(200));
    logger.complete_operation::<()>(&context, &Err(CrmError::RateLimited { wait: Duration::from_millis(200) }));
}

/// A retry produces exactly one warning, whether or not a hook reports it
#[tokio::test(start_paused = true)]
async fn test_each_retry_is_logged_once() {
    log::set_logger(&LOGGER).ok();
    log::set_max_level(log::LevelFilter::Warn);

    let policy = RetryPolicy::new(RetryConfig {
        max_attempts: 3,
        base_delay: Duration::from_millis(10),
        max_jitter: Duration::ZERO,
    });
    let fail_twice = |marker: &'static str| {
        let attempts = Arc::new(AtomicU32::new(0));
        move || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if attempt < 3 {
                    Err(CrmError::from(ApiError::transport(marker)))
                } else {
                    Ok(())
                }
            }
        }
    };

    let logger = ApiLogger::new(MonitoringConfig { request_logging: true });
    let context = logger.start_operation("get_contact", "C1");
    policy
        .execute_with(fail_twice("socket closed by peer 7d21"), |attempt, error, delay| {
            logger.log_retry(&context, attempt, error, delay)
        })
        .await
        .unwrap();
    assert_eq!(captured_lines_containing("socket closed by peer 7d21"), 2);

    policy.execute(fail_twice("socket closed by peer 9e04")).await.unwrap();
    assert_eq!(captured_lines_containing("socket closed by peer 9e04"), 2);
}
