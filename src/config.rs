use crate::api::constants::DEFAULT_BASE_URL;
use crate::api::resilience::{RateLimitConfig, ResilienceConfig};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CLICK_COUNT_FIELD: &str = "pnl_click_count";

/// Process configuration, read from the environment (and `.env`)
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub location_id: String,
    pub base_url: String,
    pub api_timeout: Duration,
    /// Outbound CRM limiter, retry and cache settings
    pub resilience: ResilienceConfig,
    /// Per-client limiter applied to incoming HTTP requests
    pub inbound_rate_limit: RateLimitConfig,
    pub click_count_field: String,
    pub host: String,
    pub port: u16,
}

/// Outcome of [`Config::validate`]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Validation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            location_id: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_timeout: Duration::from_secs(30),
            resilience: ResilienceConfig::default(),
            inbound_rate_limit: RateLimitConfig::new(100, Duration::from_secs(15 * 60)),
            click_count_field: DEFAULT_CLICK_COUNT_FIELD.to_string(),
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Config {
    /// Load `.env` (or `env_file`) if present, then read the environment
    pub fn load(env_file: Option<&Path>) -> Result<Self> {
        match env_file {
            Some(path) => {
                dotenvy::from_path(path)
                    .with_context(|| format!("Failed to load env file: {:?}", path))?;
                debug!("Loaded environment from {:?}", path);
            }
            None => {
                if let Ok(path) = dotenvy::dotenv() {
                    debug!("Loaded environment from {:?}", path);
                }
            }
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let mut resilience = ResilienceConfig::builder()
            .max_retries(parse_or(&var, "MAX_RETRIES", defaults.resilience.retry.max_attempts)?)
            .base_retry_delay(millis_or(&var, "BASE_RETRY_DELAY_MS", defaults.resilience.retry.base_delay)?)
            .field_cache_ttl(millis_or(
                &var,
                "FIELD_CACHE_DURATION_MS",
                defaults.resilience.cache.field_definitions_ttl,
            )?)
            .build();
        resilience.rate_limit = RateLimitConfig::new(
            parse_or(&var, "CRM_RATE_LIMIT_MAX_REQUESTS", defaults.resilience.rate_limit.max_requests)?,
            millis_or(&var, "CRM_RATE_LIMIT_WINDOW_MS", defaults.resilience.rate_limit.window)?,
        );

        let config = Self {
            api_key: var("GHL_API_KEY").unwrap_or_default(),
            location_id: var("GHL_LOCATION_ID").unwrap_or_default(),
            base_url: var("GHL_BASE_URL").unwrap_or(defaults.base_url),
            api_timeout: millis_or(&var, "API_TIMEOUT_MS", defaults.api_timeout)?,
            resilience,
            inbound_rate_limit: RateLimitConfig::new(
                parse_or(&var, "RATE_LIMIT_MAX_REQUESTS", defaults.inbound_rate_limit.max_requests)?,
                millis_or(&var, "RATE_LIMIT_WINDOW_MS", defaults.inbound_rate_limit.window)?,
            ),
            click_count_field: var("CLICK_COUNT_FIELD").unwrap_or(defaults.click_count_field),
            host: var("HOST").unwrap_or(defaults.host),
            port: parse_or(&var, "PORT", defaults.port)?,
        };

        debug!("Loaded config for CRM at {}", config.base_url);
        Ok(config)
    }

    /// Check required settings, collecting errors and warnings
    pub fn validate(&self) -> Validation {
        let mut validation = Validation::default();

        if self.api_key.is_empty() {
            validation
                .errors
                .push("GHL_API_KEY environment variable is required".to_string());
        }
        if self.location_id.is_empty() {
            validation.warnings.push(
                "GHL_LOCATION_ID environment variable is recommended for custom field lookups".to_string(),
            );
        }
        if self.resilience.rate_limit.max_requests == 0 {
            validation
                .errors
                .push("CRM_RATE_LIMIT_MAX_REQUESTS must be greater than zero".to_string());
        }

        validation
    }

    /// Validate, logging warnings, and fail on errors
    pub fn ensure_valid(&self) -> Result<()> {
        let validation = self.validate();

        for warning in &validation.warnings {
            warn!("Configuration warning: {}", warning);
        }
        if !validation.is_valid() {
            anyhow::bail!("Invalid configuration: {}", validation.errors.join("; "));
        }

        info!("Configuration validated successfully");
        Ok(())
    }
}

fn parse_or<T, V>(var: &V, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    V: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

fn millis_or<V>(var: &V, key: &str, default: Duration) -> Result<Duration>
where
    V: Fn(&str) -> Option<String>,
{
    let default_ms = default.as_millis() as u64;
    parse_or(var, key, default_ms).map(Duration::from_millis)
}
