//! CRM API access layer
//!
//! Typed contact operations on top of a rate-limited, retrying transport
//! with a time-bounded cache of custom field definitions.

pub mod client;
pub mod constants;
pub mod error;
pub mod fields;
pub mod models;
pub mod resilience;
pub mod transport;

pub use client::CrmClient;
pub use error::{ApiError, CrmError, CrmResult, ErrorKind};
pub use fields::{FieldDefinitionCache, FieldMap};
pub use models::{Contact, HealthReport, HealthStatus};
pub use resilience::{ManualClock, RateLimitConfig, RateLimiter, ResilienceConfig, RetryConfig, RetryPolicy};
pub use transport::{CrmRequest, CrmTransport, HttpTransport, Method, RawResponse};
