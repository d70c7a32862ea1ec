//! Structured logging with correlation tracking for CRM operations
//!
//! Every CRM operation gets a correlation id; request, retry and completion
//! events are emitted as single-line JSON through the `log` facade.

use super::config::MonitoringConfig;
use crate::api::error::CrmError;
use log::{debug, info, warn};
use serde_json::json;
use std::time::{Duration, Instant};

/// Structured logger for CRM operations
#[derive(Debug, Clone, Default)]
pub struct ApiLogger {
    config: MonitoringConfig,
}

/// Context for a single CRM operation
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub correlation_id: String,
    /// Operation name (get_contact, update_field, ...)
    pub operation: String,
    /// Resource the operation addresses, usually a contact id
    pub resource: String,
    pub start_time: Instant,
}

impl ApiLogger {
    /// Create a new API logger
    pub fn new(config: MonitoringConfig) -> Self {
        Self { config }
    }

    /// Start tracking a new operation under a fresh correlation id
    pub fn start_operation(&self, operation: &str, resource: &str) -> OperationContext {
        let context = OperationContext {
            correlation_id: uuid::Uuid::new_v4().to_string(),
            operation: operation.to_string(),
            resource: resource.to_string(),
            start_time: Instant::now(),
        };

        if self.config.request_logging {
            let log_data = json!({
                "event": "operation_started",
                "correlation_id": context.correlation_id,
                "operation": context.operation,
                "resource": context.resource,
                "timestamp": chrono::Utc::now().to_rfc3339()
            });
            debug!("CRM Operation Started: {}", log_data);
        }

        context
    }

    /// Log an outgoing CRM request
    pub fn log_request(&self, context: &OperationContext, method: &str, url: &str) {
        if !self.config.request_logging {
            return;
        }

        let log_data = json!({
            "event": "http_request",
            "correlation_id": context.correlation_id,
            "operation": context.operation,
            "method": method,
            "url": url,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        info!("Making API request: {}", log_data);
    }

    /// Log a scheduled retry
    pub fn log_retry(&self, context: &OperationContext, attempt: u32, error: &CrmError, delay: Duration) {
        let log_data = json!({
            "event": "retry_attempt",
            "correlation_id": context.correlation_id,
            "operation": context.operation,
            "resource": context.resource,
            "attempt": attempt,
            "status": error.status(),
            "error": error.to_string(),
            "delay_ms": delay.as_millis() as u64,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        warn!("Retry Attempt: {}", log_data);
    }

    /// Log a request denied by the outbound limiter
    pub fn log_rate_limited(&self, context: &OperationContext, wait: Duration) {
        let log_data = json!({
            "event": "rate_limited",
            "correlation_id": context.correlation_id,
            "operation": context.operation,
            "wait_ms": wait.as_millis() as u64,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        warn!("Rate Limit Hit: {}", log_data);
    }

    /// Log the outcome and duration of an operation
    pub fn complete_operation<T>(&self, context: &OperationContext, result: &Result<T, CrmError>) {
        let duration = context.start_time.elapsed();
        let log_data = json!({
            "event": "operation_completed",
            "correlation_id": context.correlation_id,
            "operation": context.operation,
            "resource": context.resource,
            "success": result.is_ok(),
            "error": result.as_ref().err().map(|e| e.to_string()),
            "duration_ms": duration.as_millis() as u64,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        match result {
            Ok(_) if self.config.request_logging => debug!("CRM Operation Completed: {}", log_data),
            Ok(_) => {}
            Err(_) => warn!("CRM Operation Failed: {}", log_data),
        }
    }
}
