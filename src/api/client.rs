use super::constants;
use super::error::{CrmError, CrmResult};
use super::fields::{field_id_for, field_names, FieldDefinitionCache, FieldMap};
use super::models::{truthy_string, Contact, FieldDefinitionList, HealthReport, HealthStatus};
use super::resilience::clock::system_clock;
use super::resilience::{ApiLogger, OperationContext, RateLimiter, ResilienceConfig, RetryPolicy, SharedClock};
use super::transport::{handle_response, CrmRequest, CrmTransport, HttpTransport};
use crate::config::Config;
use log::{debug, info};
use serde_json::{json, Value};
use std::sync::Arc;

/// Value reported for a custom field the contact does not carry
pub const DEFAULT_FIELD_VALUE: &str = "0";

/// Rate-limited, retrying client for the CRM contact API
///
/// Every call except the health probe passes through the shared
/// [`RateLimiter`]; contact reads and writes are additionally wrapped by the
/// [`RetryPolicy`]. Clones share the limiter and the field cache.
#[derive(Clone)]
pub struct CrmClient {
    base_url: String,
    location_id: String,
    transport: Arc<dyn CrmTransport>,
    retry_policy: RetryPolicy,
    rate_limiter: RateLimiter,
    field_cache: FieldDefinitionCache,
    api_logger: ApiLogger,
}

impl CrmClient {
    /// Create a client using the system clock
    pub fn new(
        base_url: impl Into<String>,
        location_id: impl Into<String>,
        transport: Arc<dyn CrmTransport>,
        resilience: &ResilienceConfig,
    ) -> Self {
        Self::with_clock(base_url, location_id, transport, resilience, system_clock())
    }

    /// Create a client whose limiter and field cache read time from `clock`
    pub fn with_clock(
        base_url: impl Into<String>,
        location_id: impl Into<String>,
        transport: Arc<dyn CrmTransport>,
        resilience: &ResilienceConfig,
        clock: SharedClock,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            location_id: location_id.into(),
            transport,
            retry_policy: RetryPolicy::new(resilience.retry.clone()),
            rate_limiter: RateLimiter::with_clock(resilience.rate_limit.clone(), clock.clone()),
            field_cache: FieldDefinitionCache::with_clock(resilience.cache.field_definitions_ttl, clock),
            api_logger: ApiLogger::new(resilience.monitoring.clone()),
        }
    }

    /// Build a client talking HTTP to the configured CRM
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let transport = HttpTransport::new(&config.api_key, config.api_timeout)?;
        Ok(Self::new(
            config.base_url.clone(),
            config.location_id.clone(),
            Arc::new(transport),
            &config.resilience,
        ))
    }

    /// Limiter shared by every rate-limited CRM call of this client
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Field definition cache shared by clones of this client
    pub fn field_cache(&self) -> &FieldDefinitionCache {
        &self.field_cache
    }

    /// Fetch a contact; `Ok(None)` when the response carries no contact id
    pub async fn get_contact_by_id(&self, contact_id: &str) -> CrmResult<Option<Contact>> {
        let url = self.contact_url(contact_id)?;
        let context = self.api_logger.start_operation("get_contact", contact_id);
        let request = CrmRequest::get(url);

        let result = self.execute_with_retry(&context, request).await;
        self.api_logger.complete_operation(&context, &result);

        let contact = Contact::from_response(result?);
        match &contact {
            Some(contact) => info!(
                "Retrieved contact: {} - {}",
                contact.id().unwrap_or_default(),
                contact.display_name().unwrap_or_default()
            ),
            None => info!("No contact found for ID: {}", contact_id),
        }

        Ok(contact)
    }

    /// Resolve a custom field's value on an already fetched contact
    ///
    /// Looks at the `customField` id/value list first (matching ids through
    /// the field definitions), then a flat `customFields` object, then a
    /// top-level property of the same name. Falls back to `"0"`.
    pub async fn get_custom_field_value(&self, contact: &Contact, field_name: &str) -> CrmResult<String> {
        let fields = self.get_custom_field_definitions().await?;
        Ok(resolve_field_value(contact, &fields, field_name))
    }

    /// Write a single custom field and return the updated contact
    pub async fn update_contact_custom_field(
        &self,
        contact_id: &str,
        field_name: &str,
        value: &str,
    ) -> CrmResult<Contact> {
        let url = self.contact_url(contact_id)?;
        let fields = self.get_custom_field_definitions().await?;
        let field_id = field_id_for(&fields, field_name).ok_or_else(|| CrmError::FieldNotFound {
            field: field_name.to_string(),
            available: field_names(&fields),
        })?;

        let context = self.api_logger.start_operation("update_field", contact_id);
        let body = json!({
            "customField": [
                { "id": field_id, "value": value }
            ]
        });
        info!("Updating contact {} field {} to: {}", contact_id, field_name, value);

        let request = CrmRequest::put(url, body);
        let result = self.execute_with_retry(&context, request).await;
        self.api_logger.complete_operation(&context, &result);

        Contact::from_envelope(result?)
            .ok_or_else(|| CrmError::InvalidResponse("update response is not a JSON object".to_string()))
    }

    /// Field id -> normalized key mapping, served from the cache when fresh
    pub async fn get_custom_field_definitions(&self) -> CrmResult<Arc<FieldMap>> {
        self.field_cache
            .get_or_refresh(|| async {
                let context = self.api_logger.start_operation("list_custom_fields", &self.location_id);
                let request = CrmRequest::get(constants::custom_fields_endpoint(&self.base_url, &self.location_id));

                let result = self.execute(&context, request).await.and_then(|body| {
                    serde_json::from_value::<FieldDefinitionList>(body)
                        .map_err(|e| CrmError::InvalidResponse(e.to_string()))
                });
                self.api_logger.complete_operation(&context, &result);
                result
            })
            .await
    }

    /// Probe the CRM without going through the limiter or retries
    pub async fn check_api_health(&self) -> HealthReport {
        let request = CrmRequest::get(constants::locations_endpoint(&self.base_url));

        match self.transport.send(request).await {
            Ok(response) if response.is_success() => HealthReport {
                status: HealthStatus::Healthy,
                status_code: Some(response.status),
                message: "API connection successful".to_string(),
            },
            Ok(response) => HealthReport {
                status: HealthStatus::Unhealthy,
                status_code: Some(response.status),
                message: "API connection failed".to_string(),
            },
            Err(error) => HealthReport {
                status: HealthStatus::Unhealthy,
                status_code: None,
                message: error.message,
            },
        }
    }

    async fn execute_with_retry(&self, context: &OperationContext, request: CrmRequest) -> CrmResult<Value> {
        self.retry_policy
            .execute_with(
                || self.execute(context, request.clone()),
                |attempt, error, delay| self.api_logger.log_retry(context, attempt, error, delay),
            )
            .await
    }

    /// Single attempt: rate limiter gate, transport, status handling
    fn contact_url(&self, contact_id: &str) -> CrmResult<String> {
        if !constants::is_valid_contact_id(contact_id) {
            return Err(CrmError::InvalidContactId(contact_id.to_string()));
        }
        Ok(constants::contact_endpoint(&self.base_url, contact_id))
    }

    async fn execute(&self, context: &OperationContext, request: CrmRequest) -> CrmResult<Value> {
        if !self.rate_limiter.can_make_request() {
            let wait = self.rate_limiter.wait_time();
            self.api_logger.log_rate_limited(context, wait);
            return Err(CrmError::RateLimited { wait });
        }

        self.api_logger.log_request(context, request.method.as_str(), &request.url);
        let response = self.transport.send(request).await?;
        debug!("CRM responded {} {}", response.status, response.reason);

        handle_response(response)
    }
}

/// Resolution order for a field value on a contact, see
/// [`CrmClient::get_custom_field_value`]
pub fn resolve_field_value(contact: &Contact, fields: &FieldMap, field_name: &str) -> String {
    if let Some(Value::Array(entries)) = contact.get("customField") {
        let matched = entries.iter().find(|entry| {
            entry
                .get("id")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
                .and_then(|id| fields.get(id))
                .is_some_and(|key| key == field_name)
        });

        if let Some(entry) = matched {
            let value = ["value", "field_value", "fieldValue"]
                .iter()
                .find_map(|key| entry.get(*key).and_then(truthy_string))
                .unwrap_or_else(|| DEFAULT_FIELD_VALUE.to_string());
            debug!("Found custom field {}: {}", field_name, value);
            return value;
        }
    }

    if let Some(value) = contact
        .get("customFields")
        .and_then(|flat| flat.get(field_name))
        .and_then(truthy_string)
    {
        return value;
    }

    if let Some(value) = contact.get(field_name).and_then(truthy_string) {
        return value;
    }

    debug!("Custom field {} not found, defaulting to {}", field_name, DEFAULT_FIELD_VALUE);
    DEFAULT_FIELD_VALUE.to_string()
}
