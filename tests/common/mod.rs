//! In-memory CRM used by the integration tests
//!
//! Implements `CrmTransport` over a map of contacts and a list of custom
//! field definitions, records every request, and can be told to fail the
//! next N calls.

#![allow(dead_code)]

use async_trait::async_trait;
use click_tracker::api::resilience::SharedClock;
use click_tracker::api::{ApiError, CrmClient, CrmRequest, CrmTransport, ManualClock, Method, RawResponse, ResilienceConfig};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BASE_URL: &str = "https://crm.test/v1";
pub const LOCATION_ID: &str = "loc-1";

#[derive(Default)]
pub struct FakeCrm {
    contacts: Mutex<HashMap<String, Value>>,
    fields: Mutex<Vec<Value>>,
    requests: Mutex<Vec<CrmRequest>>,
    failures: Mutex<VecDeque<Result<RawResponse, ApiError>>>,
}

impl FakeCrm {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_contact(&self, contact: Value) {
        let id = contact["id"].as_str().expect("contact needs an id").to_string();
        self.contacts.lock().unwrap().insert(id, contact);
    }

    pub fn contact(&self, id: &str) -> Option<Value> {
        self.contacts.lock().unwrap().get(id).cloned()
    }

    pub fn add_field(&self, id: &str, field_key: &str) {
        self.fields
            .lock()
            .unwrap()
            .push(json!({ "id": id, "fieldKey": field_key, "name": field_key }));
    }

    pub fn clear_fields(&self) {
        self.fields.lock().unwrap().clear();
    }

    /// Make the next call answer with `status` and a CRM error body
    pub fn fail_next(&self, status: u16, code: &str, message: &str) {
        self.failures.lock().unwrap().push_back(Ok(RawResponse {
            status,
            reason: String::new(),
            body: json!({ "code": code, "message": message }).to_string(),
        }));
    }

    /// Make the next call fail before any response arrives
    pub fn fail_transport_next(&self, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .push_back(Err(ApiError::transport(message)));
    }

    pub fn requests(&self) -> Vec<CrmRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method, path_fragment: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.url.contains(path_fragment))
            .count()
    }

    fn ok(body: Value) -> Result<RawResponse, ApiError> {
        Ok(RawResponse {
            status: 200,
            reason: "OK".to_string(),
            body: body.to_string(),
        })
    }

    fn apply_update(contact: &mut Value, update: &Value) {
        let updates = update["customField"].as_array().cloned().unwrap_or_default();
        let entries = contact
            .as_object_mut()
            .unwrap()
            .entry("customField")
            .or_insert_with(|| json!([]))
            .as_array_mut()
            .unwrap();

        for change in updates {
            match entries.iter_mut().find(|e| e["id"] == change["id"]) {
                Some(existing) => existing["value"] = change["value"].clone(),
                None => entries.push(change),
            }
        }
    }
}

#[async_trait]
impl CrmTransport for FakeCrm {
    async fn send(&self, request: CrmRequest) -> Result<RawResponse, ApiError> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(failure) = self.failures.lock().unwrap().pop_front() {
            return failure;
        }

        let path = request.url.strip_prefix(BASE_URL).unwrap_or(&request.url);

        if path.starts_with("/locations/") {
            return Self::ok(json!({ "locations": [] }));
        }
        if path.starts_with("/custom-fields/") {
            let fields = self.fields.lock().unwrap().clone();
            return Self::ok(json!({ "customFields": fields }));
        }
        if let Some(id) = path.strip_prefix("/contacts/") {
            let mut contacts = self.contacts.lock().unwrap();
            return match (request.method, contacts.get_mut(id)) {
                (Method::Get, Some(contact)) => Self::ok(json!({ "contact": contact })),
                (Method::Get, None) => Self::ok(json!({})),
                (Method::Put, Some(contact)) => {
                    Self::apply_update(contact, request.body.as_ref().unwrap_or(&Value::Null));
                    Self::ok(json!({ "contact": contact }))
                }
                (Method::Put, None) => Ok(RawResponse {
                    status: 400,
                    reason: "Bad Request".to_string(),
                    body: json!({ "message": "Contact not found" }).to_string(),
                }),
            };
        }

        Ok(RawResponse {
            status: 404,
            reason: "Not Found".to_string(),
            body: String::new(),
        })
    }
}

/// Resilience settings with short, jitter-free delays
pub fn test_resilience() -> ResilienceConfig {
    ResilienceConfig::builder()
        .max_retries(3)
        .base_retry_delay(Duration::from_millis(100))
        .max_jitter(Duration::ZERO)
        .request_logging(false)
        .build()
}

pub fn client_with(crm: &Arc<FakeCrm>, resilience: &ResilienceConfig) -> (CrmClient, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let shared: SharedClock = clock.clone();
    let client = CrmClient::with_clock(BASE_URL, LOCATION_ID, crm.clone(), resilience, shared);
    (client, clock)
}

pub fn client(crm: &Arc<FakeCrm>) -> (CrmClient, Arc<ManualClock>) {
    client_with(crm, &test_resilience())
}

/// CRM with contact C1 (no click count yet) and the click count field defined
pub fn seeded_crm() -> Arc<FakeCrm> {
    let crm = FakeCrm::new();
    crm.add_field("f1", "contact.pnl_click_count");
    crm.add_field("f2", "contact.source");
    crm.add_contact(json!({
        "id": "C1",
        "name": "Ada Lovelace",
        "email": "ada@example.com",
        "dateUpdated": "2024-05-01T10:00:00.000Z",
        "customField": [{ "id": "f2", "value": "newsletter" }]
    }));
    crm
}
