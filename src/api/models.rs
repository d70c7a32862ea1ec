//! CRM data models
//!
//! Contacts are kept as raw JSON objects: the CRM returns custom fields in
//! several shapes and only a few top-level properties are read directly.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A contact record as returned by the CRM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Contact(Map<String, Value>);

impl Contact {
    /// Extract a contact from a response body, unwrapping a `{contact: {...}}`
    /// envelope if present. Returns `None` when there is no usable `id`.
    pub fn from_response(body: Value) -> Option<Self> {
        let contact = Self::from_envelope(body)?;
        contact.id()?;
        Some(contact)
    }

    /// Unwrap a `{contact: {...}}` envelope without requiring an `id`
    pub fn from_envelope(body: Value) -> Option<Self> {
        match body {
            Value::Object(mut map) => match map.remove("contact") {
                Some(Value::Object(inner)) => Some(Contact(inner)),
                Some(Value::Null) | None => Some(Contact(map)),
                Some(_) => None,
            },
            _ => None,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.str_property("id")
    }

    pub fn name(&self) -> Option<&str> {
        self.str_property("name")
    }

    pub fn email(&self) -> Option<&str> {
        self.str_property("email")
    }

    /// Name, falling back to email
    pub fn display_name(&self) -> Option<&str> {
        self.name().or_else(|| self.email())
    }

    /// Raw `dateUpdated` value as returned by the CRM
    pub fn date_updated(&self) -> Option<&Value> {
        self.0.get("dateUpdated").filter(|v| !v.is_null())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Convert back into a JSON object
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    fn str_property(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
    }
}

impl From<Map<String, Value>> for Contact {
    fn from(map: Map<String, Value>) -> Self {
        Contact(map)
    }
}

/// One entry of the custom field listing
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub field_key: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Body of the custom field listing response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinitionList {
    #[serde(default)]
    pub custom_fields: Vec<FieldDefinition>,
}

/// Health probe outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub message: String,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// JS-style truthiness rendering of a JSON value as a field value.
///
/// Empty strings, zero, `false` and null count as absent.
pub fn truthy_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_response_shapes() {
        let wrapped = Contact::from_response(json!({"contact": {"id": "c1", "name": "Ada"}})).unwrap();
        assert_eq!(wrapped.id(), Some("c1"));
        assert_eq!(wrapped.display_name(), Some("Ada"));

        let direct = Contact::from_response(json!({"id": "c2", "email": "b@x.io"})).unwrap();
        assert_eq!(direct.id(), Some("c2"));
        assert_eq!(direct.display_name(), Some("b@x.io"));

        assert!(Contact::from_response(json!({"contact": {"name": "no id"}})).is_none());
        assert!(Contact::from_response(json!({})).is_none());
        assert!(Contact::from_response(json!(null)).is_none());
        assert!(Contact::from_response(json!({"id": ""})).is_none());
    }

    #[test]
    fn test_truthy_string() {
        assert_eq!(truthy_string(&json!("7")), Some("7".to_string()));
        assert_eq!(truthy_string(&json!(7)), Some("7".to_string()));
        assert_eq!(truthy_string(&json!("")), None);
        assert_eq!(truthy_string(&json!(0)), None);
        assert_eq!(truthy_string(&json!(null)), None);
        assert_eq!(truthy_string(&json!(false)), None);
    }

    #[test]
    fn test_field_definition_list() {
        let list: FieldDefinitionList = serde_json::from_value(json!({
            "customFields": [
                {"id": "f1", "fieldKey": "contact.pnl_click_count", "name": "Clicks"},
                {"id": "f2"}
            ]
        }))
        .unwrap();

        assert_eq!(list.custom_fields.len(), 2);
        assert_eq!(list.custom_fields[0].field_key.as_deref(), Some("contact.pnl_click_count"));
        assert!(list.custom_fields[1].field_key.is_none());

        let empty: FieldDefinitionList = serde_json::from_value(json!({})).unwrap();
        assert!(empty.custom_fields.is_empty());
    }

    #[test]
    fn test_health_report_serialization() {
        let report = HealthReport {
            status: HealthStatus::Unhealthy,
            status_code: None,
            message: "connection refused".into(),
        };
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({"status": "unhealthy", "message": "connection refused"})
        );
    }
}
