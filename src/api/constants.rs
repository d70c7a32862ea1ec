//! API constants for the CRM REST API

/// Default CRM API root
pub const DEFAULT_BASE_URL: &str = "https://rest.gohighlevel.com/v1";

/// Value of the required `Version` header
pub const API_VERSION: &str = "2021-07-28";

pub const USER_AGENT: &str = "GHL-Click-Tracker/1.0";

/// Namespace prefix the CRM puts on contact custom field keys
pub const CONTACT_FIELD_PREFIX: &str = "contact.";

/// Standard headers for CRM requests
pub mod headers {
    pub const VERSION: &str = "Version";

    pub const CONTENT_TYPE_JSON: &str = "application/json";
}

/// Build contact record endpoint URL, encoding the id as a single path segment
pub fn contact_endpoint(base_url: &str, contact_id: &str) -> String {
    format!(
        "{}/contacts/{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(contact_id)
    )
}

/// Whether `contact_id` can address a contact record
///
/// Dot segments survive percent-encoding and would be resolved away by the
/// URL parser, so they are rejected along with the empty id.
pub fn is_valid_contact_id(contact_id: &str) -> bool {
    !matches!(contact_id, "" | "." | "..")
}

/// Build custom field listing endpoint URL
pub fn custom_fields_endpoint(base_url: &str, location_id: &str) -> String {
    format!(
        "{}/custom-fields/?locationId={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(location_id)
    )
}

/// Build location listing endpoint URL (used as a health probe)
pub fn locations_endpoint(base_url: &str) -> String {
    format!("{}/locations/", base_url.trim_end_matches('/'))
}
