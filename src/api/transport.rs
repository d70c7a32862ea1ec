//! HTTP transport for the CRM API
//!
//! [`CrmTransport`] is the seam between the access layer and the network.
//! It only moves bytes: a transport failure is reported as an [`ApiError`]
//! without a status, and interpreting HTTP statuses is left to
//! [`handle_response`] so retry decisions always see a uniform error.

use super::constants::{headers, API_VERSION, USER_AGENT};
use super::error::{ApiError, CrmError, CrmResult};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrmRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

impl CrmRequest {
    /// GET request without a body
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: None,
        }
    }

    /// PUT request with a JSON body
    pub fn put(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Put,
            url: url.into(),
            body: Some(body),
        }
    }
}

/// Status line and unparsed body of a CRM response
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait CrmTransport: Send + Sync {
    async fn send(&self, request: CrmRequest) -> Result<RawResponse, ApiError>;
}

/// reqwest-backed transport carrying the bearer token, version header and
/// user agent on every request
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport sending bearer-authenticated requests with `timeout`
    pub fn new(api_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let mut default_headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .context("API key contains characters not allowed in a header")?;
        auth.set_sensitive(true);
        default_headers.insert(AUTHORIZATION, auth);
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static(headers::CONTENT_TYPE_JSON));
        default_headers.insert(headers::VERSION, HeaderValue::from_static(API_VERSION));

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .default_headers(default_headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { http_client })
    }

    /// Wrap a preconfigured HTTP client
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl CrmTransport for HttpTransport {
    async fn send(&self, request: CrmRequest) -> Result<RawResponse, ApiError> {
        let builder = match request.method {
            Method::Get => self.http_client.get(&request.url),
            Method::Put => self.http_client.put(&request.url),
        };
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::transport(format!("Request to {} failed: {}", request.url, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::transport(format!("Failed to read response body: {}", e)))?;

        Ok(RawResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}

/// Convert a raw response into its JSON body or an [`ApiError`]
///
/// Error details are taken from the CRM's `message` and `code` fields when
/// the error body is JSON; otherwise the status line is used.
pub fn handle_response(response: RawResponse) -> CrmResult<Value> {
    if !response.is_success() {
        let mut message = format!("API request failed: {} {}", response.status, response.reason)
            .trim_end()
            .to_string();
        let mut code = format!("HTTP_{}", response.status);

        if let Ok(error_data) = serde_json::from_str::<Value>(&response.body) {
            if let Some(m) = non_empty_str(&error_data, "message") {
                message = m.to_string();
            }
            if let Some(c) = non_empty_str(&error_data, "code") {
                code = c.to_string();
            }
        }

        return Err(ApiError::new(response.status, code, message).into());
    }

    serde_json::from_str(&response.body).map_err(|e| CrmError::InvalidResponse(e.to_string()))
}

fn non_empty_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}
