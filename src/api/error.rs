//! Error types for CRM access
//!
//! Every failure carries an explicit [`ErrorKind`] decided where it is raised,
//! so the retry executor and the HTTP layer never inspect message text.

use std::time::Duration;
use thiserror::Error;

/// Code used for failures that never produced an HTTP response
pub const TRANSPORT_ERROR_CODE: &str = "TRANSPORT_ERROR";

/// A failed remote call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    /// HTTP status, `None` when the request never got a response
    pub status: Option<u16>,
    /// CRM-provided error code, or `HTTP_<status>`
    pub code: String,
    pub message: String,
}

impl ApiError {
    /// Error for a non-2xx CRM response
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            code: code.into(),
            message: message.into(),
        }
    }

    /// Error for a request that never produced a response
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: TRANSPORT_ERROR_CODE.to_string(),
            message: message.into(),
        }
    }

    pub fn is_auth_error(&self) -> bool {
        self.status == Some(401)
    }
}

/// Discriminant of [`CrmError`] used for routing decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Api,
    RateLimited,
    FieldNotFound,
    InvalidContactId,
    InvalidResponse,
}

#[derive(Debug, Clone, Error)]
pub enum CrmError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Rate limit exceeded. Wait {}ms", wait.as_millis())]
    RateLimited { wait: Duration },

    #[error("Custom field \"{field}\" not found. Available fields: {}", available.join(", "))]
    FieldNotFound { field: String, available: Vec<String> },

    #[error("Invalid contact ID: {0:?}")]
    InvalidContactId(String),

    #[error("Invalid response from CRM: {0}")]
    InvalidResponse(String),
}

impl CrmError {
    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            CrmError::Api(_) => ErrorKind::Api,
            CrmError::RateLimited { .. } => ErrorKind::RateLimited,
            CrmError::FieldNotFound { .. } => ErrorKind::FieldNotFound,
            CrmError::InvalidContactId(_) => ErrorKind::InvalidContactId,
            CrmError::InvalidResponse(_) => ErrorKind::InvalidResponse,
        }
    }

    /// Only remote failures other than authentication are transient
    pub fn should_retry(&self) -> bool {
        match self {
            CrmError::Api(api) => !api.is_auth_error(),
            CrmError::RateLimited { .. } => false,
            CrmError::FieldNotFound { .. } => false,
            CrmError::InvalidContactId(_) => false,
            CrmError::InvalidResponse(_) => false,
        }
    }

    /// HTTP status of a remote failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            CrmError::Api(api) => api.status,
            _ => None,
        }
    }
}

pub type CrmResult<T> = Result<T, CrmError>;
