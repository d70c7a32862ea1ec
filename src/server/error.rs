//! Mapping of CRM errors to HTTP responses

use crate::api::CrmError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use serde_json::{json, Value};

const GENERIC_MESSAGE: &str = "An unexpected error occurred while processing your request";

/// Handler error wrapping a [`CrmError`]
#[derive(Debug)]
pub struct AppError(pub CrmError);

impl From<CrmError> for AppError {
    fn from(err: CrmError) -> Self {
        AppError(err)
    }
}

impl AppError {
    /// HTTP status and JSON body for the wrapped error
    pub fn status_and_body(&self) -> (StatusCode, Value) {
        let err = &self.0;
        match err {
            CrmError::Api(api) => {
                let status = if api.is_auth_error() {
                    StatusCode::UNAUTHORIZED
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                (
                    status,
                    json!({ "error": "API Error", "message": api.message, "code": api.code }),
                )
            }
            CrmError::RateLimited { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({ "error": "Rate limit exceeded", "message": err.to_string() }),
            ),
            CrmError::FieldNotFound { .. } => (
                StatusCode::NOT_FOUND,
                json!({ "error": "Resource not found", "message": err.to_string() }),
            ),
            CrmError::InvalidContactId(_) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid contact ID", "message": err.to_string() }),
            ),
            CrmError::InvalidResponse(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Internal server error", "message": GENERIC_MESSAGE }),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("Error processing request: {}", self.0);
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}
