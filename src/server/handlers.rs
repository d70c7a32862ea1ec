use super::error::AppError;
use super::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use log::info;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct TrackClickParams {
    pub referrer: Option<String>,
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn contact_not_found(contact_id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Contact not found",
            "message": format!("No contact found with ID: {}", contact_id)
        })),
    )
        .into_response()
}

/// `GET /track-click?referrer=<contact id>`: read, increment and write back
/// the contact's click counter
pub async fn track_click(
    State(state): State<AppState>,
    Query(params): Query<TrackClickParams>,
) -> Result<Response, AppError> {
    let Some(referrer) = params.referrer.filter(|r| !r.trim().is_empty()) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Missing required parameter: referrer",
                "message": "Please provide a referrer parameter with the contact ID"
            })),
        )
            .into_response());
    };

    info!("Processing click tracking for contact ID: {}", referrer);

    let Some(contact) = state.client.get_contact_by_id(&referrer).await? else {
        return Ok(contact_not_found(&referrer));
    };
    let contact_id = contact.id().unwrap_or(&referrer).to_string();

    let field = &*state.click_count_field;
    let previous_count = state.client.get_custom_field_value(&contact, field).await?;
    let new_count = parse_count(&previous_count).saturating_add(1);
    info!("Updating click count from {} to {}", previous_count, new_count);

    state
        .client
        .update_contact_custom_field(&contact_id, field, &new_count.to_string())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Click count updated successfully",
        "data": {
            "contactId": contact_id,
            "contactName": contact.display_name(),
            "referrer": referrer,
            "previousCount": previous_count,
            "newCount": new_count,
            "timestamp": timestamp()
        }
    }))
    .into_response())
}

/// `GET /contact/:contact_id`: contact summary with its current click count
pub async fn get_contact(
    State(state): State<AppState>,
    Path(contact_id): Path<String>,
) -> Result<Response, AppError> {
    let Some(contact) = state.client.get_contact_by_id(&contact_id).await? else {
        return Ok(contact_not_found(&contact_id));
    };

    let click_count = state
        .client
        .get_custom_field_value(&contact, &state.click_count_field)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "contactId": contact.id(),
            "name": contact.name(),
            "email": contact.email(),
            "clickCount": click_count,
            "lastUpdated": contact.date_updated()
        }
    }))
    .into_response())
}

/// `GET /health`: service liveness plus a CRM connectivity probe
pub async fn health(State(state): State<AppState>) -> Response {
    let crm = state.client.check_api_health().await;
    let limiter = state.client.rate_limiter();
    let reset_at = chrono::DateTime::from_timestamp_millis(limiter.reset_time())
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Millis, true);

    Json(json!({
        "status": "ok",
        "timestamp": timestamp(),
        "crm": crm,
        "uptime": state.started_at.elapsed().as_secs_f64(),
        "rateLimit": {
            "remaining": limiter.remaining_requests(),
            "resetAt": reset_at
        }
    }))
    .into_response()
}

/// Fallback for unknown routes
pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not found",
            "message": "The requested endpoint does not exist"
        })),
    )
        .into_response()
}

/// Leading-integer parse of a stored counter: surrounding whitespace and
/// trailing garbage are ignored, anything without leading digits counts as 0.
/// Out-of-range values saturate.
pub fn parse_count(raw: &str) -> i64 {
    let trimmed = raw.trim();
    let (sign, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());

    let magnitude = digits[..end]
        .bytes()
        .fold(0i64, |n, digit| n.saturating_mul(10).saturating_add(i64::from(digit - b'0')));

    sign * magnitude
}
