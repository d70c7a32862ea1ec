//! HTTP surface for click tracking
//!
//! Thin axum layer over [`CrmClient`]: routing, a per-client inbound rate
//! limit, request logging and CORS. All CRM semantics live in `api`.

pub mod error;
pub mod handlers;
pub mod limiter;

use crate::api::CrmClient;
use crate::config::Config;
use anyhow::Context;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use limiter::InboundLimiter;
use log::{info, warn};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub client: CrmClient,
    pub click_count_field: Arc<str>,
    pub inbound_limiter: InboundLimiter,
    pub started_at: Instant,
}

impl AppState {
    /// Create shared handler state from a client and the loaded config
    pub fn new(client: CrmClient, config: &Config) -> Self {
        Self {
            client,
            click_count_field: Arc::from(config.click_count_field.as_str()),
            inbound_limiter: InboundLimiter::new(config.inbound_rate_limit.clone()),
            started_at: Instant::now(),
        }
    }
}

/// Build the application router with its middleware stack
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/track-click", get(handlers::track_click))
        .route("/contact/:contact_id", get(handlers::get_contact))
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(state.clone(), inbound_rate_limit))
        .layer(middleware::from_fn(log_requests))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let client = CrmClient::from_config(&config)?;
    let state = AppState::new(client, &config);
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Server running on {}", addr);
    info!("Health check: http://localhost:{}/health", config.port);
    info!("Track click: http://localhost:{}/track-click?referrer=CONTACT_ID", config.port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}

fn client_key(connect: &Option<ConnectInfo<SocketAddr>>) -> String {
    connect
        .as_ref()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn inbound_rate_limit(
    State(state): State<AppState>,
    connect: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(&connect);

    if let Err(wait) = state.inbound_limiter.check(&key) {
        warn!("Inbound rate limit exceeded for {}", key);
        let body = json!({
            "error": "Too many requests from this IP, please try again later.",
            "retryAfter": wait.as_secs().max(1)
        });
        return (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    }

    next.run(request).await
}

async fn log_requests(connect: Option<ConnectInfo<SocketAddr>>, request: Request, next: Next) -> Response {
    info!(
        "{} {} - IP: {}",
        request.method(),
        request.uri().path(),
        client_key(&connect)
    );
    next.run(request).await
}
