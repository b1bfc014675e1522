//! System endpoints: health check and public client configuration.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
    subscribers: usize,
}

/// `GET /health`: Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health, version, timestamp and the number of live block subscribers.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Broadcast hub stopped", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let (status, label, subscribers) = match state.hub.connection_count().await {
        Ok(n) => (StatusCode::OK, "healthy", n),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "degraded", 0),
    };
    (
        status,
        Json(HealthResponse {
            status: label.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            subscribers,
        }),
    )
}

/// Settings a browser client needs to talk to the faucet.
#[derive(Debug, Serialize, ToSchema)]
struct ClientConfigResponse {
    address: String,
    http_url: String,
    ws_url: String,
    payout_amount: u64,
}

/// `GET /config`: Public client configuration.
#[utoipa::path(
    get,
    path = "/config",
    tag = "System",
    summary = "Client configuration",
    description = "Returns the faucet's own address, the payout amount and the public HTTP/WebSocket base URLs.",
    responses(
        (status = 200, description = "Client configuration", body = ClientConfigResponse),
    )
)]
pub async fn config_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(ClientConfigResponse {
            address: state.faucet.address().to_string(),
            http_url: state.urls.http_url.clone(),
            ws_url: state.urls.ws_url.clone(),
            payout_amount: state.faucet.payout_amount(),
        }),
    )
}

/// System routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config", get(config_handler))
}
