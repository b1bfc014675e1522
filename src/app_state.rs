//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::Hub;
use crate::service::FaucetService;

/// Per-connection WebSocket settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WsSettings {
    /// Depth of each subscriber's outbound queue.
    pub queue_depth: usize,
    /// Re-broadcast text frames received from subscribers.
    pub echo: bool,
}

/// Public URLs advertised to browser clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicUrls {
    /// Base URL for HTTP requests.
    pub http_url: String,
    /// Base URL for WebSocket subscriptions.
    pub ws_url: String,
}

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Faucet service for all business logic.
    pub faucet: Arc<FaucetService>,
    /// Broadcast hub for WebSocket subscribers.
    pub hub: Hub,
    /// WebSocket connection settings.
    pub ws: WsSettings,
    /// Advertised public URLs.
    pub urls: Arc<PublicUrls>,
}
