//! faucet-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints, the
//! block ingestion task and the consolidation loop.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use faucet_gateway::api;
use faucet_gateway::app_state::{AppState, PublicUrls, WsSettings};
use faucet_gateway::config::FaucetConfig;
use faucet_gateway::domain::{Hub, ReservationManager};
use faucet_gateway::service::{FaucetService, run_block_ingestion, run_consolidation_loop};
use faucet_gateway::wallet::{HttpWalletClient, WalletClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = FaucetConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    tracing::info!(addr = %config.listen_addr, wallet = %config.wallet_rpc_url, "starting faucet-gateway");

    // Connect to the wallet node
    let wallet: Arc<dyn WalletClient> = Arc::new(
        HttpWalletClient::new(&config.wallet_rpc_url, config.wallet_poll_interval())
            .context("building wallet client")?,
    );
    let address = wallet
        .address()
        .await
        .context("fetching faucet address from wallet")?;
    tracing::info!(%address, "faucet address");

    // Build domain layer
    let hub = Hub::spawn(config.hub_inbox_capacity);
    let reservations = ReservationManager::new(config.reservation_policy());

    // Build service layer
    let faucet = FaucetService::new(Arc::clone(&wallet), reservations, address);

    // Background tasks
    tokio::spawn({
        let hub = hub.clone();
        async move {
            match run_block_ingestion(wallet, hub).await {
                Ok(()) => tracing::info!("block ingestion finished"),
                Err(e) => tracing::error!(error = %e, "block ingestion stopped"),
            }
        }
    });
    tokio::spawn(run_consolidation_loop(
        faucet.clone(),
        config.consolidation_interval(),
    ));

    // Build application state
    let app_state = AppState {
        faucet: Arc::new(faucet),
        hub,
        ws: WsSettings {
            queue_depth: config.hub_queue_depth,
            echo: config.ws_echo_enabled,
        },
        urls: Arc::new(PublicUrls {
            http_url: config.http_url(),
            ws_url: config.ws_url(),
        }),
    };

    let app = api::build_app(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
