//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Unset or unparsable values fall back
//! to the defaults in [`FaucetConfig::default`].

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;

use crate::domain::hub::{DEFAULT_INBOX_CAPACITY, DEFAULT_QUEUE_DEPTH};
use crate::domain::reservation::{
    DEFAULT_CONSOLIDATION_LOCK, DEFAULT_CONSOLIDATION_MAX_SMALL, DEFAULT_PAYOUT_AMOUNT,
    DEFAULT_PAYOUT_LOCK,
};
use crate::domain::ReservationPolicy;

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`FaucetConfig::from_env`].
#[derive(Debug, Clone)]
pub struct FaucetConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:8080`).
    pub listen_addr: SocketAddr,

    /// Base URL of the wallet node's JSON bridge.
    pub wallet_rpc_url: String,

    /// Milliseconds between chain tip polls for the block stream.
    pub wallet_poll_interval_ms: u64,

    /// Public host name. `None` runs in development mode with
    /// `localhost` URLs.
    pub public_host: Option<String>,

    /// Depth of each WebSocket subscriber's outbound queue.
    pub hub_queue_depth: usize,

    /// Capacity of the broadcast hub's request inbox.
    pub hub_inbox_capacity: usize,

    /// Re-broadcast text frames received from subscribers.
    pub ws_echo_enabled: bool,

    /// Amount paid per faucet request, in base units.
    pub payout_amount: u64,

    /// Seconds a payout reservation lives if never released.
    pub payout_lock_secs: u64,

    /// Seconds a consolidation reservation lives if never released.
    pub consolidation_lock_secs: u64,

    /// Seconds between consolidation passes.
    pub consolidation_interval_secs: u64,

    /// Maximum small funds merged per consolidation pass.
    pub consolidation_max_small: usize,

    /// Emit logs as JSON lines instead of human-readable text.
    pub log_json: bool,
}

impl Default for FaucetConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            wallet_rpc_url: "http://127.0.0.1:5001".to_string(),
            wallet_poll_interval_ms: 2_000,
            public_host: None,
            hub_queue_depth: DEFAULT_QUEUE_DEPTH,
            hub_inbox_capacity: DEFAULT_INBOX_CAPACITY,
            ws_echo_enabled: false,
            payout_amount: DEFAULT_PAYOUT_AMOUNT,
            payout_lock_secs: DEFAULT_PAYOUT_LOCK.as_secs(),
            consolidation_lock_secs: DEFAULT_CONSOLIDATION_LOCK.as_secs(),
            consolidation_interval_secs: 30 * 60,
            consolidation_max_small: DEFAULT_CONSOLIDATION_MAX_SMALL,
            log_json: false,
        }
    }
}

impl FaucetConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr =
            parse_listen_addr(std::env::var("LISTEN_ADDR").ok(), defaults.listen_addr)?;

        let public_host = std::env::var("PUBLIC_HOST")
            .ok()
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty());

        Ok(Self {
            listen_addr,
            wallet_rpc_url: std::env::var("WALLET_RPC_URL").unwrap_or(defaults.wallet_rpc_url),
            wallet_poll_interval_ms: parse_env(
                "WALLET_POLL_INTERVAL_MS",
                defaults.wallet_poll_interval_ms,
            ),
            public_host,
            hub_queue_depth: parse_env("HUB_QUEUE_DEPTH", defaults.hub_queue_depth),
            hub_inbox_capacity: parse_env("HUB_INBOX_CAPACITY", defaults.hub_inbox_capacity),
            ws_echo_enabled: parse_env_bool("WS_ECHO_ENABLED", defaults.ws_echo_enabled),
            payout_amount: parse_env("PAYOUT_AMOUNT", defaults.payout_amount),
            payout_lock_secs: parse_env("PAYOUT_LOCK_SECS", defaults.payout_lock_secs),
            consolidation_lock_secs: parse_env(
                "CONSOLIDATION_LOCK_SECS",
                defaults.consolidation_lock_secs,
            ),
            consolidation_interval_secs: parse_env(
                "CONSOLIDATION_INTERVAL_SECS",
                defaults.consolidation_interval_secs,
            ),
            consolidation_max_small: parse_env(
                "CONSOLIDATION_MAX_SMALL",
                defaults.consolidation_max_small,
            ),
            log_json: parse_env_bool("LOG_JSON", defaults.log_json),
        })
    }

    /// Builds the fund selection policy.
    #[must_use]
    pub fn reservation_policy(&self) -> ReservationPolicy {
        ReservationPolicy {
            payout_amount: self.payout_amount,
            payout_lock: Duration::from_secs(self.payout_lock_secs),
            consolidation_lock: Duration::from_secs(self.consolidation_lock_secs),
            consolidation_max_small: self.consolidation_max_small,
        }
    }

    /// Interval between consolidation passes.
    #[must_use]
    pub fn consolidation_interval(&self) -> Duration {
        Duration::from_secs(self.consolidation_interval_secs.max(1))
    }

    /// Interval between chain tip polls.
    #[must_use]
    pub fn wallet_poll_interval(&self) -> Duration {
        Duration::from_millis(self.wallet_poll_interval_ms.max(1))
    }

    /// Public base URL for HTTP requests.
    #[must_use]
    pub fn http_url(&self) -> String {
        match &self.public_host {
            Some(host) => format!("https://{host}"),
            None => format!("http://localhost:{}", self.listen_addr.port()),
        }
    }

    /// Public base URL for WebSocket subscriptions.
    #[must_use]
    pub fn ws_url(&self) -> String {
        match &self.public_host {
            Some(host) => format!("wss://{host}"),
            None => format!("ws://localhost:{}", self.listen_addr.port()),
        }
    }
}

/// Parses `LISTEN_ADDR`. Unset means `default`; a malformed value is a
/// startup error.
fn parse_listen_addr(raw: Option<String>, default: SocketAddr) -> anyhow::Result<SocketAddr> {
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid LISTEN_ADDR {raw:?}")),
        None => Ok(default),
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key)
        .ok()
        .map(|v| v.to_ascii_lowercase())
        .as_deref()
    {
        Some("true" | "1") => true,
        Some("false" | "0") => false,
        _ => default,
    }
}
