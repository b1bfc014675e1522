//! # faucet-gateway
//!
//! Testnet faucet with a live block feed.
//!
//! The gateway pays a fixed amount to any address that asks for it,
//! periodically merges small wallet funds into one, and streams every new
//! block to WebSocket subscribers. The wallet itself lives in an external
//! node; this service only coordinates access to it.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── FaucetService, ingestion, consolidation loop (service/)
//!     ├── Hub, ReservationManager (domain/)
//!     │
//!     └── WalletClient (wallet/) ──► wallet node
//! ```
//!
//! Two pieces of shared state sit at the center. The [`domain::Hub`] is an
//! actor owning the subscriber registry; slow subscribers are dropped
//! rather than allowed to stall delivery. The
//! [`domain::ReservationManager`] hands out wallet funds so that no two
//! concurrent spends pick the same fund, and releases them automatically
//! when a lock runs out.

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod wallet;
pub mod ws;
