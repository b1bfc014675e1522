//! Service layer: business logic orchestration.
//!
//! [`FaucetService`] coordinates payouts and consolidation between the
//! wallet and the [`super::domain::ReservationManager`]. The background
//! loops feed blocks into the [`super::domain::Hub`] and trigger
//! periodic consolidation.

pub mod faucet_service;
pub mod ingest;
pub mod maintenance;

pub use faucet_service::{ConsolidationReport, FaucetService, PayoutReceipt};
pub use ingest::run_block_ingestion;
pub use maintenance::run_consolidation_loop;
