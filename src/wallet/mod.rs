//! Wallet and chain service collaborator.
//!
//! Transaction construction, signing, address validation and consensus
//! all live in the external wallet node. The gateway reaches it through
//! the [`WalletClient`] trait: fund snapshots, spend submission, block
//! lookups and a live block stream.
//!
//! Two implementations ship with the crate:
//! - [`HttpWalletClient`]: JSON-over-HTTP adapter for a running node.
//! - [`MemoryWallet`]: in-process wallet used by tests and local runs.

pub mod http;
pub mod memory;

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::{BlockEvent, FundId, FundRecord};
use crate::error::WalletError;

pub use http::HttpWalletClient;
pub use memory::MemoryWallet;

/// Live sequence of blocks from the chain service.
///
/// An `Err` item is terminal; the sender stops after yielding it. The
/// stream is not restartable: `None` means it has ended for good.
pub type BlockStream = mpsc::Receiver<Result<BlockEvent, WalletError>>;

/// Operations the gateway needs from the wallet node.
#[async_trait]
pub trait WalletClient: Send + Sync + fmt::Debug {
    /// Returns the wallet's own receive address.
    async fn address(&self) -> Result<String, WalletError>;

    /// Returns a point-in-time snapshot of the wallet's funds.
    async fn list_funds(&self) -> Result<Vec<FundRecord>, WalletError>;

    /// Spends `inputs` to pay `amount` to `destination`.
    ///
    /// Returns the hex transaction id on success.
    async fn submit(
        &self,
        destination: &str,
        amount: u64,
        inputs: &[FundId],
    ) -> Result<String, WalletError>;

    /// Spends all of `inputs` to `destination` (minus fee).
    ///
    /// Returns the hex transaction id on success.
    async fn sweep(&self, destination: &str, inputs: &[FundId]) -> Result<String, WalletError>;

    /// Returns the height of the chain tip.
    async fn best_height(&self) -> Result<u32, WalletError>;

    /// Returns the block at `height`.
    async fn block(&self, height: u32) -> Result<BlockEvent, WalletError>;

    /// Opens a stream of newly connected blocks.
    async fn stream_blocks(&self) -> Result<BlockStream, WalletError>;
}
