//! Block ingestion: forwards every new block to the broadcast hub.

use std::sync::Arc;

use bytes::Bytes;

use crate::domain::{BlockData, BlockEvent, Hub};
use crate::error::FaucetError;
use crate::wallet::WalletClient;

/// Serializes a block into the pretty-printed JSON payload pushed to
/// subscribers.
///
/// # Errors
///
/// Returns [`FaucetError::Internal`] if serialization fails.
pub fn encode_block(event: &BlockEvent) -> Result<Bytes, FaucetError> {
    serde_json::to_vec_pretty(&BlockData::from(event))
        .map(Bytes::from)
        .map_err(|e| FaucetError::Internal(e.to_string()))
}

/// Streams blocks from the wallet into `hub` until the stream ends.
///
/// The stream is not restarted. Returns `Ok(())` when the wallet closes
/// it cleanly.
///
/// # Errors
///
/// - [`FaucetError::Wallet`] if the stream cannot be opened or yields an
///   error.
/// - [`FaucetError::HubClosed`] if the hub has stopped.
pub async fn run_block_ingestion(
    wallet: Arc<dyn WalletClient>,
    hub: Hub,
) -> Result<(), FaucetError> {
    let mut stream = wallet.stream_blocks().await?;
    tracing::info!("block ingestion started");

    while let Some(item) = stream.recv().await {
        let block = item?;
        let payload = encode_block(&block)?;
        hub.broadcast(payload).await?;
        tracing::debug!(height = block.height, txs = block.txids.len(), "block broadcast");
    }

    tracing::warn!("block stream ended");
    Ok(())
}
