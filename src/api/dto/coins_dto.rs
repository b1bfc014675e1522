//! Faucet payout DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::service::PayoutReceipt;

/// Request body for `POST /getcoins`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CoinsRequest {
    /// Payment address to receive the coins.
    pub addr: String,
}

/// Response body for `POST /getcoins`.
#[derive(Debug, Serialize, ToSchema)]
pub struct CoinsResponse {
    /// Hex transaction id of the payout.
    pub txid: String,
    /// Amount paid, in base units.
    pub amount: u64,
    /// Number of wallet funds spent.
    pub inputs: usize,
}

impl From<PayoutReceipt> for CoinsResponse {
    fn from(receipt: PayoutReceipt) -> Self {
        Self {
            txid: receipt.txid,
            amount: receipt.amount,
            inputs: receipt.inputs.len(),
        }
    }
}
