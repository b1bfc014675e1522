//! Faucet service: payouts, consolidation sweeps and block history.

use std::sync::Arc;

use crate::domain::{
    BlockData, ConsolidationOutcome, FundId, ReservationManager, ReservedSet,
};
use crate::error::{FaucetError, WalletError};
use crate::wallet::WalletClient;

/// Maximum number of blocks returned by [`FaucetService::recent_blocks`].
pub const RECENT_BLOCKS_LIMIT: usize = 10;

/// Outcome of a successful payout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutReceipt {
    /// Transaction id reported by the wallet.
    pub txid: String,
    /// Amount paid.
    pub amount: u64,
    /// Funds spent.
    pub inputs: Vec<FundId>,
}

/// Outcome of a consolidation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsolidationReport {
    /// Funds were swept back to the faucet's own address.
    Swept {
        /// Transaction id reported by the wallet.
        txid: String,
        /// Funds merged.
        inputs: Vec<FundId>,
        /// Sum of the merged amounts.
        total: u64,
    },
    /// Nothing eligible this cycle.
    Skipped,
}

/// Orchestration layer for faucet operations.
///
/// Every spend follows the same pattern: snapshot funds → reserve under
/// the table lock → call the wallet with the lock released → release
/// early on failure, otherwise leave the reservation to its timer.
#[derive(Debug, Clone)]
pub struct FaucetService {
    wallet: Arc<dyn WalletClient>,
    reservations: ReservationManager,
    address: String,
}

impl FaucetService {
    /// Creates a new `FaucetService`.
    ///
    /// `address` is the faucet's own receive address, the destination of
    /// consolidation sweeps.
    #[must_use]
    pub fn new(
        wallet: Arc<dyn WalletClient>,
        reservations: ReservationManager,
        address: String,
    ) -> Self {
        Self {
            wallet,
            reservations,
            address,
        }
    }

    /// Returns the faucet's receive address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the amount paid per request.
    #[must_use]
    pub fn payout_amount(&self) -> u64 {
        self.reservations.policy().payout_amount
    }

    /// Returns a reference to the inner [`ReservationManager`].
    #[must_use]
    pub fn reservations(&self) -> &ReservationManager {
        &self.reservations
    }

    /// Pays the configured amount to `destination`.
    ///
    /// The spent funds stay reserved until their lock expires, since the
    /// wallet may keep listing them until the spend confirms.
    ///
    /// # Errors
    ///
    /// - [`FaucetError::InvalidRequest`] for an empty address.
    /// - [`FaucetError::Wallet`] if the fund snapshot fails.
    /// - [`FaucetError::InsufficientFunds`] if the faucet cannot cover it.
    /// - [`FaucetError::SubmitFailed`] if the wallet rejects the spend; the
    ///   reserved funds are released first.
    pub async fn request_payout(&self, destination: &str) -> Result<PayoutReceipt, FaucetError> {
        let destination = destination.trim();
        if destination.is_empty() {
            return Err(FaucetError::InvalidRequest(
                "payment address is required".to_string(),
            ));
        }

        let amount = self.payout_amount();
        let funds = self.wallet.list_funds().await?;
        let set = self.reservations.select_for_payout(&funds, amount).await?;

        match self.wallet.submit(destination, amount, set.funds()).await {
            Ok(txid) => {
                tracing::info!(%txid, destination, amount, inputs = set.funds().len(), "payout sent");
                Ok(PayoutReceipt {
                    txid,
                    amount,
                    inputs: set.into_funds(),
                })
            }
            Err(e) => Err(self.abandon(&set, e, "payout").await),
        }
    }

    /// Merges small funds into one, using a large fund to pay the fee.
    ///
    /// # Errors
    ///
    /// - [`FaucetError::Wallet`] if the fund snapshot fails.
    /// - [`FaucetError::SubmitFailed`] if the sweep is rejected; the
    ///   reserved funds are released first.
    pub async fn consolidate(&self) -> Result<ConsolidationReport, FaucetError> {
        let funds = self.wallet.list_funds().await?;
        let set = match self.reservations.select_for_consolidation(&funds).await {
            ConsolidationOutcome::Selected(set) => set,
            ConsolidationOutcome::Skipped => {
                tracing::debug!("nothing to consolidate");
                return Ok(ConsolidationReport::Skipped);
            }
        };

        match self.wallet.sweep(&self.address, set.funds()).await {
            Ok(txid) => {
                tracing::info!(%txid, inputs = set.funds().len(), total = set.total(), "funds consolidated");
                let total = set.total();
                Ok(ConsolidationReport::Swept {
                    txid,
                    inputs: set.into_funds(),
                    total,
                })
            }
            Err(e) => Err(self.abandon(&set, e, "consolidation").await),
        }
    }

    /// Returns up to [`RECENT_BLOCKS_LIMIT`] blocks walking down from
    /// `from_height`.
    ///
    /// `0` yields nothing; a negative height starts at the chain tip.
    /// The walk stops after the genesis block.
    ///
    /// # Errors
    ///
    /// - [`FaucetError::InvalidRequest`] if the height exceeds `u32`.
    /// - [`FaucetError::BlockNotFound`] if the start height is past the tip.
    /// - [`FaucetError::Wallet`] on any other wallet failure.
    pub async fn recent_blocks(&self, from_height: i64) -> Result<Vec<BlockData>, FaucetError> {
        if from_height == 0 {
            return Ok(Vec::new());
        }
        let mut height = if from_height < 0 {
            self.wallet.best_height().await?
        } else {
            u32::try_from(from_height).map_err(|_| {
                FaucetError::InvalidRequest(format!("height {from_height} out of range"))
            })?
        };

        let mut blocks = Vec::with_capacity(RECENT_BLOCKS_LIMIT);
        while blocks.len() < RECENT_BLOCKS_LIMIT {
            let block = self.wallet.block(height).await.map_err(|e| match e {
                WalletError::BlockNotFound(h) => FaucetError::BlockNotFound(h),
                other => FaucetError::Wallet(other),
            })?;
            blocks.push(BlockData::from(&block));
            let Some(next) = height.checked_sub(1) else {
                break;
            };
            height = next;
        }
        Ok(blocks)
    }

    async fn abandon(&self, set: &ReservedSet, error: WalletError, kind: &str) -> FaucetError {
        tracing::warn!(error = %error, lease = %set.lease(), kind, "spend failed, releasing funds");
        self.reservations.release_set(set).await;
        FaucetError::SubmitFailed(error)
    }
}
