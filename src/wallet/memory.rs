//! In-process wallet.
//!
//! Holds a fund list and a chain of blocks in memory. Spends remove their
//! inputs from the fund list, sweeps replace them with one merged fund,
//! and [`MemoryWallet::push_block`] feeds every open block stream.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use super::{BlockStream, WalletClient};
use crate::domain::{BlockEvent, FundId, FundRecord};
use crate::error::WalletError;

const STREAM_BUFFER: usize = 64;

/// A spend accepted by a [`MemoryWallet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendRecord {
    /// Transaction id handed back to the caller.
    pub txid: String,
    /// Destination address.
    pub destination: String,
    /// Amount paid, or `None` for a sweep.
    pub amount: Option<u64>,
    /// Funds consumed.
    pub inputs: Vec<FundId>,
}

#[derive(Debug, Default)]
struct State {
    funds: Vec<FundRecord>,
    blocks: Vec<BlockEvent>,
    spends: Vec<SpendRecord>,
    reject_spends: bool,
    streams: Vec<mpsc::Sender<Result<BlockEvent, WalletError>>>,
}

/// Wallet kept entirely in memory.
///
/// Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct MemoryWallet {
    address: String,
    state: Arc<Mutex<State>>,
}

impl MemoryWallet {
    /// Creates a wallet receiving at `address` and holding `funds`.
    #[must_use]
    pub fn new(address: impl Into<String>, funds: Vec<FundRecord>) -> Self {
        Self {
            address: address.into(),
            state: Arc::new(Mutex::new(State {
                funds,
                ..State::default()
            })),
        }
    }

    /// Replaces the fund list.
    pub async fn set_funds(&self, funds: Vec<FundRecord>) {
        self.state.lock().await.funds = funds;
    }

    /// Makes every subsequent spend and sweep fail with
    /// [`WalletError::Rejected`] while `reject` is set.
    pub async fn reject_spends(&self, reject: bool) {
        self.state.lock().await.reject_spends = reject;
    }

    /// Returns all accepted spends, oldest first.
    pub async fn spends(&self) -> Vec<SpendRecord> {
        self.state.lock().await.spends.clone()
    }

    /// Appends a block to the chain and pushes it to every open stream.
    pub async fn push_block(&self, block: BlockEvent) {
        let streams = {
            let mut state = self.state.lock().await;
            state.blocks.push(block.clone());
            state.streams.retain(|tx| !tx.is_closed());
            state.streams.clone()
        };
        for tx in streams {
            let _ = tx.send(Ok(block.clone())).await;
        }
    }

    /// Terminates every open block stream with `error`.
    pub async fn fail_streams(&self, error: WalletError) {
        let streams = std::mem::take(&mut self.state.lock().await.streams);
        for tx in streams {
            let _ = tx.send(Err(error.clone())).await;
        }
    }

    /// Returns the number of block streams still open.
    pub async fn open_streams(&self) -> usize {
        let mut state = self.state.lock().await;
        state.streams.retain(|tx| !tx.is_closed());
        state.streams.len()
    }

    /// Closes every open block stream.
    pub async fn close_streams(&self) {
        self.state.lock().await.streams.clear();
    }

    fn take_inputs(state: &mut State, inputs: &[FundId]) -> Result<u64, WalletError> {
        if state.reject_spends {
            return Err(WalletError::Rejected("spends disabled".to_string()));
        }
        if inputs.is_empty() {
            return Err(WalletError::Rejected("no inputs".to_string()));
        }
        let mut total = 0u64;
        for id in inputs {
            let Some(fund) = state.funds.iter().find(|f| &f.id == id) else {
                return Err(WalletError::Rejected(format!("unknown input {id}")));
            };
            total = total.saturating_add(fund.amount);
        }
        state.funds.retain(|f| !inputs.contains(&f.id));
        Ok(total)
    }
}

fn new_txid() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[async_trait]
impl WalletClient for MemoryWallet {
    async fn address(&self) -> Result<String, WalletError> {
        Ok(self.address.clone())
    }

    async fn list_funds(&self) -> Result<Vec<FundRecord>, WalletError> {
        Ok(self.state.lock().await.funds.clone())
    }

    async fn submit(
        &self,
        destination: &str,
        amount: u64,
        inputs: &[FundId],
    ) -> Result<String, WalletError> {
        let mut state = self.state.lock().await;
        let available = state
            .funds
            .iter()
            .filter(|f| inputs.contains(&f.id))
            .fold(0u64, |acc, f| acc.saturating_add(f.amount));
        if available < amount {
            return Err(WalletError::Rejected(format!(
                "inputs cover {available}, need {amount}"
            )));
        }
        let total = Self::take_inputs(&mut state, inputs)?;
        let change = total.saturating_sub(amount);
        if change > 0 {
            state
                .funds
                .push(FundRecord::new(new_txid().into_bytes(), change, false));
        }
        let txid = new_txid();
        state.spends.push(SpendRecord {
            txid: txid.clone(),
            destination: destination.to_string(),
            amount: Some(amount),
            inputs: inputs.to_vec(),
        });
        Ok(txid)
    }

    async fn sweep(&self, destination: &str, inputs: &[FundId]) -> Result<String, WalletError> {
        let mut state = self.state.lock().await;
        let total = Self::take_inputs(&mut state, inputs)?;
        if destination == self.address {
            state
                .funds
                .push(FundRecord::new(new_txid().into_bytes(), total, false));
        }
        let txid = new_txid();
        state.spends.push(SpendRecord {
            txid: txid.clone(),
            destination: destination.to_string(),
            amount: None,
            inputs: inputs.to_vec(),
        });
        Ok(txid)
    }

    async fn best_height(&self) -> Result<u32, WalletError> {
        let state = self.state.lock().await;
        state
            .blocks
            .last()
            .map(|b| b.height)
            .ok_or_else(|| WalletError::Unavailable("empty chain".to_string()))
    }

    async fn block(&self, height: u32) -> Result<BlockEvent, WalletError> {
        let state = self.state.lock().await;
        state
            .blocks
            .iter()
            .find(|b| b.height == height)
            .cloned()
            .ok_or(WalletError::BlockNotFound(height))
    }

    async fn stream_blocks(&self) -> Result<BlockStream, WalletError> {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        self.state.lock().await.streams.push(tx);
        Ok(rx)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn wallet() -> MemoryWallet {
        MemoryWallet::new(
            "faucet",
            vec![
                FundRecord::new(vec![1], 150, false),
                FundRecord::new(vec![2], 20, false),
            ],
        )
    }

    #[tokio::test]
    async fn submit_consumes_inputs_and_returns_change() {
        let wallet = wallet();
        let Ok(_txid) = wallet.submit("alice", 100, &[FundId::from_bytes(vec![1])]).await else {
            panic!("spend accepted");
        };
        let Ok(funds) = wallet.list_funds().await else {
            panic!("funds listed");
        };
        assert_eq!(funds.len(), 2);
        assert!(funds.iter().all(|f| f.id != FundId::from_bytes(vec![1])));
        assert!(funds.iter().any(|f| f.amount == 50));
        assert_eq!(wallet.spends().await.len(), 1);
    }

    #[tokio::test]
    async fn submit_rejects_short_inputs() {
        let wallet = wallet();
        let result = wallet.submit("alice", 100, &[FundId::from_bytes(vec![2])]).await;
        assert!(matches!(result, Err(WalletError::Rejected(_))));
        assert!(wallet.spends().await.is_empty());
    }

    #[tokio::test]
    async fn sweep_to_self_merges_funds() {
        let wallet = wallet();
        let inputs = [FundId::from_bytes(vec![1]), FundId::from_bytes(vec![2])];
        assert!(wallet.sweep("faucet", &inputs).await.is_ok());
        let Ok(funds) = wallet.list_funds().await else {
            panic!("funds listed");
        };
        assert_eq!(funds.len(), 1);
        assert_eq!(funds.first().map(|f| f.amount), Some(170));
    }

    #[tokio::test]
    async fn pushed_blocks_reach_open_streams() {
        let wallet = wallet();
        let Ok(mut stream) = wallet.stream_blocks().await else {
            panic!("stream opened");
        };
        let block = BlockEvent {
            block_id: vec![9],
            height: 1,
            producer_id: "p".to_string(),
            txids: Vec::new(),
        };
        wallet.push_block(block.clone()).await;
        assert_eq!(stream.recv().await, Some(Ok(block)));
        assert_eq!(wallet.best_height().await, Ok(1));

        wallet.close_streams().await;
        assert_eq!(stream.recv().await, None);
    }
}
