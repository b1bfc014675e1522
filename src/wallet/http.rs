//! JSON-over-HTTP wallet client.
//!
//! Talks to the wallet node's REST bridge:
//!
//! | Call                | Request                                   |
//! |---------------------|-------------------------------------------|
//! | address             | `GET  /wallet/address`                    |
//! | list funds          | `GET  /wallet/utxos`                      |
//! | submit              | `POST /wallet/spend`                      |
//! | sweep               | `POST /wallet/sweep`                      |
//! | best height         | `GET  /blockchain/info`                   |
//! | block               | `GET  /blockchain/blocks/{height}`        |
//!
//! The block stream is built by polling the chain tip.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::{BlockStream, WalletClient};
use crate::domain::{BlockEvent, FundId, FundRecord};
use crate::error::WalletError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const STREAM_BUFFER: usize = 64;

#[derive(Debug, Deserialize)]
struct AddressResponse {
    address: String,
}

#[derive(Debug, Deserialize)]
struct ChainInfoResponse {
    best_height: u32,
}

#[derive(Debug, Deserialize)]
struct TransactionResponse {
    transaction_id: String,
}

#[derive(Debug, Serialize)]
struct SpendRequest<'a> {
    to_address: &'a str,
    amount: u64,
    input_commitments: &'a [FundId],
}

#[derive(Debug, Serialize)]
struct SweepRequest<'a> {
    to_address: &'a str,
    input_commitments: &'a [FundId],
}

/// Wallet client for a node exposing the JSON bridge.
#[derive(Debug, Clone)]
pub struct HttpWalletClient {
    client: reqwest::Client,
    base_url: String,
    poll_interval: Duration,
}

impl HttpWalletClient {
    /// Creates a client for the node at `base_url`, polling for new
    /// blocks every `poll_interval`.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::Unavailable`] if the HTTP client cannot be
    /// built.
    pub fn new(base_url: &str, poll_interval: Duration) -> Result<Self, WalletError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| WalletError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            poll_interval,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, WalletError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| WalletError::Unavailable(e.to_string()))?;
        decode(response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, WalletError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| WalletError::Unavailable(e.to_string()))?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, WalletError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| WalletError::Decode(e.to_string()));
    }
    let body = response.text().await.unwrap_or_default();
    let detail = format!("{status}: {}", body.trim());
    if status.is_client_error() {
        Err(WalletError::Rejected(detail))
    } else {
        Err(WalletError::Unavailable(detail))
    }
}

#[async_trait]
impl WalletClient for HttpWalletClient {
    async fn address(&self) -> Result<String, WalletError> {
        let resp: AddressResponse = self.get_json("/wallet/address").await?;
        Ok(resp.address)
    }

    async fn list_funds(&self) -> Result<Vec<FundRecord>, WalletError> {
        self.get_json("/wallet/utxos").await
    }

    async fn submit(
        &self,
        destination: &str,
        amount: u64,
        inputs: &[FundId],
    ) -> Result<String, WalletError> {
        let body = SpendRequest {
            to_address: destination,
            amount,
            input_commitments: inputs,
        };
        let resp: TransactionResponse = self.post_json("/wallet/spend", &body).await?;
        Ok(resp.transaction_id)
    }

    async fn sweep(&self, destination: &str, inputs: &[FundId]) -> Result<String, WalletError> {
        let body = SweepRequest {
            to_address: destination,
            input_commitments: inputs,
        };
        let resp: TransactionResponse = self.post_json("/wallet/sweep", &body).await?;
        Ok(resp.transaction_id)
    }

    async fn best_height(&self) -> Result<u32, WalletError> {
        let resp: ChainInfoResponse = self.get_json("/blockchain/info").await?;
        Ok(resp.best_height)
    }

    async fn block(&self, height: u32) -> Result<BlockEvent, WalletError> {
        let response = self
            .client
            .get(self.url(&format!("/blockchain/blocks/{height}")))
            .send()
            .await
            .map_err(|e| WalletError::Unavailable(e.to_string()))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(WalletError::BlockNotFound(height));
        }
        decode(response).await
    }

    async fn stream_blocks(&self) -> Result<BlockStream, WalletError> {
        let mut last = self.best_height().await?;
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let wallet = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(wallet.poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    return;
                }
                let tip = match wallet.best_height().await {
                    Ok(tip) => tip,
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                };
                while last < tip {
                    let next = last.saturating_add(1);
                    let item = wallet.block(next).await;
                    let failed = item.is_err();
                    if tx.send(item).await.is_err() || failed {
                        return;
                    }
                    last = next;
                }
            }
        });

        Ok(rx)
    }
}
