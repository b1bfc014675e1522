//! Periodic consolidation trigger.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

use super::faucet_service::{ConsolidationReport, FaucetService};

/// Runs [`FaucetService::consolidate`] every `period`, forever.
///
/// The first pass happens one full period after start. Each pass runs in
/// its own task so a slow sweep never delays the next tick; overlapping
/// passes stay disjoint through the shared reservation table.
pub async fn run_consolidation_loop(service: FaucetService, period: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let service = service.clone();
        tokio::spawn(async move {
            match service.consolidate().await {
                Ok(ConsolidationReport::Swept { txid, inputs, .. }) => {
                    tracing::debug!(%txid, inputs = inputs.len(), "consolidation pass done");
                }
                Ok(ConsolidationReport::Skipped) => {}
                Err(e) => tracing::warn!(error = %e, "consolidation pass failed"),
            }
        });
    }
}
