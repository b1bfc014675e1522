//! Timed reservation of wallet funds.
//!
//! [`ReservationManager`] keeps a table of fund identities that are
//! currently claimed by an in-flight payout or consolidation spend. A
//! selection pass reads the table, decides, and marks its picks while
//! holding a single lock, so two concurrent passes can never claim the
//! same fund. The lock is never held across wallet I/O.
//!
//! Every successful selection is tagged with a [`LeaseId`] and schedules
//! an automatic release after the policy delay. Timed and lease-scoped
//! releases only clear entries still owned by their lease, so a late
//! timer is a no-op for a fund that has since been re-reserved.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use super::fund::{FundId, FundRecord};
use crate::error::FaucetError;

/// Default payout per request, in base units.
pub const DEFAULT_PAYOUT_AMOUNT: u64 = 100_000_000;

/// Default lifetime of a payout reservation.
pub const DEFAULT_PAYOUT_LOCK: Duration = Duration::from_secs(10 * 60);

/// Default lifetime of a consolidation reservation.
pub const DEFAULT_CONSOLIDATION_LOCK: Duration = Duration::from_secs(20 * 60);

/// Default cap on small funds merged by one consolidation pass.
pub const DEFAULT_CONSOLIDATION_MAX_SMALL: usize = 5;

/// Selection thresholds and lock lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationPolicy {
    /// Amount paid out per request. Also the "large fund" threshold for
    /// consolidation; half of it is the dust floor for payouts.
    pub payout_amount: u64,
    /// How long a payout selection stays reserved if never released.
    pub payout_lock: Duration,
    /// How long a consolidation selection stays reserved if never released.
    pub consolidation_lock: Duration,
    /// Maximum number of small funds picked by one consolidation pass.
    pub consolidation_max_small: usize,
}

impl Default for ReservationPolicy {
    fn default() -> Self {
        Self {
            payout_amount: DEFAULT_PAYOUT_AMOUNT,
            payout_lock: DEFAULT_PAYOUT_LOCK,
            consolidation_lock: DEFAULT_CONSOLIDATION_LOCK,
            consolidation_max_small: DEFAULT_CONSOLIDATION_MAX_SMALL,
        }
    }
}

/// Identifies one successful selection pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeaseId(uuid::Uuid);

impl LeaseId {
    fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for LeaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Funds claimed by one selection pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedSet {
    lease: LeaseId,
    funds: Vec<FundId>,
    total: u64,
}

impl ReservedSet {
    /// Lease that owns these reservations.
    #[must_use]
    pub const fn lease(&self) -> LeaseId {
        self.lease
    }

    /// Selected identities, in candidate order.
    #[must_use]
    pub fn funds(&self) -> &[FundId] {
        &self.funds
    }

    /// Sum of the selected amounts.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Consumes the set, returning the selected identities.
    #[must_use]
    pub fn into_funds(self) -> Vec<FundId> {
        self.funds
    }
}

/// Result of a consolidation selection pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsolidationOutcome {
    /// A large fund plus at least one small fund were reserved.
    Selected(ReservedSet),
    /// Nothing worth merging this cycle. Not an error.
    Skipped,
}

type Table = HashMap<FundId, LeaseId>;

/// Owner of the fund reservation table.
///
/// Cheap to clone; clones share the same table.
#[derive(Debug, Clone)]
pub struct ReservationManager {
    table: Arc<Mutex<Table>>,
    policy: ReservationPolicy,
}

impl ReservationManager {
    /// Creates a manager with an empty table.
    #[must_use]
    pub fn new(policy: ReservationPolicy) -> Self {
        Self {
            table: Arc::new(Mutex::new(HashMap::new())),
            policy,
        }
    }

    /// Returns the selection policy.
    #[must_use]
    pub const fn policy(&self) -> &ReservationPolicy {
        &self.policy
    }

    /// Picks funds covering `target` and reserves them.
    ///
    /// Candidates are scanned in the order given. A fund is eligible when
    /// it is not staked, not reserved, and strictly larger than half the
    /// target. Scanning stops once the running total reaches the target.
    /// On success the set is released automatically after
    /// [`ReservationPolicy::payout_lock`].
    ///
    /// # Errors
    ///
    /// Returns [`FaucetError::InsufficientFunds`] when the eligible funds
    /// cannot reach `target`. A failed pass leaves nothing reserved.
    pub async fn select_for_payout(
        &self,
        candidates: &[FundRecord],
        target: u64,
    ) -> Result<ReservedSet, FaucetError> {
        let floor = target / 2;
        let set = {
            let mut table = self.table.lock().await;
            let mut picked: HashSet<&FundId> = HashSet::new();
            let mut funds = Vec::new();
            let mut total = 0u64;

            for fund in candidates {
                if fund.staked
                    || fund.amount <= floor
                    || table.contains_key(&fund.id)
                    || !picked.insert(&fund.id)
                {
                    continue;
                }
                funds.push(fund.id.clone());
                total = total.saturating_add(fund.amount);
                if total >= target {
                    break;
                }
            }

            if funds.is_empty() || total < target {
                return Err(FaucetError::InsufficientFunds);
            }
            commit(&mut table, funds, total)
        };

        tracing::debug!(
            lease = %set.lease,
            count = set.funds.len(),
            total = set.total,
            "payout funds reserved"
        );
        self.schedule_release(&set, self.policy.payout_lock);
        Ok(set)
    }

    /// Picks one large fund and up to the policy cap of small funds for a
    /// consolidation sweep, and reserves them all.
    ///
    /// "Large" means strictly above the payout amount (it pays the fee);
    /// "small" means at most half the payout amount. Staked and reserved
    /// funds are ignored. Without a large fund, or without any small fund
    /// to merge, the pass is [`ConsolidationOutcome::Skipped`] and nothing
    /// is reserved. A lone large fund is never swept by itself: that would
    /// pay a fee to move one fund back to the same wallet. On success the set is released automatically after
    /// [`ReservationPolicy::consolidation_lock`].
    pub async fn select_for_consolidation(
        &self,
        candidates: &[FundRecord],
    ) -> ConsolidationOutcome {
        let large_floor = self.policy.payout_amount;
        let small_ceiling = self.policy.payout_amount / 2;
        let max_small = self.policy.consolidation_max_small;

        let set = {
            let mut table = self.table.lock().await;
            let mut large: Option<&FundRecord> = None;
            let mut small: Vec<&FundRecord> = Vec::with_capacity(max_small);

            for fund in candidates {
                if fund.staked || table.contains_key(&fund.id) {
                    continue;
                }
                if fund.amount > large_floor {
                    if large.is_none() {
                        large = Some(fund);
                    }
                } else if fund.amount <= small_ceiling
                    && small.len() < max_small
                    && small.iter().all(|s| s.id != fund.id)
                {
                    small.push(fund);
                }
                if large.is_some() && small.len() >= max_small {
                    break;
                }
            }

            let Some(large) = large else {
                return ConsolidationOutcome::Skipped;
            };
            if small.is_empty() {
                return ConsolidationOutcome::Skipped;
            }

            let total = small
                .iter()
                .fold(large.amount, |acc, f| acc.saturating_add(f.amount));
            let funds = std::iter::once(large)
                .chain(small)
                .map(|f| f.id.clone())
                .collect();
            commit(&mut table, funds, total)
        };

        tracing::debug!(
            lease = %set.lease,
            count = set.funds.len(),
            total = set.total,
            "consolidation funds reserved"
        );
        self.schedule_release(&set, self.policy.consolidation_lock);
        ConsolidationOutcome::Selected(set)
    }

    /// Clears the reservation of every listed identity, whoever owns it.
    ///
    /// Idempotent; unknown identities are ignored.
    pub async fn release(&self, ids: &[FundId]) {
        let mut table = self.table.lock().await;
        for id in ids {
            table.remove(id);
        }
    }

    /// Clears the reservations made by `set`, leaving any identity that
    /// has since been claimed by another lease untouched.
    pub async fn release_set(&self, set: &ReservedSet) {
        let mut table = self.table.lock().await;
        release_lease(&mut table, set.lease, &set.funds);
    }

    /// Returns `true` if `id` is currently reserved.
    pub async fn is_reserved(&self, id: &FundId) -> bool {
        self.table.lock().await.contains_key(id)
    }

    /// Returns the number of reserved identities.
    pub async fn reserved_count(&self) -> usize {
        self.table.lock().await.len()
    }

    fn schedule_release(&self, set: &ReservedSet, delay: Duration) {
        let table = Arc::clone(&self.table);
        let lease = set.lease;
        let funds = set.funds.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut table = table.lock().await;
            let released = release_lease(&mut table, lease, &funds);
            if released > 0 {
                tracing::debug!(%lease, released, "reservation expired");
            }
        });
    }
}

fn commit(table: &mut Table, funds: Vec<FundId>, total: u64) -> ReservedSet {
    let lease = LeaseId::new();
    for id in &funds {
        table.insert(id.clone(), lease);
    }
    ReservedSet { lease, funds, total }
}

fn release_lease(table: &mut Table, lease: LeaseId, funds: &[FundId]) -> usize {
    let mut released = 0;
    for id in funds {
        if table.get(id) == Some(&lease) {
            table.remove(id);
            released += 1;
        }
    }
    released
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    const M: u64 = 1_000_000;

    fn fund(tag: u8, amount: u64, staked: bool) -> FundRecord {
        FundRecord::new(vec![tag], amount, staked)
    }

    fn manager() -> ReservationManager {
        ReservationManager::new(ReservationPolicy::default())
    }

    fn tags(set: &ReservedSet) -> Vec<u8> {
        set.funds()
            .iter()
            .filter_map(|id| id.as_bytes().first().copied())
            .collect()
    }

    #[tokio::test]
    async fn payout_skips_dust_below_half_target() {
        let mgr = manager();
        let funds = [fund(1, 70 * M, false), fund(2, 60 * M, false), fund(3, 10 * M, false)];

        let Ok(set) = mgr.select_for_payout(&funds, 100 * M).await else {
            panic!("expected a selection");
        };
        assert_eq!(tags(&set), vec![1, 2]);
        assert_eq!(set.total(), 130 * M);
        assert!(!mgr.is_reserved(&funds[2].id).await);
    }

    #[tokio::test]
    async fn payout_floor_is_strict() {
        let mgr = manager();
        let funds = [fund(1, 50 * M, false), fund(2, 50 * M, false)];
        let result = mgr.select_for_payout(&funds, 100 * M).await;
        assert!(matches!(result, Err(FaucetError::InsufficientFunds)));
    }

    #[tokio::test]
    async fn payout_ignores_staked_funds() {
        let mgr = manager();
        let funds = [fund(1, 200 * M, true), fund(2, 120 * M, false)];
        let Ok(set) = mgr.select_for_payout(&funds, 100 * M).await else {
            panic!("expected a selection");
        };
        assert_eq!(tags(&set), vec![2]);
    }

    #[tokio::test]
    async fn payout_stops_once_target_reached() {
        let mgr = manager();
        let funds = [fund(1, 150 * M, false), fund(2, 150 * M, false)];
        let Ok(set) = mgr.select_for_payout(&funds, 100 * M).await else {
            panic!("expected a selection");
        };
        assert_eq!(tags(&set), vec![1]);
        assert!(!mgr.is_reserved(&funds[1].id).await);
    }

    #[tokio::test]
    async fn insufficient_funds_leaves_nothing_locked() {
        let mgr = manager();
        let funds = [fund(1, 60 * M, false), fund(2, 30 * M, false)];
        let result = mgr.select_for_payout(&funds, 100 * M).await;
        assert!(matches!(result, Err(FaucetError::InsufficientFunds)));
        assert_eq!(mgr.reserved_count().await, 0);
    }

    #[tokio::test]
    async fn reserved_funds_are_invisible_to_later_passes() {
        let mgr = manager();
        let funds = [fund(1, 120 * M, false), fund(2, 120 * M, false)];

        let Ok(first) = mgr.select_for_payout(&funds, 100 * M).await else {
            panic!("first selection");
        };
        let Ok(second) = mgr.select_for_payout(&funds, 100 * M).await else {
            panic!("second selection");
        };
        assert_eq!(tags(&first), vec![1]);
        assert_eq!(tags(&second), vec![2]);

        let third = mgr.select_for_payout(&funds, 100 * M).await;
        assert!(matches!(third, Err(FaucetError::InsufficientFunds)));
    }

    #[tokio::test]
    async fn duplicate_candidates_are_picked_once() {
        let mgr = manager();
        let funds = [fund(1, 60 * M, false), fund(1, 60 * M, false)];
        let result = mgr.select_for_payout(&funds, 100 * M).await;
        assert!(matches!(result, Err(FaucetError::InsufficientFunds)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_selections_are_disjoint() {
        let mgr = manager();
        let funds: Arc<Vec<FundRecord>> =
            Arc::new((0..10).map(|i| fund(i, 60 * M, false)).collect());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let mgr = mgr.clone();
            let funds = Arc::clone(&funds);
            handles.push(tokio::spawn(async move {
                mgr.select_for_payout(&funds, 100 * M).await
            }));
        }

        let mut seen = HashSet::new();
        let mut successes = 0;
        for handle in handles {
            let Ok(result) = handle.await else {
                panic!("task panicked");
            };
            if let Ok(set) = result {
                successes += 1;
                for id in set.into_funds() {
                    assert!(seen.insert(id), "fund selected twice");
                }
            }
        }
        assert_eq!(successes, 5);
        assert_eq!(seen.len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn payout_lock_expires_without_release() {
        let mgr = manager();
        let funds = [fund(1, 120 * M, false)];
        let Ok(_set) = mgr.select_for_payout(&funds, 100 * M).await else {
            panic!("expected a selection");
        };

        tokio::time::sleep(DEFAULT_PAYOUT_LOCK - Duration::from_secs(1)).await;
        assert!(mgr.is_reserved(&funds[0].id).await);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!mgr.is_reserved(&funds[0].id).await);
        assert!(mgr.select_for_payout(&funds, 100 * M).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_timer_does_not_free_a_newer_lease() {
        let mgr = manager();
        let funds = [fund(1, 120 * M, false)];
        let Ok(first) = mgr.select_for_payout(&funds, 100 * M).await else {
            panic!("first selection");
        };
        mgr.release_set(&first).await;

        tokio::time::sleep(Duration::from_secs(60)).await;
        let Ok(second) = mgr.select_for_payout(&funds, 100 * M).await else {
            panic!("second selection");
        };

        // First lease's timer fires here; the second lease must survive it.
        tokio::time::sleep(DEFAULT_PAYOUT_LOCK - Duration::from_secs(30)).await;
        assert!(mgr.is_reserved(&funds[0].id).await);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!mgr.is_reserved(&funds[0].id).await);
        drop(second);
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let mgr = manager();
        let funds = [fund(1, 120 * M, false)];
        let Ok(set) = mgr.select_for_payout(&funds, 100 * M).await else {
            panic!("expected a selection");
        };

        mgr.release(set.funds()).await;
        mgr.release(set.funds()).await;
        mgr.release(&[FundId::from_bytes(vec![9, 9])]).await;
        assert_eq!(mgr.reserved_count().await, 0);
    }

    #[tokio::test]
    async fn release_set_spares_other_leases() {
        let mgr = manager();
        let funds = [fund(1, 120 * M, false)];
        let Ok(first) = mgr.select_for_payout(&funds, 100 * M).await else {
            panic!("first selection");
        };
        mgr.release(first.funds()).await;
        let Ok(_second) = mgr.select_for_payout(&funds, 100 * M).await else {
            panic!("second selection");
        };

        mgr.release_set(&first).await;
        assert!(mgr.is_reserved(&funds[0].id).await);
    }

    #[tokio::test]
    async fn consolidation_picks_one_large_and_capped_small() {
        let mgr = manager();
        let mut funds = vec![fund(100, 500 * M, false), fund(101, 300 * M, false)];
        funds.extend((0..8).map(|i| fund(i, 10 * M, false)));

        let ConsolidationOutcome::Selected(set) = mgr.select_for_consolidation(&funds).await
        else {
            panic!("expected a consolidation");
        };
        assert_eq!(tags(&set), vec![100, 0, 1, 2, 3, 4]);
        assert_eq!(set.total(), 550 * M);
        assert!(mgr.is_reserved(&funds[0].id).await);
        assert!(!mgr.is_reserved(&funds[1].id).await);
    }

    #[tokio::test]
    async fn consolidation_ignores_middle_band_and_staked() {
        let mgr = manager();
        let funds = [
            fund(1, 80 * M, false),
            fund(2, 10 * M, true),
            fund(3, 10 * M, false),
            fund(4, 200 * M, false),
        ];
        let ConsolidationOutcome::Selected(set) = mgr.select_for_consolidation(&funds).await
        else {
            panic!("expected a consolidation");
        };
        assert_eq!(tags(&set), vec![4, 3]);
    }

    #[tokio::test]
    async fn consolidation_without_large_fund_is_skipped() {
        let mgr = manager();
        let funds = [fund(1, 10 * M, false), fund(2, 20 * M, false), fund(3, 100 * M, false)];
        let outcome = mgr.select_for_consolidation(&funds).await;
        assert_eq!(outcome, ConsolidationOutcome::Skipped);
        assert_eq!(mgr.reserved_count().await, 0);
    }

    #[tokio::test]
    async fn consolidation_without_small_funds_is_skipped() {
        let mgr = manager();
        let funds = [fund(1, 500 * M, false)];
        let outcome = mgr.select_for_consolidation(&funds).await;
        assert_eq!(outcome, ConsolidationOutcome::Skipped);
        assert_eq!(mgr.reserved_count().await, 0);
    }

    #[tokio::test]
    async fn payout_and_consolidation_see_each_other() {
        let mgr = manager();
        let funds = [fund(1, 500 * M, false), fund(2, 10 * M, false)];

        let ConsolidationOutcome::Selected(_) = mgr.select_for_consolidation(&funds).await else {
            panic!("expected a consolidation");
        };
        let payout = mgr.select_for_payout(&funds, 100 * M).await;
        assert!(matches!(payout, Err(FaucetError::InsufficientFunds)));
    }

    #[tokio::test(start_paused = true)]
    async fn consolidation_lock_outlives_payout_lock() {
        let mgr = manager();
        let funds = [fund(1, 500 * M, false), fund(2, 10 * M, false)];
        let ConsolidationOutcome::Selected(_) = mgr.select_for_consolidation(&funds).await else {
            panic!("expected a consolidation");
        };

        tokio::time::sleep(DEFAULT_PAYOUT_LOCK + Duration::from_secs(1)).await;
        assert_eq!(mgr.reserved_count().await, 2);

        tokio::time::sleep(DEFAULT_CONSOLIDATION_LOCK).await;
        assert_eq!(mgr.reserved_count().await, 0);
    }
}
