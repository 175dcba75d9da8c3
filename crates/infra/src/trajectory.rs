//! Metric series across a date range.

use chrono::{DateTime, Utc};
use tracing::instrument;

use finscope_analytics::{build_trajectory, sample_dates, Interval, TrajectoryPoint};
use finscope_core::UserId;
use finscope_ledger::FinancialState;

use crate::point_in_time::{QueryError, Stores};
use crate::snapshots::SnapshotManager;

#[derive(Debug, Clone)]
pub struct TrajectoryService {
    stores: Stores,
    snapshots: SnapshotManager,
}

impl TrajectoryService {
    pub fn new(stores: Stores) -> Self {
        let snapshots = SnapshotManager::new(stores.clone());
        Self { stores, snapshots }
    }

    /// Sample metrics over `[start, end]`; `end` never reaches past now.
    ///
    /// One backfill, one snapshot lookup and one event range read, however
    /// many samples the range holds.
    #[instrument(skip(self), fields(user_id = %user_id, start = %start, end = %end), err)]
    pub async fn trajectory(
        &self,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Interval,
    ) -> Result<Vec<TrajectoryPoint>, QueryError> {
        let account = self.stores.require_account(user_id).await?;
        let end = end.min(self.stores.clock.now());
        if start > end {
            return Ok(Vec::new());
        }

        self.snapshots.backfill(user_id).await?;

        let (base, after) = match self.stores.snapshots.latest_at_or_before(user_id, start).await? {
            Some(snapshot) => {
                let date = snapshot.date;
                (snapshot.into_state(), Some(date))
            }
            None => {
                let currency = self.stores.genesis_currency(&account).await?;
                (FinancialState::empty(currency), None)
            }
        };

        let events = self.stores.replay_window(user_id, after, end).await?;
        let samples = sample_dates(start, end, interval);
        tracing::debug!(samples = samples.len(), events = events.len(), "building trajectory");

        Ok(build_trajectory(base, &events, &samples))
    }
}
