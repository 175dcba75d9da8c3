//! Snapshot lifecycle: genesis, explicit monthly checkpoints and the
//! self-healing backfill that fills every month missing since the latest
//! checkpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use finscope_core::{
    calendar::{add_months, month_start, month_starts_between},
    DomainError, UserId,
};
use finscope_ledger::FinancialState;

use crate::point_in_time::{PointInTimeEngine, QueryError, Stores};
use crate::snapshot_store::Snapshot;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillReport {
    /// Months materialized by this run.
    pub created: usize,
    /// Months another writer filled first.
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct SnapshotManager {
    stores: Stores,
    engine: PointInTimeEngine,
}

impl SnapshotManager {
    pub fn new(stores: Stores) -> Self {
        let engine = PointInTimeEngine::new(stores.clone());
        Self { stores, engine }
    }

    /// Checkpoint of the creation month, in the currency the account was
    /// opened with.
    ///
    /// An account opened exactly at a month start still has that boundary
    /// open: nothing is written and backfill materializes it once time has
    /// moved on. Returns whether a snapshot was inserted.
    #[instrument(skip(self), fields(user_id = %user_id), err)]
    pub async fn create_genesis(&self, user_id: UserId) -> Result<bool, QueryError> {
        let account = self.stores.require_account(user_id).await?;
        let boundary = month_start(account.created_at);
        if boundary >= self.stores.clock.now() {
            tracing::debug!(%boundary, "creation month boundary still open; genesis deferred");
            return Ok(false);
        }

        let state = self.engine.replay_from_genesis(user_id, boundary).await?;
        let genesis = Snapshot::capture(user_id, boundary, &state);
        let inserted = self.stores.snapshots.insert_missing(vec![genesis]).await?;
        Ok(inserted == 1)
    }

    /// Materialize the checkpoint of the month containing `month`.
    ///
    /// Returns `false` when that month already had one.
    #[instrument(skip(self), fields(user_id = %user_id, month = %month), err)]
    pub async fn checkpoint_month(&self, user_id: UserId, month: DateTime<Utc>) -> Result<bool, QueryError> {
        let boundary = month_start(month);
        if boundary >= self.stores.clock.now() {
            return Err(DomainError::date_out_of_range(format!("month starting {boundary} has not begun")).into());
        }

        let state = self.engine.state_at(user_id, boundary).await?;
        let inserted = self
            .stores
            .snapshots
            .insert_missing(vec![Snapshot::capture(user_id, boundary, &state)])
            .await?;
        Ok(inserted == 1)
    }

    /// Fill every month after the latest snapshot (or from the creation
    /// month when there is none) up to the current month.
    ///
    /// A boundary equal to now is left for the next run: more events may
    /// still arrive with that exact timestamp.
    ///
    /// The log is read once; each month folds only the events since the
    /// previous one. Safe to run concurrently: duplicates are skipped.
    #[instrument(skip(self), fields(user_id = %user_id), err)]
    pub async fn backfill(&self, user_id: UserId) -> Result<BackfillReport, QueryError> {
        let account = self.stores.require_account(user_id).await?;
        let now = self.stores.clock.now();
        let current_month = month_start(now);

        let (mut state, last_date, first_missing) = match self.stores.snapshots.latest(user_id).await? {
            Some(snapshot) => {
                let next = add_months(snapshot.date, 1)?;
                (snapshot.hydrate(), Some(snapshot.date), next)
            }
            None => {
                let currency = self.stores.genesis_currency(&account).await?;
                (FinancialState::empty(currency), None, month_start(account.created_at))
            }
        };

        let mut months = month_starts_between(first_missing, current_month);
        months.retain(|m| *m < now);
        if months.is_empty() {
            return Ok(BackfillReport::default());
        }

        let events = self.stores.replay_window(user_id, last_date, current_month).await?;
        let mut cursor = 0;
        let mut batch = Vec::with_capacity(months.len());
        for month in &months {
            while let Some(event) = events.get(cursor).filter(|e| e.timestamp <= *month) {
                state = state.apply(event);
                cursor += 1;
            }
            batch.push(Snapshot::capture(user_id, *month, &state));
        }

        let created = self.stores.snapshots.insert_missing(batch).await?;
        let report = BackfillReport {
            created,
            skipped: months.len() - created,
        };
        tracing::info!(created = report.created, skipped = report.skipped, "snapshot backfill finished");
        Ok(report)
    }
}
