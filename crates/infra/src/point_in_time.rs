//! Point-in-time reconstruction.
//!
//! `state_at(user, t)` picks the cheapest correct path:
//!
//! 1. `t >= now`: the live tables already hold the answer.
//! 2. A snapshot dated `<= t` exists: hydrate it and fold the events in
//!    `(snapshot.date, t]`.
//! 3. Otherwise fold the whole log from the account's genesis.
//!
//! All three paths agree for any `t`; the integration tests hold them to it.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

use finscope_core::{Clock, Currency, DomainError, UserId};
use finscope_events::{payload, sort_chronologically, FinancialEvent};
use finscope_ledger::{replay, FinancialState};

use crate::event_store::{EventStore, EventStoreError};
use crate::live::{LiveStateError, LiveStateSource, UserAccount};
use crate::snapshot_store::{SnapshotStore, SnapshotStoreError};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    #[error(transparent)]
    EventStore(#[from] EventStoreError),

    #[error(transparent)]
    SnapshotStore(#[from] SnapshotStoreError),

    #[error(transparent)]
    LiveState(#[from] LiveStateError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// The collaborators every read path needs.
#[derive(Clone)]
pub struct Stores {
    pub events: Arc<dyn EventStore>,
    pub snapshots: Arc<dyn SnapshotStore>,
    pub live: Arc<dyn LiveStateSource>,
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}

impl Stores {
    pub fn new(
        events: Arc<dyn EventStore>,
        snapshots: Arc<dyn SnapshotStore>,
        live: Arc<dyn LiveStateSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            events,
            snapshots,
            live,
            clock,
        }
    }

    pub(crate) async fn require_account(&self, user_id: UserId) -> Result<UserAccount, QueryError> {
        self.live
            .account(user_id)
            .await?
            .ok_or(QueryError::UserNotFound(user_id))
    }

    /// Currency the account was opened with.
    ///
    /// The first currency switch records the original code in its
    /// `before_value`; without any switch the preferred currency never
    /// changed.
    pub(crate) async fn genesis_currency(&self, account: &UserAccount) -> Result<Currency, QueryError> {
        let first_change = self.events.earliest_currency_change(account.id).await?;
        let original = first_change
            .as_ref()
            .and_then(|e| e.before_value.as_ref())
            .and_then(|v| payload::string(v, "currencyCode"))
            .map(Currency::from_code);

        Ok(original.unwrap_or_else(|| account.preferred_currency.clone()))
    }

    /// Events in `(after, until]`, in replay order.
    pub(crate) async fn replay_window(
        &self,
        user_id: UserId,
        after: Option<DateTime<Utc>>,
        until: DateTime<Utc>,
    ) -> Result<Vec<FinancialEvent>, QueryError> {
        let mut events = self.events.events_between(user_id, after, until).await?;
        sort_chronologically(&mut events);
        Ok(events)
    }
}

#[derive(Debug, Clone)]
pub struct PointInTimeEngine {
    stores: Stores,
}

impl PointInTimeEngine {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Financial state of `user_id` as of `target` (inclusive).
    #[instrument(skip(self), fields(user_id = %user_id, target = %target), err)]
    pub async fn state_at(&self, user_id: UserId, target: DateTime<Utc>) -> Result<FinancialState, QueryError> {
        let account = self.stores.require_account(user_id).await?;

        if target >= self.stores.clock.now() {
            tracing::debug!(path = "live", "reading current state");
            return Ok(self.stores.live.current_state(user_id).await?);
        }

        match self.stores.snapshots.latest_at_or_before(user_id, target).await? {
            Some(snapshot) => {
                let events = self.stores.replay_window(user_id, Some(snapshot.date), target).await?;
                tracing::debug!(
                    path = "snapshot",
                    snapshot_date = %snapshot.date,
                    delta_events = events.len(),
                    "replaying delta"
                );
                Ok(replay(snapshot.into_state(), &events))
            }
            None => {
                tracing::debug!(path = "genesis", "no snapshot at or before target; full replay");
                self.fold_from_genesis(&account, target).await
            }
        }
    }

    /// Always folds the full log, ignoring snapshots and live tables.
    #[instrument(skip(self), fields(user_id = %user_id, target = %target), err)]
    pub async fn replay_from_genesis(
        &self,
        user_id: UserId,
        target: DateTime<Utc>,
    ) -> Result<FinancialState, QueryError> {
        let account = self.stores.require_account(user_id).await?;
        self.fold_from_genesis(&account, target).await
    }

    async fn fold_from_genesis(
        &self,
        account: &UserAccount,
        target: DateTime<Utc>,
    ) -> Result<FinancialState, QueryError> {
        let currency = self.stores.genesis_currency(account).await?;
        let events = self.stores.replay_window(account.id, None, target).await?;
        Ok(replay(FinancialState::empty(currency), &events))
    }
}
