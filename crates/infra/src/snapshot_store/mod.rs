//! Monthly state checkpoints.
//!
//! A snapshot is the cumulative state of one user as of the first instant
//! (UTC) of a calendar month. There is at most one per (user, month); stores
//! silently skip duplicates so concurrent backfills converge.

pub mod in_memory;
pub mod postgres;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use finscope_core::{calendar::month_start, UserId};
use finscope_ledger::{hydrate, serialize, CodecError, FinancialState, SerializedState};

pub use in_memory::InMemorySnapshotStore;
pub use postgres::PostgresSnapshotStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub user_id: UserId,
    /// Always a month start.
    pub date: DateTime<Utc>,
    pub state: SerializedState,
}

impl Snapshot {
    /// Capture `state` as the checkpoint for the month containing `month`.
    pub fn capture(user_id: UserId, month: DateTime<Utc>, state: &FinancialState) -> Self {
        Self {
            user_id,
            date: month_start(month),
            state: serialize(state),
        }
    }

    pub fn hydrate(&self) -> FinancialState {
        hydrate(self.state.clone())
    }

    pub fn into_state(self) -> FinancialState {
        hydrate(self.state)
    }
}

#[derive(Debug, Error)]
pub enum SnapshotStoreError {
    #[error("snapshot store unavailable: {0}")]
    Unavailable(String),

    #[error("snapshot is not dated at a month start: {0}")]
    Misaligned(DateTime<Utc>),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

#[async_trait::async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Latest snapshot dated at or before `at`.
    async fn latest_at_or_before(
        &self,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<Snapshot>, SnapshotStoreError>;

    async fn latest(&self, user_id: UserId) -> Result<Option<Snapshot>, SnapshotStoreError>;

    /// Insert every snapshot whose (user, month) is not taken yet.
    ///
    /// Returns how many were actually inserted; existing rows are never
    /// overwritten.
    async fn insert_missing(&self, snapshots: Vec<Snapshot>) -> Result<usize, SnapshotStoreError>;

    /// All snapshots of a user, oldest first.
    async fn list(&self, user_id: UserId) -> Result<Vec<Snapshot>, SnapshotStoreError>;
}

#[async_trait::async_trait]
impl<S> SnapshotStore for Arc<S>
where
    S: SnapshotStore + ?Sized,
{
    async fn latest_at_or_before(
        &self,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<Snapshot>, SnapshotStoreError> {
        (**self).latest_at_or_before(user_id, at).await
    }

    async fn latest(&self, user_id: UserId) -> Result<Option<Snapshot>, SnapshotStoreError> {
        (**self).latest(user_id).await
    }

    async fn insert_missing(&self, snapshots: Vec<Snapshot>) -> Result<usize, SnapshotStoreError> {
        (**self).insert_missing(snapshots).await
    }

    async fn list(&self, user_id: UserId) -> Result<Vec<Snapshot>, SnapshotStoreError> {
        (**self).list(user_id).await
    }
}

fn ensure_aligned(snapshot: &Snapshot) -> Result<(), SnapshotStoreError> {
    if month_start(snapshot.date) != snapshot.date {
        return Err(SnapshotStoreError::Misaligned(snapshot.date));
    }
    Ok(())
}
