use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

use finscope_core::UserId;
use finscope_events::{FinancialEvent, NewEvent};

/// Event store operation error.
///
/// These are **infrastructure errors** only. The log never rejects an event
/// for its content; producers validate before they emit.
#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("event store unavailable: {0}")]
    Unavailable(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    #[error("failed to decode stored event: {0}")]
    Decode(String),
}

impl EventStoreError {
    pub(crate) fn poisoned() -> Self {
        Self::Unavailable("lock poisoned".to_string())
    }
}

/// Append-only financial event log.
///
/// ## Append semantics
///
/// `append()` assigns the event id, the timestamp (from the store's clock)
/// and a sequence number that increases monotonically across the store, so
/// events sharing a timestamp replay in insertion order. Nothing is ever
/// updated or deleted.
///
/// ## Replay reads
///
/// `events_between()` is the range scan the reconstruction engine folds over:
/// events with `after < timestamp <= until`, ascending by
/// `(timestamp, sequence)`. `after = None` scans from the first event.
#[async_trait::async_trait]
pub trait EventStore: Send + Sync {
    async fn append(&self, event: NewEvent) -> Result<FinancialEvent, EventStoreError>;

    async fn events_between(
        &self,
        user_id: UserId,
        after: Option<DateTime<Utc>>,
        until: DateTime<Utc>,
    ) -> Result<Vec<FinancialEvent>, EventStoreError>;

    /// Earliest USER update that switched the preferred currency.
    ///
    /// Its `before_value` tells which currency the account started with.
    async fn earliest_currency_change(
        &self,
        user_id: UserId,
    ) -> Result<Option<FinancialEvent>, EventStoreError>;
}

#[async_trait::async_trait]
impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    async fn append(&self, event: NewEvent) -> Result<FinancialEvent, EventStoreError> {
        (**self).append(event).await
    }

    async fn events_between(
        &self,
        user_id: UserId,
        after: Option<DateTime<Utc>>,
        until: DateTime<Utc>,
    ) -> Result<Vec<FinancialEvent>, EventStoreError> {
        (**self).events_between(user_id, after, until).await
    }

    async fn earliest_currency_change(
        &self,
        user_id: UserId,
    ) -> Result<Option<FinancialEvent>, EventStoreError> {
        (**self).earliest_currency_change(user_id).await
    }
}

/// True when `event` falls in the half-open replay window `(after, until]`.
pub(crate) fn in_window(
    event: &FinancialEvent,
    after: Option<DateTime<Utc>>,
    until: DateTime<Utc>,
) -> bool {
    event.timestamp <= until && after.is_none_or(|a| event.timestamp > a)
}
