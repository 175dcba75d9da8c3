//! Event listing for inspection and audit views.
//!
//! Listings are user-scoped, most-recent-first and always paginated. Replay
//! never goes through this interface: use `EventStore::events_between`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use finscope_core::{EntityId, EventId, UserId};
use finscope_events::{EntityType, FinancialEvent};

use crate::event_store::EventStoreError;

pub const DEFAULT_PAGE_LIMIT: u32 = 50;
pub const MAX_PAGE_LIMIT: u32 = 1000;

/// Pagination parameters for event queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of events to return.
    pub limit: u32,
    /// Offset for pagination (0-based).
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self::bounded(limit, offset, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT)
    }

    /// Like [`Pagination::new`] with caller-supplied default and cap.
    pub fn bounded(limit: Option<u32>, offset: Option<u32>, default_limit: u32, max_limit: u32) -> Self {
        Self {
            limit: limit.unwrap_or(default_limit).min(max_limit),
            offset: offset.unwrap_or(0),
        }
    }

    pub(crate) fn has_more(&self, total: u64) -> bool {
        total > u64::from(self.offset) + u64::from(self.limit)
    }
}

/// Filter criteria for event queries. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventFilter {
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<EntityId>,
    /// Inclusive lower bound on the event timestamp.
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the event timestamp.
    pub end_date: Option<DateTime<Utc>>,
    /// Case-insensitive substring over entity id, subtype and field values.
    pub text_search: Option<String>,
}

impl EventFilter {
    pub fn matches(&self, event: &FinancialEvent) -> bool {
        self.entity_type.as_ref().is_none_or(|t| &event.entity_type == t)
            && self.entity_id.as_ref().is_none_or(|id| &event.entity_id == id)
            && self.start_date.is_none_or(|from| event.timestamp >= from)
            && self.end_date.is_none_or(|to| event.timestamp <= to)
            && self
                .text_search
                .as_deref()
                .is_none_or(|needle| event.matches_text(needle))
    }
}

/// Paginated event query result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventQueryResult {
    /// The events on this page, most recent first.
    pub events: Vec<FinancialEvent>,
    /// Total number of events matching the filter (across all pages).
    pub total: u64,
    pub pagination: Pagination,
    pub has_more: bool,
}

/// Async query interface for event inspection.
#[async_trait::async_trait]
pub trait EventQuery: Send + Sync {
    /// List a user's events matching `filter`, ordered by timestamp and
    /// sequence, both descending.
    async fn query(
        &self,
        user_id: UserId,
        filter: EventFilter,
        pagination: Pagination,
    ) -> Result<EventQueryResult, EventStoreError>;

    /// Events that touched one entity.
    async fn entity_history(
        &self,
        user_id: UserId,
        entity_id: EntityId,
        pagination: Option<Pagination>,
    ) -> Result<EventQueryResult, EventStoreError> {
        let filter = EventFilter {
            entity_id: Some(entity_id),
            ..Default::default()
        };
        self.query(user_id, filter, pagination.unwrap_or_default()).await
    }

    /// Returns the event if it exists and belongs to the user.
    async fn get_event_by_id(
        &self,
        user_id: UserId,
        event_id: EventId,
    ) -> Result<Option<FinancialEvent>, EventStoreError>;
}
