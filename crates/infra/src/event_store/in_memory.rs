use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use finscope_core::{Clock, EventId, SystemClock, UserId};
use finscope_events::{sort_chronologically, FinancialEvent, NewEvent};

use super::query::{EventFilter, EventQuery, EventQueryResult, Pagination};
use super::r#trait::{in_window, EventStore, EventStoreError};

#[derive(Debug, Default)]
struct Log {
    events: Vec<FinancialEvent>,
    last_sequence: u64,
}

/// In-memory append-only event log.
///
/// Intended for tests/dev. Not optimized for performance: every read scans
/// the whole log.
pub struct InMemoryEventStore {
    log: RwLock<Log>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for InMemoryEventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryEventStore").finish_non_exhaustive()
    }
}

impl InMemoryEventStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            log: RwLock::new(Log::default()),
            clock,
        }
    }

    /// Synchronous append.
    ///
    /// Lets a caller that already holds its own write lock record the event
    /// inside the same critical section as the mutation it documents.
    pub fn record(&self, event: NewEvent) -> Result<FinancialEvent, EventStoreError> {
        let mut log = self.log.write().map_err(|_| EventStoreError::poisoned())?;
        log.last_sequence += 1;
        let recorded = event.into_recorded(EventId::new(), log.last_sequence, self.clock.now());
        log.events.push(recorded.clone());
        Ok(recorded)
    }

    fn scan<F>(&self, user_id: UserId, keep: F) -> Result<Vec<FinancialEvent>, EventStoreError>
    where
        F: Fn(&FinancialEvent) -> bool,
    {
        let log = self.log.read().map_err(|_| EventStoreError::poisoned())?;
        Ok(log
            .events
            .iter()
            .filter(|e| e.user_id == user_id && keep(e))
            .cloned()
            .collect())
    }

    pub fn len(&self) -> usize {
        self.log.read().map(|log| log.events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, event: NewEvent) -> Result<FinancialEvent, EventStoreError> {
        self.record(event)
    }

    async fn events_between(
        &self,
        user_id: UserId,
        after: Option<DateTime<Utc>>,
        until: DateTime<Utc>,
    ) -> Result<Vec<FinancialEvent>, EventStoreError> {
        let mut events = self.scan(user_id, |e| in_window(e, after, until))?;
        sort_chronologically(&mut events);
        Ok(events)
    }

    async fn earliest_currency_change(
        &self,
        user_id: UserId,
    ) -> Result<Option<FinancialEvent>, EventStoreError> {
        let changes = self.scan(user_id, FinancialEvent::is_currency_change)?;
        Ok(changes.into_iter().min_by_key(FinancialEvent::chronological_key))
    }
}

#[async_trait::async_trait]
impl EventQuery for InMemoryEventStore {
    async fn query(
        &self,
        user_id: UserId,
        filter: EventFilter,
        pagination: Pagination,
    ) -> Result<EventQueryResult, EventStoreError> {
        let mut matching = self.scan(user_id, |e| filter.matches(e))?;
        matching.sort_by_key(|e| std::cmp::Reverse(e.chronological_key()));

        let total = matching.len() as u64;
        let events = matching
            .into_iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .collect();

        Ok(EventQueryResult {
            events,
            total,
            has_more: pagination.has_more(total),
            pagination,
        })
    }

    async fn get_event_by_id(
        &self,
        user_id: UserId,
        event_id: EventId,
    ) -> Result<Option<FinancialEvent>, EventStoreError> {
        Ok(self.scan(user_id, |e| e.id == event_id)?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use finscope_core::{EntityId, ManualClock};
    use finscope_events::{ActionType, EntityType};
    use serde_json::json;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn store_at(start: DateTime<Utc>) -> (Arc<ManualClock>, InMemoryEventStore) {
        let clock = Arc::new(ManualClock::new(start));
        let store = InMemoryEventStore::new(clock.clone());
        (clock, store)
    }

    fn asset(user: UserId, id: &str, value: f64) -> NewEvent {
        NewEvent::create(user, EntityType::Asset, id, json!({"name": id, "value": value}))
    }

    #[tokio::test]
    async fn append_assigns_clock_time_and_increasing_sequence() {
        let (clock, store) = store_at(at(2024, 3, 15));
        let user = UserId::new();

        let first = store.append(asset(user, "a", 1.0)).await.unwrap();
        let second = store.append(asset(user, "b", 2.0)).await.unwrap();
        clock.advance(Duration::days(1));
        let third = store.append(asset(user, "c", 3.0)).await.unwrap();

        assert_eq!(first.timestamp, at(2024, 3, 15));
        assert_eq!(first.timestamp, second.timestamp);
        assert!(first.sequence < second.sequence);
        assert_eq!(third.timestamp, at(2024, 3, 16));
        assert_ne!(first.id, second.id);
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn events_between_is_exclusive_after_inclusive_until_and_ascending() {
        let (clock, store) = store_at(at(2024, 1, 1));
        let user = UserId::new();
        let other = UserId::new();

        store.append(asset(user, "jan", 1.0)).await.unwrap();
        clock.set(at(2024, 2, 1));
        store.append(asset(user, "feb", 2.0)).await.unwrap();
        store.append(asset(other, "feb-other", 2.0)).await.unwrap();
        clock.set(at(2024, 3, 1));
        store.append(asset(user, "mar", 3.0)).await.unwrap();

        let window = store
            .events_between(user, Some(at(2024, 1, 1)), at(2024, 3, 1))
            .await
            .unwrap();
        let ids: Vec<_> = window.iter().map(|e| e.entity_id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["feb", "mar"]);

        let from_start = store.events_between(user, None, at(2024, 2, 1)).await.unwrap();
        assert_eq!(from_start.len(), 2);
    }

    #[tokio::test]
    async fn earliest_currency_change_ignores_other_user_updates() {
        let (clock, store) = store_at(at(2024, 1, 1));
        let user = UserId::new();

        store
            .append(NewEvent::update(user, EntityType::User, "u", json!({"name": "A"}), json!({"name": "B"})))
            .await
            .unwrap();
        assert!(store.earliest_currency_change(user).await.unwrap().is_none());

        clock.set(at(2024, 2, 1));
        store
            .append(NewEvent::update(
                user,
                EntityType::User,
                "u",
                json!({"currencyCode": "USD"}),
                json!({"currencyCode": "EUR"}),
            ))
            .await
            .unwrap();
        clock.set(at(2024, 3, 1));
        store
            .append(NewEvent::update(
                user,
                EntityType::User,
                "u",
                json!({"currencyCode": "EUR"}),
                json!({"currencyCode": "GBP"}),
            ))
            .await
            .unwrap();

        let change = store.earliest_currency_change(user).await.unwrap().unwrap();
        assert_eq!(change.timestamp, at(2024, 2, 1));
        assert_eq!(change.action_type, ActionType::Update);
    }

    #[tokio::test]
    async fn query_is_most_recent_first_and_paginated() {
        let (clock, store) = store_at(at(2024, 1, 1));
        let user = UserId::new();
        for i in 0..5 {
            store.append(asset(user, &format!("a{i}"), i as f64)).await.unwrap();
            clock.advance(Duration::days(1));
        }

        let page = store
            .query(user, EventFilter::default(), Pagination::new(Some(2), Some(1)))
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert!(page.has_more);
        let ids: Vec<_> = page.events.iter().map(|e| e.entity_id.clone()).collect();
        assert_eq!(ids, vec![EntityId::from("a3"), EntityId::from("a2")]);

        let hit = store
            .get_event_by_id(user, page.events[0].id)
            .await
            .unwrap();
        assert_eq!(hit.as_ref().map(|e| e.sequence), Some(page.events[0].sequence));
        assert!(store
            .get_event_by_id(UserId::new(), page.events[0].id)
            .await
            .unwrap()
            .is_none());

        let history = store
            .entity_history(user, EntityId::from("a4"), None)
            .await
            .unwrap();
        assert_eq!(history.total, 1);
    }
}
