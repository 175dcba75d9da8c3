use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use finscope_core::{EntityId, EventId, UserId};

use crate::kind::{ActionType, EntitySubtype, EntityType};

/// An event ready to be appended (not yet assigned identity, timestamp or
/// sequence).
///
/// `before_value` / `after_value` are the exact field values the producer
/// just persisted. The log performs no semantic validation on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub action_type: ActionType,
    pub entity_type: EntityType,
    pub entity_subtype: Option<EntitySubtype>,
    pub before_value: Option<JsonValue>,
    pub after_value: Option<JsonValue>,
    pub user_id: UserId,
    pub entity_id: EntityId,
}

impl NewEvent {
    pub fn new(
        action_type: ActionType,
        entity_type: EntityType,
        user_id: UserId,
        entity_id: impl Into<EntityId>,
    ) -> Self {
        Self {
            action_type,
            entity_type,
            entity_subtype: None,
            before_value: None,
            after_value: None,
            user_id,
            entity_id: entity_id.into(),
        }
    }

    pub fn create(
        user_id: UserId,
        entity_type: EntityType,
        entity_id: impl Into<EntityId>,
        after: JsonValue,
    ) -> Self {
        Self::new(ActionType::Create, entity_type, user_id, entity_id).with_after(after)
    }

    pub fn update(
        user_id: UserId,
        entity_type: EntityType,
        entity_id: impl Into<EntityId>,
        before: JsonValue,
        after: JsonValue,
    ) -> Self {
        Self::new(ActionType::Update, entity_type, user_id, entity_id)
            .with_before(before)
            .with_after(after)
    }

    pub fn delete(
        user_id: UserId,
        entity_type: EntityType,
        entity_id: impl Into<EntityId>,
        before: JsonValue,
    ) -> Self {
        Self::new(ActionType::Delete, entity_type, user_id, entity_id).with_before(before)
    }

    pub fn with_subtype(mut self, subtype: impl Into<EntitySubtype>) -> Self {
        self.entity_subtype = Some(subtype.into());
        self
    }

    pub fn with_before(mut self, before: JsonValue) -> Self {
        self.before_value = Some(before);
        self
    }

    pub fn with_after(mut self, after: JsonValue) -> Self {
        self.after_value = Some(after);
        self
    }

    /// Seal the event with store-assigned identity, ordering and timestamp.
    pub fn into_recorded(self, id: EventId, sequence: u64, timestamp: DateTime<Utc>) -> FinancialEvent {
        FinancialEvent {
            id,
            sequence,
            timestamp,
            action_type: self.action_type,
            entity_type: self.entity_type,
            entity_subtype: self.entity_subtype,
            before_value: self.before_value,
            after_value: self.after_value,
            user_id: self.user_id,
            entity_id: self.entity_id,
        }
    }
}

/// An immutable, recorded event.
///
/// Chronological order is `(timestamp, sequence)`: the store assigns
/// `sequence` monotonically, so events sharing a timestamp replay in
/// insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialEvent {
    pub id: EventId,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub action_type: ActionType,
    pub entity_type: EntityType,
    pub entity_subtype: Option<EntitySubtype>,
    pub before_value: Option<JsonValue>,
    pub after_value: Option<JsonValue>,
    pub user_id: UserId,
    pub entity_id: EntityId,
}

impl FinancialEvent {
    pub fn chronological_key(&self) -> (DateTime<Utc>, u64) {
        (self.timestamp, self.sequence)
    }

    pub fn is_income_statement(&self) -> bool {
        self.entity_subtype
            .as_ref()
            .is_some_and(EntitySubtype::is_income_statement)
    }

    /// USER update that switches the preferred currency.
    pub fn is_currency_change(&self) -> bool {
        self.entity_type == EntityType::User
            && self.action_type == ActionType::Update
            && self
                .after_value
                .as_ref()
                .and_then(|v| crate::payload::string(v, "currencyCode"))
                .is_some()
    }

    /// Case-insensitive match against entity id, subtype and field snapshots.
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let contains = |s: &str| s.to_lowercase().contains(&needle);

        contains(self.entity_id.as_str())
            || self.entity_subtype.as_ref().is_some_and(|s| contains(s.as_str()))
            || self.before_value.as_ref().is_some_and(|v| contains(&v.to_string()))
            || self.after_value.as_ref().is_some_and(|v| contains(&v.to_string()))
    }
}

/// Re-sort events into replay order.
///
/// Listing APIs return most-recent-first; folds must run oldest-first.
pub fn sort_chronologically(events: &mut [FinancialEvent]) {
    events.sort_by_key(FinancialEvent::chronological_key);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn recorded(new: NewEvent, seq: u64, ts: DateTime<Utc>) -> FinancialEvent {
        new.into_recorded(EventId::new(), seq, ts)
    }

    #[test]
    fn sort_breaks_timestamp_ties_by_sequence() {
        let user = UserId::new();
        let ts = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        let earlier = ts - chrono::Duration::days(1);

        let mut events = vec![
            recorded(NewEvent::create(user, EntityType::Asset, "b", json!({})), 3, ts),
            recorded(NewEvent::create(user, EntityType::Asset, "a", json!({})), 2, ts),
            recorded(NewEvent::create(user, EntityType::Asset, "c", json!({})), 9, earlier),
        ];
        sort_chronologically(&mut events);

        let order: Vec<_> = events.iter().map(|e| e.entity_id.as_str().to_string()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn currency_change_requires_user_update_with_code() {
        let user = UserId::new();
        let ts = Utc::now();
        let change = recorded(
            NewEvent::update(
                user,
                EntityType::User,
                user.to_string(),
                json!({ "currencyCode": "USD" }),
                json!({ "currencyCode": "EUR" }),
            ),
            1,
            ts,
        );
        let rename = recorded(
            NewEvent::update(user, EntityType::User, user.to_string(), json!({}), json!({ "name": "x" })),
            2,
            ts,
        );
        assert!(change.is_currency_change());
        assert!(!rename.is_currency_change());
    }

    #[test]
    fn text_search_covers_payloads() {
        let user = UserId::new();
        let e = recorded(
            NewEvent::create(user, EntityType::Asset, "a-1", json!({ "name": "Beach House" })),
            1,
            Utc::now(),
        );
        assert!(e.matches_text("beach"));
        assert!(e.matches_text("A-1"));
        assert!(!e.matches_text("car"));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

            #[test]
            fn sorted_events_are_ordered_and_complete(
                stamps in proptest::collection::vec((0i64..5, 0u64..1000), 0..40)
            ) {
                let user = UserId::new();
                let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
                let mut events: Vec<_> = stamps
                    .iter()
                    .map(|(day, seq)| {
                        recorded(
                            NewEvent::create(user, EntityType::Expense, format!("{day}-{seq}"), json!({})),
                            *seq,
                            base + chrono::Duration::days(*day),
                        )
                    })
                    .collect();
                let mut ids_before: Vec<_> = events.iter().map(|e| e.id).collect();

                sort_chronologically(&mut events);

                prop_assert!(events
                    .windows(2)
                    .all(|w| w[0].chronological_key() <= w[1].chronological_key()));
                let mut ids_after: Vec<_> = events.iter().map(|e| e.id).collect();
                ids_before.sort();
                ids_after.sort();
                prop_assert_eq!(ids_before, ids_after);
            }

            #[test]
            fn unknown_entity_tags_survive_the_wire(tag in "[A-Z_]{3,12}") {
                let user = UserId::new();
                let event = recorded(
                    NewEvent::create(user, EntityType::from(tag.as_str()), "x", json!({ "v": 1 })),
                    7,
                    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                );
                let wire = serde_json::to_string(&event).unwrap();
                let back: FinancialEvent = serde_json::from_str(&wire).unwrap();
                prop_assert_eq!(back.entity_type.as_str(), tag.as_str());
                prop_assert_eq!(back, event);
            }
        }
    }
}
