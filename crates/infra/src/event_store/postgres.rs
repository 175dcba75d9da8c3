//! Postgres-backed event log.
//!
//! Producers that persist entity rows in Postgres record the matching event
//! with [`PostgresEventStore::append_in`], inside their own transaction, so
//! the mutation and its event commit or roll back together.
//!
//! ## Error Mapping
//!
//! | SQLx Error | EventStoreError |
//! |------------|-----------------|
//! | Database (check/not-null violation `23514`/`23502`) | `InvalidAppend` |
//! | Database (other) | `Unavailable` |
//! | PoolClosed, Io, Tls, timeouts | `Unavailable` |
//! | ColumnDecode / unparsable tags | `Decode` |

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use std::sync::Arc;
use tracing::instrument;

use finscope_core::{Clock, EntityId, EventId, SystemClock, UserId};
use finscope_events::{ActionType, EntitySubtype, EntityType, FinancialEvent, NewEvent};

use super::query::{EventFilter, EventQuery, EventQueryResult, Pagination};
use super::r#trait::{EventStore, EventStoreError};

const EVENT_COLUMNS: &str = r#"
    event_id,
    sequence,
    occurred_at,
    user_id,
    action_type,
    entity_type,
    entity_subtype,
    entity_id,
    before_value,
    after_value
"#;

/// Postgres-backed append-only event log.
///
/// The table carries no UPDATE or DELETE path; `sequence` is a `BIGSERIAL`
/// so ties on `occurred_at` replay in insertion order.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: Arc<PgPool>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for PostgresEventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresEventStore").finish_non_exhaustive()
    }
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock))
    }

    pub fn with_clock(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool: Arc::new(pool),
            clock,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Record an event inside the caller's transaction.
    ///
    /// The caller commits; if it rolls back, the event never existed.
    #[instrument(
        skip(self, tx, event),
        fields(
            user_id = %event.user_id,
            entity_type = %event.entity_type,
            action = %event.action_type
        ),
        err
    )]
    pub async fn append_in(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        event: NewEvent,
    ) -> Result<FinancialEvent, EventStoreError> {
        let id = EventId::new();
        let occurred_at = self.clock.now();

        let row = sqlx::query(
            r#"
            INSERT INTO events (
                event_id,
                occurred_at,
                user_id,
                action_type,
                entity_type,
                entity_subtype,
                entity_id,
                before_value,
                after_value
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING sequence
            "#,
        )
        .bind(id.as_uuid())
        .bind(occurred_at)
        .bind(event.user_id.as_uuid())
        .bind(event.action_type.as_str())
        .bind(event.entity_type.as_str())
        .bind(event.entity_subtype.as_ref().map(EntitySubtype::as_str))
        .bind(event.entity_id.as_str())
        .bind(event.before_value.as_ref())
        .bind(event.after_value.as_ref())
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_event", e))?;

        let sequence: i64 = row
            .try_get("sequence")
            .map_err(|e| EventStoreError::Decode(format!("failed to read sequence: {e}")))?;

        Ok(event.into_recorded(id, sequence as u64, occurred_at))
    }
}

#[async_trait::async_trait]
impl EventStore for PostgresEventStore {
    async fn append(&self, event: NewEvent) -> Result<FinancialEvent, EventStoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        let recorded = self.append_in(&mut tx, event).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(recorded)
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn events_between(
        &self,
        user_id: UserId,
        after: Option<DateTime<Utc>>,
        until: DateTime<Utc>,
    ) -> Result<Vec<FinancialEvent>, EventStoreError> {
        let sql = format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM events
            WHERE user_id = $1
                AND ($2::timestamptz IS NULL OR occurred_at > $2)
                AND occurred_at <= $3
            ORDER BY occurred_at ASC, sequence ASC
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.as_uuid())
            .bind(after)
            .bind(until)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("events_between", e))?;

        let events = decode_rows(&rows)?;
        tracing::debug!(event_count = events.len(), "loaded replay window");
        Ok(events)
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn earliest_currency_change(
        &self,
        user_id: UserId,
    ) -> Result<Option<FinancialEvent>, EventStoreError> {
        let sql = format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM events
            WHERE user_id = $1
                AND entity_type = 'USER'
                AND action_type = 'UPDATE'
                AND COALESCE(after_value ->> 'currencyCode', '') <> ''
            ORDER BY occurred_at ASC, sequence ASC
            LIMIT 1
            "#
        );
        let row = sqlx::query(&sql)
            .bind(user_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("earliest_currency_change", e))?;

        row.map(|r| decode_row(&r)).transpose()
    }
}

#[async_trait::async_trait]
impl EventQuery for PostgresEventStore {
    #[instrument(skip(self, filter), fields(user_id = %user_id), err)]
    async fn query(
        &self,
        user_id: UserId,
        filter: EventFilter,
        pagination: Pagination,
    ) -> Result<EventQueryResult, EventStoreError> {
        let entity_type = filter.entity_type.as_ref().map(|t| t.as_str().to_string());
        let entity_id = filter.entity_id.as_ref().map(|id| id.as_str().to_string());
        let needle = filter
            .text_search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        // $6 is matched with position() so user input is never a LIKE pattern.
        const PREDICATE: &str = r#"
            user_id = $1
                AND ($2::text IS NULL OR entity_type = $2)
                AND ($3::text IS NULL OR entity_id = $3)
                AND ($4::timestamptz IS NULL OR occurred_at >= $4)
                AND ($5::timestamptz IS NULL OR occurred_at <= $5)
                AND ($6::text IS NULL
                    OR position($6 IN lower(entity_id)) > 0
                    OR position($6 IN lower(COALESCE(entity_subtype, ''))) > 0
                    OR position($6 IN lower(COALESCE(before_value::text, ''))) > 0
                    OR position($6 IN lower(COALESCE(after_value::text, ''))) > 0)
        "#;

        let count_sql = format!("SELECT COUNT(*) AS total FROM events WHERE {PREDICATE}");
        let count_row = sqlx::query(&count_sql)
            .bind(user_id.as_uuid())
            .bind(entity_type.as_deref())
            .bind(entity_id.as_deref())
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(needle.as_deref())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_events", e))?;

        let total: i64 = count_row
            .try_get("total")
            .map_err(|e| EventStoreError::Decode(format!("failed to read count: {e}")))?;

        let page_sql = format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM events
            WHERE {PREDICATE}
            ORDER BY occurred_at DESC, sequence DESC
            LIMIT $7 OFFSET $8
            "#
        );
        let rows = sqlx::query(&page_sql)
            .bind(user_id.as_uuid())
            .bind(entity_type.as_deref())
            .bind(entity_id.as_deref())
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(needle.as_deref())
            .bind(i64::from(pagination.limit))
            .bind(i64::from(pagination.offset))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("query_events", e))?;

        let total = total.max(0) as u64;
        Ok(EventQueryResult {
            events: decode_rows(&rows)?,
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
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE user_id = $1 AND event_id = $2");
        let row = sqlx::query(&sql)
            .bind(user_id.as_uuid())
            .bind(event_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_event_by_id", e))?;

        row.map(|r| decode_row(&r)).transpose()
    }
}

/// Map SQLx errors to EventStoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> EventStoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23514") | Some("23502") => EventStoreError::InvalidAppend(msg),
                _ => EventStoreError::Unavailable(msg),
            }
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            EventStoreError::Decode(format!("{operation}: {err}"))
        }
        sqlx::Error::PoolClosed => {
            EventStoreError::Unavailable(format!("connection pool closed in {operation}"))
        }
        _ => EventStoreError::Unavailable(format!("sqlx error in {operation}: {err}")),
    }
}

fn decode_rows(rows: &[sqlx::postgres::PgRow]) -> Result<Vec<FinancialEvent>, EventStoreError> {
    rows.iter().map(decode_row).collect()
}

fn decode_row(row: &sqlx::postgres::PgRow) -> Result<FinancialEvent, EventStoreError> {
    EventRow::from_row(row)
        .map_err(|e| EventStoreError::Decode(format!("failed to deserialize event row: {e}")))?
        .try_into()
}

// SQLx row types

#[derive(Debug)]
struct EventRow {
    event_id: uuid::Uuid,
    sequence: i64,
    occurred_at: DateTime<Utc>,
    user_id: uuid::Uuid,
    action_type: String,
    entity_type: String,
    entity_subtype: Option<String>,
    entity_id: String,
    before_value: Option<JsonValue>,
    after_value: Option<JsonValue>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for EventRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(EventRow {
            event_id: row.try_get("event_id")?,
            sequence: row.try_get("sequence")?,
            occurred_at: row.try_get("occurred_at")?,
            user_id: row.try_get("user_id")?,
            action_type: row.try_get("action_type")?,
            entity_type: row.try_get("entity_type")?,
            entity_subtype: row.try_get("entity_subtype")?,
            entity_id: row.try_get("entity_id")?,
            before_value: row.try_get("before_value")?,
            after_value: row.try_get("after_value")?,
        })
    }
}

impl TryFrom<EventRow> for FinancialEvent {
    type Error = EventStoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let action_type: ActionType = row
            .action_type
            .parse()
            .map_err(|e| EventStoreError::Decode(format!("event {}: {e}", row.event_id)))?;

        Ok(FinancialEvent {
            id: EventId::from_uuid(row.event_id),
            sequence: row.sequence as u64,
            timestamp: row.occurred_at,
            action_type,
            entity_type: EntityType::from(row.entity_type),
            entity_subtype: row.entity_subtype.map(EntitySubtype::new),
            before_value: row.before_value,
            after_value: row.after_value,
            user_id: UserId::from_uuid(row.user_id),
            entity_id: EntityId::new(row.entity_id),
        })
    }
}
