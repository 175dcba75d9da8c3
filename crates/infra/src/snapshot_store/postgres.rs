//! Postgres-backed snapshot store.
//!
//! States are stored as JSONB. The unique key `(user_id, snapshot_date)`
//! plus `ON CONFLICT DO NOTHING` makes concurrent backfills of the same month
//! converge on whichever insert landed first.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use std::sync::Arc;
use tracing::instrument;

use finscope_core::UserId;
use finscope_ledger::SerializedState;

use super::{ensure_aligned, Snapshot, SnapshotStore, SnapshotStoreError};

#[derive(Debug, Clone)]
pub struct PostgresSnapshotStore {
    pool: Arc<PgPool>,
}

impl PostgresSnapshotStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait::async_trait]
impl SnapshotStore for PostgresSnapshotStore {
    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn latest_at_or_before(
        &self,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<Snapshot>, SnapshotStoreError> {
        let row = sqlx::query(
            r#"
            SELECT user_id, snapshot_date, state
            FROM snapshots
            WHERE user_id = $1 AND snapshot_date <= $2
            ORDER BY snapshot_date DESC
            LIMIT 1
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(at)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("latest_at_or_before", e))?;

        row.map(|r| decode_row(&r)).transpose()
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn latest(&self, user_id: UserId) -> Result<Option<Snapshot>, SnapshotStoreError> {
        let row = sqlx::query(
            r#"
            SELECT user_id, snapshot_date, state
            FROM snapshots
            WHERE user_id = $1
            ORDER BY snapshot_date DESC
            LIMIT 1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("latest_snapshot", e))?;

        row.map(|r| decode_row(&r)).transpose()
    }

    #[instrument(skip(self, snapshots), fields(batch = snapshots.len()), err)]
    async fn insert_missing(&self, snapshots: Vec<Snapshot>) -> Result<usize, SnapshotStoreError> {
        if snapshots.is_empty() {
            return Ok(0);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let mut inserted = 0u64;
        for snapshot in &snapshots {
            ensure_aligned(snapshot)?;
            let state = snapshot.state.to_json()?;

            let result = sqlx::query(
                r#"
                INSERT INTO snapshots (user_id, snapshot_date, state)
                VALUES ($1, $2, $3)
                ON CONFLICT (user_id, snapshot_date) DO NOTHING
                "#,
            )
            .bind(snapshot.user_id.as_uuid())
            .bind(snapshot.date)
            .bind(&state)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_snapshot", e))?;

            inserted += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(inserted as usize)
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn list(&self, user_id: UserId) -> Result<Vec<Snapshot>, SnapshotStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, snapshot_date, state
            FROM snapshots
            WHERE user_id = $1
            ORDER BY snapshot_date ASC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_snapshots", e))?;

        rows.iter().map(decode_row).collect()
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> SnapshotStoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            SnapshotStoreError::Unavailable(format!("database error in {operation}: {}", db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            SnapshotStoreError::Unavailable(format!("connection pool closed in {operation}"))
        }
        _ => SnapshotStoreError::Unavailable(format!("sqlx error in {operation}: {err}")),
    }
}

fn decode_row(row: &sqlx::postgres::PgRow) -> Result<Snapshot, SnapshotStoreError> {
    let row = SnapshotRow::from_row(row)
        .map_err(|e| SnapshotStoreError::Unavailable(format!("failed to deserialize snapshot row: {e}")))?;
    Ok(Snapshot {
        user_id: UserId::from_uuid(row.user_id),
        date: row.snapshot_date,
        state: SerializedState::from_json(row.state)?,
    })
}

#[derive(Debug)]
struct SnapshotRow {
    user_id: uuid::Uuid,
    snapshot_date: DateTime<Utc>,
    state: serde_json::Value,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for SnapshotRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(SnapshotRow {
            user_id: row.try_get("user_id")?,
            snapshot_date: row.try_get("snapshot_date")?,
            state: row.try_get("state")?,
        })
    }
}
