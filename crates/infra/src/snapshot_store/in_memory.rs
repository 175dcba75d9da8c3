use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use finscope_core::UserId;
use finscope_ledger::SerializedState;

use super::{ensure_aligned, Snapshot, SnapshotStore, SnapshotStoreError};

type Timeline = BTreeMap<DateTime<Utc>, SerializedState>;

/// In-memory snapshot store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    timelines: RwLock<HashMap<UserId, Timeline>>,
}

fn poisoned() -> SnapshotStoreError {
    SnapshotStoreError::Unavailable("lock poisoned".to_string())
}

fn to_snapshot(user_id: UserId, (date, state): (&DateTime<Utc>, &SerializedState)) -> Snapshot {
    Snapshot {
        user_id,
        date: *date,
        state: state.clone(),
    }
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of snapshots held for `user_id`.
    pub fn count(&self, user_id: UserId) -> usize {
        self.timelines
            .read()
            .map(|t| t.get(&user_id).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn latest_at_or_before(
        &self,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<Snapshot>, SnapshotStoreError> {
        let timelines = self.timelines.read().map_err(|_| poisoned())?;
        Ok(timelines
            .get(&user_id)
            .and_then(|t| t.range(..=at).next_back())
            .map(|entry| to_snapshot(user_id, entry)))
    }

    async fn latest(&self, user_id: UserId) -> Result<Option<Snapshot>, SnapshotStoreError> {
        let timelines = self.timelines.read().map_err(|_| poisoned())?;
        Ok(timelines
            .get(&user_id)
            .and_then(|t| t.iter().next_back())
            .map(|entry| to_snapshot(user_id, entry)))
    }

    async fn insert_missing(&self, snapshots: Vec<Snapshot>) -> Result<usize, SnapshotStoreError> {
        for snapshot in &snapshots {
            ensure_aligned(snapshot)?;
        }

        let mut timelines = self.timelines.write().map_err(|_| poisoned())?;
        let mut inserted = 0;
        for snapshot in snapshots {
            let timeline = timelines.entry(snapshot.user_id).or_default();
            if let std::collections::btree_map::Entry::Vacant(slot) = timeline.entry(snapshot.date) {
                slot.insert(snapshot.state);
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn list(&self, user_id: UserId) -> Result<Vec<Snapshot>, SnapshotStoreError> {
        let timelines = self.timelines.read().map_err(|_| poisoned())?;
        Ok(timelines
            .get(&user_id)
            .map(|t| t.iter().map(|entry| to_snapshot(user_id, entry)).collect())
            .unwrap_or_default())
    }
}
