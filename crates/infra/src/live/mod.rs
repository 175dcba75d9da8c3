//! Seams to the producer side: the user directory and the live entity
//! tables.
//!
//! The reconstruction engine never writes through these traits. It reads the
//! live tables only for "now or later" queries and reads account metadata to
//! know where a user's history starts.

pub mod in_memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use finscope_core::{Currency, EntityId, UserId};
use finscope_ledger::FinancialState;

use crate::event_store::EventStoreError;

pub use in_memory::InMemoryBook;

/// Account metadata owned by the user directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: UserId,
    pub created_at: DateTime<Utc>,
    pub preferred_currency: Currency,
}

#[derive(Debug, Error)]
pub enum LiveStateError {
    #[error("live state unavailable: {0}")]
    Unavailable(String),

    #[error("unknown user: {0}")]
    UnknownUser(UserId),

    #[error("unknown entity {entity_id} for user {user_id}")]
    UnknownEntity { user_id: UserId, entity_id: EntityId },

    #[error("failed to encode entity fields: {0}")]
    Encode(String),

    #[error(transparent)]
    EventStore(#[from] EventStoreError),
}

#[async_trait::async_trait]
pub trait LiveStateSource: Send + Sync {
    async fn account(&self, user_id: UserId) -> Result<Option<UserAccount>, LiveStateError>;

    /// Current state read straight from the live tables.
    async fn current_state(&self, user_id: UserId) -> Result<FinancialState, LiveStateError>;
}

#[async_trait::async_trait]
impl<S> LiveStateSource for Arc<S>
where
    S: LiveStateSource + ?Sized,
{
    async fn account(&self, user_id: UserId) -> Result<Option<UserAccount>, LiveStateError> {
        (**self).account(user_id).await
    }

    async fn current_state(&self, user_id: UserId) -> Result<FinancialState, LiveStateError> {
        (**self).current_state(user_id).await
    }
}
