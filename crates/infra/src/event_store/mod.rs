//! Append-only financial event log.
//!
//! [`EventStore`] is the write path and the replay read path; [`EventQuery`]
//! is the paginated listing used by audit views.

pub mod in_memory;
pub mod postgres;
pub mod query;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use query::{EventFilter, EventQuery, EventQueryResult, Pagination};
pub use r#trait::{EventStore, EventStoreError};
