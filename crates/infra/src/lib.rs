//! Infrastructure layer: event log and snapshot storage, the live-state
//! seam, point-in-time reconstruction and the services built on it.

pub mod config;
pub mod event_store;
pub mod live;
pub mod point_in_time;
pub mod reports;
pub mod snapshot_store;
pub mod snapshots;
pub mod trajectory;

#[cfg(test)]
mod integration_tests;

pub use config::{ConfigError, EngineConfig};
pub use point_in_time::{PointInTimeEngine, QueryError, Stores};
pub use reports::ReportService;
pub use snapshots::{BackfillReport, SnapshotManager};
pub use trajectory::TrajectoryService;
