//! `finscope-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model, currencies and the clock seam.

pub mod calendar;
pub mod clock;
pub mod currency;
pub mod error;
pub mod id;

pub use clock::{Clock, ManualClock, SystemClock};
pub use currency::Currency;
pub use error::{DomainError, DomainResult};
pub use id::{EntityId, EventId, UserId};
