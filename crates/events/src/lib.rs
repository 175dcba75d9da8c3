//! Financial event log vocabulary.
//!
//! Every change a producer makes to an asset, liability, income line, expense,
//! cash balance or user preference is documented by exactly one
//! [`FinancialEvent`]. Events are facts: they are appended once and never
//! updated or deleted.

pub mod event;
pub mod kind;
pub mod payload;

pub use event::{sort_chronologically, FinancialEvent, NewEvent};
pub use kind::{ActionType, EntitySubtype, EntityType, UnknownActionType};
