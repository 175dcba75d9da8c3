//! `finscope-ledger`: per-user financial state and the pure reducers that
//! fold events into it.
//!
//! Nothing here performs IO. A state is always a derived view: it can be
//! rebuilt from the event log, optionally starting from a hydrated snapshot.

pub mod codec;
pub mod record;
pub mod reducer;
pub mod state;

pub use codec::{hydrate, serialize, CodecError, SerializedState};
pub use record::{BalanceRecord, ExpenseRecord, IncomeLine, IncomeType, Quadrant};
pub use reducer::{reduce, replay};
pub use state::FinancialState;
