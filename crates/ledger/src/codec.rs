//! Snapshot codec.
//!
//! Keyed containers are written as ordered `(key, value)` pair lists; cash
//! savings and currency are written verbatim. `hydrate(serialize(x)) == x`
//! holds for every state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use finscope_core::{Currency, EntityId};

use crate::record::{BalanceRecord, ExpenseRecord, IncomeLine};
use crate::state::FinancialState;

/// Wire form of a [`FinancialState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedState {
    pub assets: Vec<(EntityId, BalanceRecord)>,
    pub liabilities: Vec<(EntityId, BalanceRecord)>,
    pub income_lines: Vec<(EntityId, IncomeLine)>,
    pub expenses: Vec<(EntityId, ExpenseRecord)>,
    pub cash_savings: f64,
    pub currency: Currency,
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode state: {0}")]
    Encode(String),

    #[error("failed to decode state: {0}")]
    Decode(String),
}

fn pairs<T: Clone>(map: &BTreeMap<EntityId, T>) -> Vec<(EntityId, T)> {
    map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

pub fn serialize(state: &FinancialState) -> SerializedState {
    SerializedState {
        assets: pairs(state.assets()),
        liabilities: pairs(state.liabilities()),
        income_lines: pairs(state.income_lines()),
        expenses: pairs(state.expenses()),
        cash_savings: state.cash_savings(),
        currency: state.currency().clone(),
    }
}

/// Rebuild a state from its wire form. A repeated key keeps its last value.
pub fn hydrate(serialized: SerializedState) -> FinancialState {
    FinancialState::from_parts(
        serialized.assets.into_iter().collect(),
        serialized.liabilities.into_iter().collect(),
        serialized.income_lines.into_iter().collect(),
        serialized.expenses.into_iter().collect(),
        serialized.cash_savings,
        serialized.currency,
    )
}

impl SerializedState {
    pub fn to_json(&self) -> Result<JsonValue, CodecError> {
        serde_json::to_value(self).map_err(|e| CodecError::Encode(e.to_string()))
    }

    pub fn from_json(value: JsonValue) -> Result<Self, CodecError> {
        serde_json::from_value(value).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

impl From<&FinancialState> for SerializedState {
    fn from(state: &FinancialState) -> Self {
        serialize(state)
    }
}

impl From<SerializedState> for FinancialState {
    fn from(serialized: SerializedState) -> Self {
        hydrate(serialized)
    }
}
