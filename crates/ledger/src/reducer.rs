//! Reducer engine: fold one event into a state.
//!
//! Dispatch is a closed `match` on [`EntityType`] with a pass-through arm for
//! kinds this build does not know. Handlers never fail: a malformed event
//! (e.g. an upsert with no `after_value`) leaves the state unchanged.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use finscope_core::{Currency, EntityId};
use finscope_events::{payload, ActionType, EntityType, FinancialEvent};

use crate::record::{BalanceRecord, ExpenseRecord, IncomeLine, IncomeType, Quadrant};
use crate::state::{FinancialState, Keyed};

/// Pure reducer: returns the state after `event`, leaving `state` untouched.
pub fn reduce(state: &FinancialState, event: &FinancialEvent) -> FinancialState {
    state.clone().apply(event)
}

/// Fold an already ordered sequence of events.
///
/// Callers are responsible for chronological order; see
/// [`finscope_events::sort_chronologically`].
pub fn replay<'a, I>(initial: FinancialState, events: I) -> FinancialState
where
    I: IntoIterator<Item = &'a FinancialEvent>,
{
    events.into_iter().fold(initial, |state, event| state.apply(event))
}

impl FinancialState {
    /// Owned fold step. Only the container the event touches is copied, and
    /// only if another state still shares it.
    pub fn apply(mut self, event: &FinancialEvent) -> Self {
        match &event.entity_type {
            EntityType::Asset => {
                let change = keyed_change(event, balance_record);
                commit(&mut self.assets, &event.entity_id, change);
            }
            EntityType::Liability => {
                let change = keyed_change(event, balance_record);
                commit(&mut self.liabilities, &event.entity_id, change);
            }
            EntityType::Income => {
                // Statement containers are structural, not income.
                if !event.is_income_statement() {
                    let change = keyed_change(event, income_line);
                    commit(&mut self.income_lines, &event.entity_id, change);
                }
            }
            EntityType::Expense => {
                let change = keyed_change(event, expense_record);
                commit(&mut self.expenses, &event.entity_id, change);
            }
            EntityType::CashSavings => {
                if let Some(amount) = cash_amount(event) {
                    self.cash_savings = amount;
                }
            }
            EntityType::User => {
                if let Some(currency) = currency_change(event) {
                    self.currency = currency;
                }
            }
            EntityType::Unknown(_) => {}
        }
        self
    }
}

enum Change<T> {
    Upsert(T),
    Remove,
    Skip,
}

fn after_value(event: &FinancialEvent) -> Option<&JsonValue> {
    event.after_value.as_ref().filter(|v| !v.is_null())
}

fn keyed_change<T>(
    event: &FinancialEvent,
    build: impl FnOnce(&FinancialEvent, &JsonValue) -> T,
) -> Change<T> {
    match event.action_type {
        ActionType::Create | ActionType::Update => match after_value(event) {
            Some(after) => Change::Upsert(build(event, after)),
            None => Change::Skip,
        },
        ActionType::Delete => Change::Remove,
    }
}

fn commit<T: Clone>(container: &mut Keyed<T>, key: &EntityId, change: Change<T>) {
    match change {
        Change::Upsert(record) => {
            Arc::make_mut(container).insert(key.clone(), record);
        }
        Change::Remove => {
            if container.contains_key(key) {
                Arc::make_mut(container).remove(key);
            }
        }
        Change::Skip => {}
    }
}

fn name_of(after: &JsonValue) -> String {
    payload::string(after, "name").unwrap_or_default().to_string()
}

fn balance_record(event: &FinancialEvent, after: &JsonValue) -> BalanceRecord {
    BalanceRecord {
        id: event.entity_id.clone(),
        name: name_of(after),
        value: payload::number(after, "value").unwrap_or(0.0),
    }
}

fn expense_record(event: &FinancialEvent, after: &JsonValue) -> ExpenseRecord {
    ExpenseRecord {
        id: event.entity_id.clone(),
        name: name_of(after),
        amount: payload::number(after, "amount").unwrap_or(0.0),
    }
}

fn income_line(event: &FinancialEvent, after: &JsonValue) -> IncomeLine {
    let income_type = payload::string(after, "type")
        .map(IncomeType::from)
        .or_else(|| event.entity_subtype.as_ref().map(|s| IncomeType::from(s.as_str())))
        .unwrap_or(IncomeType::Earned);

    IncomeLine {
        id: event.entity_id.clone(),
        name: name_of(after),
        amount: payload::number(after, "amount").unwrap_or(0.0),
        income_type,
        quadrant: payload::string(after, "quadrant").and_then(Quadrant::parse),
    }
}

/// Cash savings is a single scalar per user, not keyed by entity.
fn cash_amount(event: &FinancialEvent) -> Option<f64> {
    if !event.action_type.is_upsert() {
        return None;
    }
    after_value(event).and_then(|after| payload::number(after, "amount"))
}

fn currency_change(event: &FinancialEvent) -> Option<Currency> {
    if event.action_type != ActionType::Update {
        return None;
    }
    after_value(event)
        .and_then(|after| payload::string(after, "currencyCode"))
        .map(Currency::from_code)
}
