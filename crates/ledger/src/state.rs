//! Per-user financial state.

use std::collections::BTreeMap;
use std::sync::Arc;

use finscope_core::{Currency, EntityId};

use crate::record::{BalanceRecord, ExpenseRecord, IncomeLine, IncomeType};

pub(crate) type Keyed<T> = Arc<BTreeMap<EntityId, T>>;

/// Aggregate view of one user's finances.
///
/// Each keyed container sits behind its own `Arc`, so cloning a state is
/// cheap and a reducer only copies the container an event actually changes.
/// A state is never mutated in place by the reducer API; see
/// [`reduce`](crate::reduce).
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialState {
    pub(crate) assets: Keyed<BalanceRecord>,
    pub(crate) liabilities: Keyed<BalanceRecord>,
    pub(crate) income_lines: Keyed<IncomeLine>,
    pub(crate) expenses: Keyed<ExpenseRecord>,
    pub(crate) cash_savings: f64,
    pub(crate) currency: Currency,
}

impl FinancialState {
    /// Genesis state: nothing recorded yet.
    pub fn empty(currency: Currency) -> Self {
        Self {
            assets: Arc::default(),
            liabilities: Arc::default(),
            income_lines: Arc::default(),
            expenses: Arc::default(),
            cash_savings: 0.0,
            currency,
        }
    }

    /// Assemble a state from already materialized containers (live reads).
    pub fn from_parts(
        assets: BTreeMap<EntityId, BalanceRecord>,
        liabilities: BTreeMap<EntityId, BalanceRecord>,
        income_lines: BTreeMap<EntityId, IncomeLine>,
        expenses: BTreeMap<EntityId, ExpenseRecord>,
        cash_savings: f64,
        currency: Currency,
    ) -> Self {
        Self {
            assets: Arc::new(assets),
            liabilities: Arc::new(liabilities),
            income_lines: Arc::new(income_lines),
            expenses: Arc::new(expenses),
            cash_savings,
            currency,
        }
    }

    pub fn assets(&self) -> &BTreeMap<EntityId, BalanceRecord> {
        &self.assets
    }

    pub fn liabilities(&self) -> &BTreeMap<EntityId, BalanceRecord> {
        &self.liabilities
    }

    pub fn income_lines(&self) -> &BTreeMap<EntityId, IncomeLine> {
        &self.income_lines
    }

    pub fn expenses(&self) -> &BTreeMap<EntityId, ExpenseRecord> {
        &self.expenses
    }

    pub fn cash_savings(&self) -> f64 {
        self.cash_savings
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    /// Replace the currency label, keeping every amount as is.
    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn total_assets(&self) -> f64 {
        self.assets.values().map(|a| a.value).sum()
    }

    pub fn total_liabilities(&self) -> f64 {
        self.liabilities.values().map(|l| l.value).sum()
    }

    /// Assets minus liabilities plus cash savings.
    pub fn net_worth(&self) -> f64 {
        self.total_assets() - self.total_liabilities() + self.cash_savings
    }

    pub fn total_income(&self) -> f64 {
        self.income_lines.values().map(|i| i.amount).sum()
    }

    pub fn income_of_type(&self, income_type: &IncomeType) -> f64 {
        self.income_lines
            .values()
            .filter(|i| &i.income_type == income_type)
            .map(|i| i.amount)
            .sum()
    }

    /// PASSIVE + PORTFOLIO income.
    pub fn combined_passive_income(&self) -> f64 {
        self.income_lines
            .values()
            .filter(|i| i.is_freedom_income())
            .map(|i| i.amount)
            .sum()
    }

    pub fn total_expenses(&self) -> f64 {
        self.expenses.values().map(|e| e.amount).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
            && self.liabilities.is_empty()
            && self.income_lines.is_empty()
            && self.expenses.is_empty()
            && self.cash_savings == 0.0
    }
}

impl Default for FinancialState {
    fn default() -> Self {
        Self::empty(Currency::default())
    }
}
