//! Metrics calculator.
//!
//! Internal arithmetic runs at full precision; every figure in a
//! [`FinancialReport`] is rounded to 2 decimals on the way out. Each ratio
//! with a possible zero denominator has an explicit zero-case value, so no
//! output is ever NaN or infinite.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use finscope_core::Currency;
use finscope_ledger::{FinancialState, IncomeType, Quadrant};

use crate::freedom::{project_freedom_date, FreedomDate};
use crate::round2;

/// Tunables for zero-case sentinels and the projection horizon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsPolicy {
    /// Runway reported when there are no expenses but some cash.
    pub runway_sentinel_months: f64,
    /// Freedom-date projections at or beyond this are reported as "> 50 Years".
    pub freedom_horizon_months: f64,
}

impl Default for MetricsPolicy {
    fn default() -> Self {
        Self {
            runway_sentinel_months: 999.0,
            freedom_horizon_months: 600.0,
        }
    }
}

/// States a report is computed from.
#[derive(Debug, Clone, Copy)]
pub struct MetricsInput<'a> {
    /// Date the report describes.
    pub date: DateTime<Utc>,
    pub current: &'a FinancialState,
    pub one_month_prior: &'a FinancialState,
    /// `None` when the account is younger than six months at `date`.
    pub six_months_prior: Option<&'a FinancialState>,
    /// Anchor for freedom-date projection.
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSheet {
    pub total_assets: f64,
    pub total_liabilities: f64,
    pub cash_savings: f64,
    pub net_worth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cashflow {
    pub total_income: f64,
    pub earned_income: f64,
    pub passive_income: f64,
    pub portfolio_income: f64,
    pub combined_passive_income: f64,
    pub total_expenses: f64,
    pub net_cashflow: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ratios {
    pub passive_coverage_ratio: f64,
    pub savings_rate: f64,
    pub solvency_ratio: f64,
    pub asset_efficiency: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeByQuadrant {
    pub employee: f64,
    pub self_employed: f64,
    pub business_owner: f64,
    pub investor: f64,
    /// Income lines with no quadrant recorded.
    pub unassigned: f64,
}

impl IncomeByQuadrant {
    pub fn from_state(state: &FinancialState) -> Self {
        let mut out = Self::default();
        for line in state.income_lines().values() {
            let bucket = match line.quadrant {
                Some(Quadrant::Employee) => &mut out.employee,
                Some(Quadrant::SelfEmployed) => &mut out.self_employed,
                Some(Quadrant::BusinessOwner) => &mut out.business_owner,
                Some(Quadrant::Investor) => &mut out.investor,
                None => &mut out.unassigned,
            };
            *bucket += line.amount;
        }
        out
    }

    pub fn rounded(self) -> Self {
        Self {
            employee: round2(self.employee),
            self_employed: round2(self.self_employed),
            business_owner: round2(self.business_owner),
            investor: round2(self.investor),
            unassigned: round2(self.unassigned),
        }
    }
}

/// Month-over-month change in net worth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WealthVelocity {
    pub absolute: f64,
    pub percentage: f64,
}

impl WealthVelocity {
    /// Percentage is relative to `|prior|`; from a zero base only the sign
    /// is meaningful and the percentage is ±100 (0 when nothing changed).
    pub fn between(prior_net_worth: f64, current_net_worth: f64) -> Self {
        let absolute = current_net_worth - prior_net_worth;
        let percentage = if prior_net_worth == 0.0 {
            if absolute > 0.0 {
                100.0
            } else if absolute < 0.0 {
                -100.0
            } else {
                0.0
            }
        } else {
            absolute / prior_net_worth.abs() * 100.0
        };
        Self { absolute, percentage }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialHealth {
    pub wealth_velocity: WealthVelocity,
    /// Expenses minus combined passive income (positive = shortfall).
    pub freedom_gap: f64,
    /// Months of expenses covered by cash savings.
    pub runway_months: f64,
    pub freedom_date: FreedomDate,
    pub freedom_date_label: String,
}

/// Point-in-time financial snapshot handed to downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialReport {
    pub date: DateTime<Utc>,
    pub currency: Currency,
    pub balance_sheet: BalanceSheet,
    pub cashflow: Cashflow,
    pub ratios: Ratios,
    pub income_by_quadrant: IncomeByQuadrant,
    pub financial_health: FinancialHealth,
}

/// `numerator / denominator * 100`, or 0 when the denominator is not positive.
pub fn percentage_of(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator * 100.0
    } else {
        0.0
    }
}

pub fn freedom_gap(state: &FinancialState) -> f64 {
    state.total_expenses() - state.combined_passive_income()
}

pub fn runway_months(cash_savings: f64, total_expenses: f64, policy: &MetricsPolicy) -> f64 {
    if total_expenses > 0.0 {
        cash_savings / total_expenses
    } else if cash_savings > 0.0 {
        policy.runway_sentinel_months
    } else {
        0.0
    }
}

/// Combined passive income over total assets; cash is not productive capital.
pub fn asset_efficiency(state: &FinancialState) -> f64 {
    percentage_of(state.combined_passive_income(), state.total_assets())
}

pub fn calculate(input: MetricsInput<'_>, policy: &MetricsPolicy) -> FinancialReport {
    let state = input.current;

    let total_assets = state.total_assets();
    let total_liabilities = state.total_liabilities();
    let cash_savings = state.cash_savings();
    let net_worth = state.net_worth();

    let total_income = state.total_income();
    let passive_income = state.income_of_type(&IncomeType::Passive);
    let portfolio_income = state.income_of_type(&IncomeType::Portfolio);
    let combined_passive = state.combined_passive_income();
    let total_expenses = state.total_expenses();
    let net_cashflow = total_income - total_expenses;

    let velocity = WealthVelocity::between(input.one_month_prior.net_worth(), net_worth);
    let freedom_date = project_freedom_date(
        combined_passive,
        input.six_months_prior.map(FinancialState::combined_passive_income),
        total_expenses,
        input.now,
        policy.freedom_horizon_months,
    );

    FinancialReport {
        date: input.date,
        currency: state.currency().clone(),
        balance_sheet: BalanceSheet {
            total_assets: round2(total_assets),
            total_liabilities: round2(total_liabilities),
            cash_savings: round2(cash_savings),
            net_worth: round2(net_worth),
        },
        cashflow: Cashflow {
            total_income: round2(total_income),
            earned_income: round2(state.income_of_type(&IncomeType::Earned)),
            passive_income: round2(passive_income),
            portfolio_income: round2(portfolio_income),
            combined_passive_income: round2(combined_passive),
            total_expenses: round2(total_expenses),
            net_cashflow: round2(net_cashflow),
        },
        ratios: Ratios {
            passive_coverage_ratio: round2(percentage_of(combined_passive, total_expenses)),
            savings_rate: round2(percentage_of(net_cashflow, total_income)),
            solvency_ratio: round2(percentage_of(total_liabilities, total_assets + cash_savings)),
            asset_efficiency: round2(asset_efficiency(state)),
        },
        income_by_quadrant: IncomeByQuadrant::from_state(state).rounded(),
        financial_health: FinancialHealth {
            wealth_velocity: WealthVelocity {
                absolute: round2(velocity.absolute),
                percentage: round2(velocity.percentage),
            },
            freedom_gap: round2(total_expenses - combined_passive),
            runway_months: round2(runway_months(cash_savings, total_expenses, policy)),
            freedom_date_label: freedom_date.label(),
            freedom_date,
        },
    }
}
