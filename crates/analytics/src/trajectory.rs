//! Trajectory sampling.
//!
//! Given a base state and the events after it (oldest first), walk a cursor
//! across the sample dates and fold each event exactly once. Nothing is
//! re-scanned per sample.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use finscope_core::calendar::add_months;
use finscope_events::FinancialEvent;
use finscope_ledger::{FinancialState, IncomeType};

use crate::metrics::{asset_efficiency, freedom_gap, IncomeByQuadrant, WealthVelocity};
use crate::round2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Daily,
    Weekly,
    Monthly,
}

impl Interval {
    /// The `n`-th sample after `start`.
    ///
    /// Monthly steps are computed from `start` rather than chained, so a
    /// series starting on the 31st does not drift to the 28th.
    fn nth_after(self, start: DateTime<Utc>, n: i64) -> Option<DateTime<Utc>> {
        match self {
            Interval::Daily => start.checked_add_signed(Duration::days(n)),
            Interval::Weekly => start.checked_add_signed(Duration::weeks(n)),
            Interval::Monthly => add_months(start, n).ok(),
        }
    }
}

impl core::str::FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Interval::Daily),
            "weekly" => Ok(Interval::Weekly),
            "monthly" => Ok(Interval::Monthly),
            other => Err(format!("unknown interval: {other}")),
        }
    }
}

/// Sample instants from `start` through `end` inclusive.
pub fn sample_dates(start: DateTime<Utc>, end: DateTime<Utc>, interval: Interval) -> Vec<DateTime<Utc>> {
    let mut out = Vec::new();
    let mut n = 0;
    while let Some(date) = interval.nth_after(start, n) {
        if date > end {
            break;
        }
        out.push(date);
        n += 1;
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectoryPoint {
    pub date: DateTime<Utc>,
    pub net_worth: f64,
    /// Change since the previous sample (0 for the first sample).
    pub net_worth_delta: f64,
    pub passive_income: f64,
    pub portfolio_income: f64,
    pub total_expenses: f64,
    pub freedom_gap: f64,
    /// Net-worth change since the previous sample, in percent.
    pub wealth_velocity: f64,
    pub asset_efficiency: f64,
    pub net_cashflow: f64,
    pub total_income: f64,
    pub income_by_quadrant: IncomeByQuadrant,
    pub currency_symbol: String,
}

/// Build the series.
///
/// `events` must be sorted chronologically and contain only events after the
/// instant `base` represents; events past the last sample are ignored.
pub fn build_trajectory(
    base: FinancialState,
    events: &[FinancialEvent],
    samples: &[DateTime<Utc>],
) -> Vec<TrajectoryPoint> {
    let mut state = base;
    let mut cursor = 0;
    let mut previous_net_worth: Option<f64> = None;
    let mut points = Vec::with_capacity(samples.len());

    for &date in samples {
        while let Some(event) = events.get(cursor) {
            if event.timestamp > date {
                break;
            }
            state = state.apply(event);
            cursor += 1;
        }

        let net_worth = state.net_worth();
        let velocity = WealthVelocity::between(previous_net_worth.unwrap_or(net_worth), net_worth);
        let total_income = state.total_income();
        let total_expenses = state.total_expenses();

        points.push(TrajectoryPoint {
            date,
            net_worth: round2(net_worth),
            net_worth_delta: round2(velocity.absolute),
            passive_income: round2(state.income_of_type(&IncomeType::Passive)),
            portfolio_income: round2(state.income_of_type(&IncomeType::Portfolio)),
            total_expenses: round2(total_expenses),
            freedom_gap: round2(freedom_gap(&state)),
            wealth_velocity: round2(velocity.percentage),
            asset_efficiency: round2(asset_efficiency(&state)),
            net_cashflow: round2(total_income - total_expenses),
            total_income: round2(total_income),
            income_by_quadrant: IncomeByQuadrant::from_state(&state).rounded(),
            currency_symbol: state.currency().symbol.clone(),
        });
        previous_net_worth = Some(net_worth);
    }

    points
}
