//! Freedom-date projection.
//!
//! Estimates when combined passive income (PASSIVE + PORTFOLIO) will cover
//! monthly expenses, extrapolating the growth observed over the last six
//! months.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use finscope_core::calendar::add_months;

/// Number of months between the "prior" and "current" passive income samples.
pub const GROWTH_WINDOW_MONTHS: f64 = 6.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FreedomDate {
    /// Passive income already covers expenses.
    Achieved,
    NoPassiveIncome,
    /// No state six months back (account younger than the growth window).
    InsufficientData,
    /// Passive income did not grow over the window.
    StagnantOrDeclining,
    /// Projection lands at or beyond the horizon.
    BeyondHorizon,
    Projected { date: DateTime<Utc>, months: u32 },
}

impl FreedomDate {
    pub fn label(&self) -> String {
        match self {
            FreedomDate::Achieved => "Achieved".to_string(),
            FreedomDate::NoPassiveIncome => "No Passive Income".to_string(),
            FreedomDate::InsufficientData => "Insufficient Data".to_string(),
            FreedomDate::StagnantOrDeclining => "Stagnant/Declining".to_string(),
            FreedomDate::BeyondHorizon => "> 50 Years".to_string(),
            FreedomDate::Projected { date, .. } => date.format("%b %Y").to_string(),
        }
    }
}

impl core::fmt::Display for FreedomDate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.label())
    }
}

/// Monthly compound growth rate taking `prior` to `current` over the window.
pub fn monthly_growth_rate(current: f64, prior: f64) -> f64 {
    (current / prior).powf(1.0 / GROWTH_WINDOW_MONTHS) - 1.0
}

/// Project the freedom date.
///
/// - `current_passive` (C): combined passive income now
/// - `prior_passive` (P): combined passive income six months back, `None`
///   when that state does not exist
/// - `expenses` (E): current monthly expenses
///
/// With a positive base the growth is compounded: `r = (C/P)^(1/6) - 1` and
/// `months = ln(E/C) / ln(1 + r)`. From a zero base the growth is linear at
/// `C/6` per month.
pub fn project_freedom_date(
    current_passive: f64,
    prior_passive: Option<f64>,
    expenses: f64,
    now: DateTime<Utc>,
    horizon_months: f64,
) -> FreedomDate {
    if current_passive >= expenses {
        return FreedomDate::Achieved;
    }
    if current_passive <= 0.0 {
        return FreedomDate::NoPassiveIncome;
    }
    let Some(prior) = prior_passive else {
        return FreedomDate::InsufficientData;
    };

    let months = if prior > 0.0 {
        let rate = monthly_growth_rate(current_passive, prior);
        if rate <= 0.0 {
            return FreedomDate::StagnantOrDeclining;
        }
        (expenses / current_passive).ln() / (1.0 + rate).ln()
    } else {
        let increment = current_passive / GROWTH_WINDOW_MONTHS;
        (expenses - current_passive) / increment
    };

    if !months.is_finite() || months >= horizon_months {
        return FreedomDate::BeyondHorizon;
    }

    let rounded = months.round().max(0.0) as u32;
    match add_months(now, i64::from(rounded)) {
        Ok(date) => FreedomDate::Projected { date, months: rounded },
        Err(_) => FreedomDate::BeyondHorizon,
    }
}
