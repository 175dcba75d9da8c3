//! `finscope-analytics`
//!
//! **Responsibility:** derive financial-health indicators from reconstructed
//! states.
//!
//! This crate never reads storage and never emits events: it takes states
//! (and, for trajectories, an ordered event slice) and returns numbers.

pub mod freedom;
pub mod metrics;
pub mod trajectory;

pub use freedom::{project_freedom_date, FreedomDate};
pub use metrics::{
    calculate, BalanceSheet, Cashflow, FinancialHealth, FinancialReport, IncomeByQuadrant,
    MetricsInput, MetricsPolicy, Ratios, WealthVelocity,
};
pub use trajectory::{build_trajectory, sample_dates, Interval, TrajectoryPoint};

/// Round to 2 decimals for presentation. Non-finite input becomes 0.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value * 100.0).round() / 100.0
}
