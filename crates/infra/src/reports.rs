//! Financial-health reports for a single date.

use chrono::{DateTime, Utc};
use tracing::instrument;

use finscope_analytics::{calculate, FinancialReport, MetricsInput, MetricsPolicy};
use finscope_core::{calendar::add_months, UserId};

use crate::point_in_time::{PointInTimeEngine, QueryError};

#[derive(Debug, Clone)]
pub struct ReportService {
    engine: PointInTimeEngine,
    policy: MetricsPolicy,
}

impl ReportService {
    pub fn new(engine: PointInTimeEngine, policy: MetricsPolicy) -> Self {
        Self { engine, policy }
    }

    /// Report as of `date`, compared against one and six months earlier.
    ///
    /// The six-month comparison is skipped when the account did not exist
    /// yet at that point, which makes the freedom date "Insufficient Data".
    #[instrument(skip(self), fields(user_id = %user_id, date = %date), err)]
    pub async fn report_at(&self, user_id: UserId, date: DateTime<Utc>) -> Result<FinancialReport, QueryError> {
        let stores = self.engine.stores();
        let account = stores.require_account(user_id).await?;

        let current = self.engine.state_at(user_id, date).await?;
        let one_month_prior = self.engine.state_at(user_id, add_months(date, -1)?).await?;

        let six_months_back = add_months(date, -6)?;
        let six_months_prior = if six_months_back >= account.created_at {
            Some(self.engine.state_at(user_id, six_months_back).await?)
        } else {
            None
        };

        Ok(calculate(
            MetricsInput {
                date,
                current: &current,
                one_month_prior: &one_month_prior,
                six_months_prior: six_months_prior.as_ref(),
                now: stores.clock.now(),
            },
            &self.policy,
        ))
    }
}
