//! Seeds a two-year history in memory and prints what the engine derives
//! from it: the audit listing, a report and a monthly trajectory.

use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, TimeZone, Utc};

use finscope_analytics::Interval;
use finscope_core::{Clock, Currency, EntityId, ManualClock};
use finscope_infra::event_store::{EventFilter, EventQuery, InMemoryEventStore};
use finscope_infra::live::InMemoryBook;
use finscope_infra::snapshot_store::InMemorySnapshotStore;
use finscope_infra::{EngineConfig, PointInTimeEngine, ReportService, SnapshotManager, Stores, TrajectoryService};
use finscope_ledger::{IncomeLine, IncomeType, Quadrant};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    finscope_observability::init();

    let config = EngineConfig::from_env().context("loading engine configuration")?;
    if config.database_url.is_some() {
        tracing::warn!("the demo always runs against in-memory stores");
    }

    let start = Utc
        .with_ymd_and_hms(2023, 1, 5, 9, 0, 0)
        .single()
        .context("invalid start date")?;
    let clock = Arc::new(ManualClock::new(start));
    let events = Arc::new(InMemoryEventStore::new(clock.clone()));
    let book = Arc::new(InMemoryBook::new(events.clone(), clock.clone()));
    let stores = Stores::new(
        events.clone(),
        Arc::new(InMemorySnapshotStore::new()),
        book.clone(),
        clock.clone(),
    );

    let account = book
        .open_account_with_genesis(Currency::usd(), &SnapshotManager::new(stores.clone()))
        .await?;
    let user = account.id;

    book.upsert_expense(user, "rent", "Rent", 1_800.0)?;
    book.upsert_expense(user, "food", "Groceries", 600.0)?;
    book.upsert_liability(user, "car", "Car loan", 14_000.0)?;
    book.set_cash_savings(user, 3_000.0)?;
    book.add_income_statement(user, "stmt-2023", "2023 statement")?;
    book.upsert_income(
        user,
        IncomeLine {
            id: EntityId::from("salary"),
            name: "Salary".into(),
            amount: 5_200.0,
            income_type: IncomeType::Earned,
            quadrant: Some(Quadrant::Employee),
        },
    )?;

    for month in 1..=24 {
        clock.advance(Duration::days(30));
        let portfolio = 40.0 * f64::from(month);
        book.upsert_asset(user, "index", "Index fund", 1_500.0 * f64::from(month))?;
        book.upsert_income(
            user,
            IncomeLine {
                id: EntityId::from("dividends"),
                name: "Dividends".into(),
                amount: portfolio,
                income_type: IncomeType::Portfolio,
                quadrant: Some(Quadrant::Investor),
            },
        )?;
        book.upsert_liability(user, "car", "Car loan", (14_000.0 - 550.0 * f64::from(month)).max(0.0))?;
        book.set_cash_savings(user, 3_000.0 + 250.0 * f64::from(month))?;
    }
    book.change_currency(user, "EUR")?;
    let now = clock.now();

    let listing = events
        .query(user, EventFilter::default(), config.pagination(Some(5), None))
        .await?;
    println!("{}", serde_json::to_string_pretty(&listing)?);

    let engine = PointInTimeEngine::new(stores.clone());
    let report = ReportService::new(engine, config.metrics)
        .report_at(user, now)
        .await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    let points = TrajectoryService::new(stores)
        .trajectory(user, start, now, Interval::Monthly)
        .await?;
    println!("{}", serde_json::to_string_pretty(&points)?);

    Ok(())
}
