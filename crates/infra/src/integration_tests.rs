//! Integration tests for the reconstruction pipeline.
//!
//! Tests: InMemoryBook → EventStore → SnapshotManager → PointInTimeEngine →
//! ReportService / TrajectoryService
//!
//! Verifies:
//! - Snapshot + delta, full replay and live reads agree
//! - Backfill is idempotent and heals from genesis
//! - Historical currency is resolved from the log

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;

    use finscope_analytics::{FreedomDate, Interval, MetricsPolicy};
    use finscope_core::{Clock, Currency, EntityId, ManualClock, UserId};
    use finscope_ledger::{IncomeLine, IncomeType, Quadrant};

    use crate::event_store::InMemoryEventStore;
    use crate::live::InMemoryBook;
    use crate::point_in_time::{PointInTimeEngine, QueryError, Stores};
    use crate::reports::ReportService;
    use crate::snapshot_store::{InMemorySnapshotStore, SnapshotStore};
    use crate::snapshots::{BackfillReport, SnapshotManager};
    use crate::trajectory::TrajectoryService;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    struct Harness {
        clock: Arc<ManualClock>,
        book: Arc<InMemoryBook>,
        snapshots: Arc<InMemorySnapshotStore>,
        stores: Stores,
    }

    impl Harness {
        fn new(start: DateTime<Utc>) -> Self {
            finscope_observability::init_for_tests();
            let clock = Arc::new(ManualClock::new(start));
            let events = Arc::new(InMemoryEventStore::new(clock.clone()));
            let book = Arc::new(InMemoryBook::new(events.clone(), clock.clone()));
            let snapshots = Arc::new(InMemorySnapshotStore::new());
            let stores = Stores::new(events, snapshots.clone(), book.clone(), clock.clone());
            Self {
                clock,
                book,
                snapshots,
                stores,
            }
        }

        fn engine(&self) -> PointInTimeEngine {
            PointInTimeEngine::new(self.stores.clone())
        }

        fn manager(&self) -> SnapshotManager {
            SnapshotManager::new(self.stores.clone())
        }
    }

    fn passive(id: &str, amount: f64) -> IncomeLine {
        IncomeLine {
            id: EntityId::from(id),
            name: id.to_string(),
            amount,
            income_type: IncomeType::Passive,
            quadrant: Some(Quadrant::Investor),
        }
    }

    /// Asset 1 and liability 2 created in March 2024, liability deleted in
    /// January 2025; queried from 10 July 2025.
    fn house_and_loan() -> (Harness, UserId) {
        let h = Harness::new(at(2024, 3, 15));
        let user = h.book.open_account(Currency::usd()).unwrap().id;
        h.book.upsert_asset(user, "1", "House", 8000.0).unwrap();
        h.book.upsert_liability(user, "2", "Loan", 5000.0).unwrap();
        h.clock.set(at(2025, 1, 15));
        h.book.remove_liability(user, "2").unwrap();
        h.clock.set(at(2025, 7, 10));
        (h, user)
    }

    #[tokio::test]
    async fn reconstructs_the_house_and_loan_history() {
        let (h, user) = house_and_loan();
        let engine = h.engine();

        for with_snapshots in [false, true] {
            if with_snapshots {
                h.manager().backfill(user).await.unwrap();
            }

            let mid_2024 = engine.state_at(user, at(2024, 6, 1)).await.unwrap();
            assert_eq!(mid_2024.assets()[&EntityId::from("1")].value, 8000.0);
            assert_eq!(mid_2024.liabilities()[&EntityId::from("2")].value, 5000.0);

            let mid_2025 = engine.state_at(user, at(2025, 6, 1)).await.unwrap();
            assert_eq!(mid_2025.assets().len(), 1);
            assert!(mid_2025.liabilities().is_empty());
        }
    }

    #[tokio::test]
    async fn target_bound_is_inclusive() {
        let (h, user) = house_and_loan();
        let engine = h.engine();

        let at_delete = engine.state_at(user, at(2025, 1, 15)).await.unwrap();
        assert!(at_delete.liabilities().is_empty());

        let just_before = engine
            .state_at(user, at(2025, 1, 15) - Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(just_before.liabilities().len(), 1);
    }

    #[tokio::test]
    async fn before_account_creation_is_empty() {
        let (h, user) = house_and_loan();
        let state = h.engine().state_at(user, at(2024, 1, 1)).await.unwrap();
        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn live_read_equals_full_replay_at_now() {
        let (h, user) = house_and_loan();
        h.book.set_cash_savings(user, 2500.0).unwrap();
        let engine = h.engine();
        let now = h.clock.now();

        let live = engine.state_at(user, now).await.unwrap();
        let replayed = engine.replay_from_genesis(user, now).await.unwrap();
        assert_eq!(live, replayed);
        assert_eq!(live.net_worth(), 10_500.0);
    }

    #[tokio::test]
    async fn unknown_user_is_reported() {
        let h = Harness::new(at(2024, 3, 15));
        let engine = h.engine();

        let err = engine.state_at(UserId::new(), at(2024, 1, 1)).await.unwrap_err();
        assert!(matches!(err, QueryError::UserNotFound(_)));

        let err = h.manager().backfill(UserId::new()).await.unwrap_err();
        assert!(matches!(err, QueryError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn backfill_is_idempotent_and_starts_after_genesis() {
        let (h, user) = house_and_loan();
        let manager = h.manager();

        assert!(manager.create_genesis(user).await.unwrap());
        assert!(!manager.create_genesis(user).await.unwrap());

        // April 2024 through July 2025.
        let first = manager.backfill(user).await.unwrap();
        assert_eq!(first, BackfillReport { created: 16, skipped: 0 });

        let second = manager.backfill(user).await.unwrap();
        assert_eq!(second, BackfillReport::default());
        assert_eq!(h.snapshots.count(user), 17);

        let listed = h.snapshots.list(user).await.unwrap();
        assert_eq!(listed.first().map(|s| s.date), Some(at(2024, 3, 1)));
        assert_eq!(listed.last().map(|s| s.date), Some(at(2025, 7, 1)));
        assert!(listed.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[tokio::test]
    async fn backfill_without_genesis_starts_at_the_creation_month() {
        let (h, user) = house_and_loan();
        let report = h.manager().backfill(user).await.unwrap();
        assert_eq!(report.created, 17);

        let feb_2025 = h
            .snapshots
            .latest_at_or_before(user, at(2025, 2, 1))
            .await
            .unwrap()
            .unwrap()
            .into_state();
        assert!(feb_2025.liabilities().is_empty());

        let jan_2025 = h
            .snapshots
            .latest_at_or_before(user, at(2025, 1, 1))
            .await
            .unwrap()
            .unwrap()
            .into_state();
        assert_eq!(jan_2025.liabilities().len(), 1);
    }

    #[tokio::test]
    async fn backfill_heals_gaps_after_an_explicit_checkpoint() {
        let (h, user) = house_and_loan();
        let manager = h.manager();

        assert!(manager.checkpoint_month(user, at(2025, 2, 20)).await.unwrap());
        assert!(!manager.checkpoint_month(user, at(2025, 2, 1)).await.unwrap());

        // March through July 2025.
        let report = manager.backfill(user).await.unwrap();
        assert_eq!(report.created, 5);

        let err = manager.checkpoint_month(user, at(2025, 9, 1)).await.unwrap_err();
        assert!(matches!(err, QueryError::Domain(_)));
    }

    #[tokio::test]
    async fn month_boundary_equal_to_now_stays_open() {
        let h = Harness::new(at(2024, 5, 20));
        let user = h.book.open_account(Currency::usd()).unwrap().id;
        let manager = h.manager();
        manager.create_genesis(user).await.unwrap();

        h.clock.set(at(2024, 6, 1));
        h.book.upsert_asset(user, "a", "Bike", 300.0).unwrap();
        assert_eq!(manager.backfill(user).await.unwrap().created, 0);

        h.book.upsert_asset(user, "b", "Boat", 900.0).unwrap();
        h.clock.advance(Duration::hours(1));
        assert_eq!(manager.backfill(user).await.unwrap().created, 1);

        let june = h.engine().state_at(user, at(2024, 6, 1)).await.unwrap();
        assert_eq!(june.total_assets(), 1200.0);
    }

    #[tokio::test]
    async fn genesis_on_a_month_start_keeps_same_instant_events() {
        let h = Harness::new(at(2024, 3, 1));
        let user = h.book.open_account(Currency::usd()).unwrap().id;
        let manager = h.manager();
        let engine = h.engine();

        assert!(!manager.create_genesis(user).await.unwrap());
        h.book.upsert_asset(user, "1", "House", 8000.0).unwrap();
        h.clock.advance(Duration::days(10));

        let target = at(2024, 3, 6);
        let replayed = engine.replay_from_genesis(user, target).await.unwrap();
        assert_eq!(replayed.total_assets(), 8000.0);
        assert_eq!(engine.state_at(user, target).await.unwrap(), replayed);

        assert!(manager.create_genesis(user).await.unwrap());
        let genesis = h.snapshots.latest(user).await.unwrap().unwrap();
        assert_eq!(genesis.date, at(2024, 3, 1));
        assert_eq!(genesis.into_state().total_assets(), 8000.0);
        assert_eq!(engine.state_at(user, target).await.unwrap(), replayed);
    }

    #[tokio::test]
    async fn opening_with_genesis_checkpoints_the_creation_month() {
        let h = Harness::new(at(2024, 3, 15));
        let manager = h.manager();
        let user = h
            .book
            .open_account_with_genesis(Currency::from_code("EUR"), &manager)
            .await
            .unwrap()
            .id;

        assert_eq!(h.snapshots.count(user), 1);
        let genesis = h.snapshots.latest(user).await.unwrap().unwrap().into_state();
        assert_eq!(genesis.currency().code, "EUR");
        assert!(genesis.assets().is_empty());

        h.clock.set(at(2024, 4, 1));
        let on_boundary = h
            .book
            .open_account_with_genesis(Currency::usd(), &manager)
            .await
            .unwrap()
            .id;
        assert_eq!(h.snapshots.count(on_boundary), 0);
    }

    #[tokio::test]
    async fn historical_currency_comes_from_the_first_switch() {
        let h = Harness::new(at(2024, 1, 10));
        let user = h.book.open_account(Currency::usd()).unwrap().id;
        h.book.upsert_asset(user, "a", "Savings bond", 100.0).unwrap();
        h.clock.set(at(2024, 4, 10));
        h.book.change_currency(user, "EUR").unwrap();
        h.clock.set(at(2024, 8, 10));
        h.book.change_currency(user, "GBP").unwrap();
        h.clock.set(at(2024, 9, 1));

        let engine = h.engine();
        let before = engine.replay_from_genesis(user, at(2024, 2, 1)).await.unwrap();
        let between = engine.replay_from_genesis(user, at(2024, 5, 1)).await.unwrap();
        let after = engine.state_at(user, at(2024, 8, 20)).await.unwrap();

        assert_eq!(before.currency().code, "USD");
        assert_eq!(between.currency().code, "EUR");
        assert_eq!(after.currency().code, "GBP");

        h.manager().backfill(user).await.unwrap();
        let from_snapshot = engine.state_at(user, at(2024, 2, 1)).await.unwrap();
        assert_eq!(from_snapshot.currency().code, "USD");
    }

    #[tokio::test]
    async fn report_projects_freedom_date_from_six_month_growth() {
        let h = Harness::new(at(2024, 1, 1));
        let user = h.book.open_account(Currency::usd()).unwrap().id;
        h.book.upsert_expense(user, "rent", "Rent", 1000.0).unwrap();
        h.book.upsert_income(user, passive("div", 100.0)).unwrap();
        h.clock.set(at(2024, 7, 1));
        h.book.upsert_income(user, passive("div", 200.0)).unwrap();
        h.clock.set(at(2024, 7, 15));

        let service = ReportService::new(h.engine(), MetricsPolicy::default());

        let report = service.report_at(user, at(2024, 7, 15)).await.unwrap();
        assert_eq!(
            report.financial_health.freedom_date,
            FreedomDate::Projected {
                date: at(2025, 9, 15),
                months: 14
            }
        );
        assert_eq!(report.financial_health.freedom_gap, 800.0);
        assert_eq!(report.financial_health.runway_months, 0.0);
        assert_eq!(report.cashflow.combined_passive_income, 200.0);
        assert_eq!(report.income_by_quadrant.investor, 200.0);

        let young = service.report_at(user, at(2024, 3, 1)).await.unwrap();
        assert_eq!(young.financial_health.freedom_date, FreedomDate::InsufficientData);
        assert_eq!(young.financial_health.freedom_date_label, "Insufficient Data");
    }

    #[tokio::test]
    async fn trajectory_samples_match_point_queries_and_clamp_to_now() {
        let (h, user) = house_and_loan();
        let service = TrajectoryService::new(h.stores.clone());
        let engine = h.engine();

        let points = service
            .trajectory(user, at(2024, 4, 1), at(2026, 1, 1), Interval::Monthly)
            .await
            .unwrap();

        // April 2024 through July 2025; later samples are past now.
        assert_eq!(points.len(), 16);
        assert_eq!(points[0].net_worth_delta, 0.0);
        for point in &points {
            let state = engine.state_at(user, point.date).await.unwrap();
            assert_eq!(point.net_worth, state.net_worth(), "at {}", point.date);
        }

        let feb_2025 = points.iter().position(|p| p.date == at(2025, 2, 1)).unwrap();
        assert_eq!(points[feb_2025].net_worth_delta, 5000.0);

        assert!(service
            .trajectory(user, at(2025, 8, 1), at(2025, 9, 1), Interval::Weekly)
            .await
            .unwrap()
            .is_empty());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Asset(u8, f64),
        RemoveAsset(u8),
        Liability(u8, f64),
        RemoveLiability(u8),
        Income(u8, f64, u8),
        RemoveIncome(u8),
        Expense(u8, f64),
        Cash(f64),
        Currency(u8),
        Statement(u8),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        let amount = (0u32..50_000).prop_map(|c| f64::from(c) / 4.0);
        prop_oneof![
            (0u8..4, amount.clone()).prop_map(|(i, v)| Op::Asset(i, v)),
            (0u8..4).prop_map(Op::RemoveAsset),
            (0u8..4, amount.clone()).prop_map(|(i, v)| Op::Liability(i, v)),
            (0u8..4).prop_map(Op::RemoveLiability),
            (0u8..4, amount.clone(), 0u8..4).prop_map(|(i, v, t)| Op::Income(i, v, t)),
            (0u8..4).prop_map(Op::RemoveIncome),
            (0u8..4, amount.clone()).prop_map(|(i, v)| Op::Expense(i, v)),
            amount.prop_map(Op::Cash),
            (0u8..3).prop_map(Op::Currency),
            (0u8..2).prop_map(Op::Statement),
        ]
    }

    fn apply_op(book: &InMemoryBook, user: UserId, op: &Op) {
        // Removing a missing entity is rejected by the producer; that is fine here.
        let _ = match op {
            Op::Asset(i, v) => book.upsert_asset(user, format!("a{i}"), "asset", *v),
            Op::RemoveAsset(i) => book.remove_asset(user, format!("a{i}")),
            Op::Liability(i, v) => book.upsert_liability(user, format!("l{i}"), "liability", *v),
            Op::RemoveLiability(i) => book.remove_liability(user, format!("l{i}")),
            Op::Income(i, v, t) => book.upsert_income(
                user,
                IncomeLine {
                    id: EntityId::new(format!("i{i}")),
                    name: "income".into(),
                    amount: *v,
                    income_type: match t {
                        0 => IncomeType::Earned,
                        1 => IncomeType::Passive,
                        2 => IncomeType::Portfolio,
                        _ => IncomeType::Other("ROYALTY".into()),
                    },
                    quadrant: Quadrant::ALL.get(usize::from(*t)).copied(),
                },
            ),
            Op::RemoveIncome(i) => book.remove_income(user, format!("i{i}")),
            Op::Expense(i, v) => book.upsert_expense(user, format!("e{i}"), "expense", *v),
            Op::Cash(v) => book.set_cash_savings(user, *v),
            Op::Currency(c) => book.change_currency(user, ["USD", "EUR", "JPY"][usize::from(*c)]),
            Op::Statement(i) => book.add_income_statement(user, format!("s{i}"), "statement"),
        };
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 64, ..ProptestConfig::default() })]

        #[test]
        fn snapshot_delta_matches_full_replay(
            ops in proptest::collection::vec((0i64..45, arb_op()), 1..60),
            split in 0usize..60,
            probes in proptest::collection::vec(0i64..1000, 1..8),
        ) {
            let start = at(2023, 11, 20);
            let h = Harness::new(start);
            let user = h.book.open_account(Currency::usd()).unwrap().id;
            let engine = h.engine();
            let manager = h.manager();

            runtime().block_on(async {
                manager.create_genesis(user).await.unwrap();

                for (idx, (gap_days, op)) in ops.iter().enumerate() {
                    if idx == split {
                        manager.backfill(user).await.unwrap();
                    }
                    h.clock.advance(Duration::days(*gap_days));
                    apply_op(&h.book, user, op);
                }
                h.clock.advance(Duration::days(1));
                let now = h.clock.now();
                manager.backfill(user).await.unwrap();

                let live = engine.state_at(user, now).await.unwrap();
                let replayed = engine.replay_from_genesis(user, now).await.unwrap();
                prop_assert_eq!(live, replayed);

                for days in &probes {
                    let target = (start + Duration::days(*days)).min(now - Duration::seconds(1));
                    let fast = engine.state_at(user, target).await.unwrap();
                    let slow = engine.replay_from_genesis(user, target).await.unwrap();
                    prop_assert_eq!(fast, slow, "diverged at {}", target);
                }
                Ok(())
            })?;
        }
    }
}
