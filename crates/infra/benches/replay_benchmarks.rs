use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chrono::{DateTime, Duration, TimeZone, Utc};
use finscope_core::{Clock, Currency, ManualClock, UserId};
use finscope_infra::event_store::{EventStore, InMemoryEventStore};
use finscope_infra::live::InMemoryBook;
use finscope_infra::snapshot_store::InMemorySnapshotStore;
use finscope_infra::{PointInTimeEngine, SnapshotManager, Stores};
use finscope_ledger::{replay, FinancialState};
use std::sync::Arc;
use tokio::runtime::Runtime;

struct Fixture {
    stores: Stores,
    events: Arc<InMemoryEventStore>,
    user: UserId,
    target: DateTime<Utc>,
}

/// One user with `months` of history, roughly `per_month` events each.
fn fixture(rt: &Runtime, months: i64, per_month: i64) -> Fixture {
    let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::new(start));
    let events = Arc::new(InMemoryEventStore::new(clock.clone()));
    let book = Arc::new(InMemoryBook::new(events.clone(), clock.clone()));
    let stores = Stores::new(events.clone(), Arc::new(InMemorySnapshotStore::new()), book.clone(), clock.clone());

    let user = book.open_account(Currency::usd()).unwrap().id;
    let step = Duration::hours(24 * 30 / per_month.max(1));
    for month in 0..months {
        for i in 0..per_month {
            let id = format!("a{}", i % 20);
            book.upsert_asset(user, id, "asset", (month * 100 + i) as f64).unwrap();
            clock.advance(step);
        }
    }
    clock.advance(Duration::days(1));

    let target = clock.now() - Duration::hours(12);
    rt.block_on(SnapshotManager::new(stores.clone()).backfill(user)).unwrap();

    Fixture {
        stores,
        events,
        user,
        target,
    }
}

fn bench_state_at(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("state_at");

    for months in [12i64, 60, 120].iter() {
        let fx = fixture(&rt, *months, 30);
        let engine = PointInTimeEngine::new(fx.stores.clone());
        group.throughput(Throughput::Elements((*months * 30) as u64));

        group.bench_with_input(BenchmarkId::new("snapshot_plus_delta", months), months, |b, _| {
            b.iter(|| rt.block_on(engine.state_at(black_box(fx.user), fx.target)).unwrap());
        });

        group.bench_with_input(BenchmarkId::new("full_replay", months), months, |b, _| {
            b.iter(|| rt.block_on(engine.replay_from_genesis(black_box(fx.user), fx.target)).unwrap());
        });
    }

    group.finish();
}

fn bench_pure_fold(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let fx = fixture(&rt, 60, 30);
    let log = rt
        .block_on(fx.events.events_between(fx.user, None, fx.target))
        .unwrap();

    let mut group = c.benchmark_group("reducer");
    group.throughput(Throughput::Elements(log.len() as u64));
    group.bench_function("replay_1800_events", |b| {
        b.iter(|| replay(FinancialState::empty(Currency::usd()), black_box(&log)));
    });
    group.finish();
}

criterion_group!(benches, bench_state_at, bench_pure_fold);
criterion_main!(benches);
