//! Reconciliation benchmarks
//!
//! Measures log-record ingestion throughput at various roster sizes.
//!
//! Run with: cargo bench --bench reconcile

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sideline::config::Settings;
use sideline::world::player::{PlayerId, PlayerLifecycle, PlayerStatus};
use sideline::world::record::LineRecord;
use sideline::world::World;

fn status_record(index: u64, connected_secs: u64) -> LineRecord {
    LineRecord::PlayerStatus(PlayerStatus {
        id: PlayerId(76561198000000000 + index),
        name: format!("player{}", index),
        client_index: index as u32 + 1,
        connected: Duration::from_secs(connected_secs),
        ping_ms: 40 + (index % 60) as u32,
        loss: 0,
        state: PlayerLifecycle::Active,
    })
}

fn world_with_roster(count: u64) -> World {
    let parser = |_: &str, _: DateTime<Utc>| None::<LineRecord>;
    let start = Utc.timestamp_opt(1_600_000_000, 0).unwrap();
    let mut world = World::new(Settings::default(), parser, start);
    for index in 0..count {
        world.apply_record(&status_record(index, 60));
    }
    world
}

fn bench_status_updates(c: &mut Criterion) {
    let mut group = c.benchmark_group("status_updates");

    for roster in [6u64, 24, 100] {
        group.throughput(Throughput::Elements(roster));
        group.bench_with_input(BenchmarkId::from_parameter(roster), &roster, |b, &roster| {
            let mut world = world_with_roster(roster);
            let records: Vec<LineRecord> =
                (0..roster).map(|index| status_record(index, 120)).collect();

            b.iter(|| {
                for record in &records {
                    world.apply_record(black_box(record));
                }
            });
        });
    }

    group.finish();
}

fn bench_name_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("name_resolution");

    for roster in [24u64, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(roster), &roster, |b, &roster| {
            let world = world_with_roster(roster);
            let needle = format!("player{}", roster - 1);

            b.iter(|| world.session().find_id_for_name(black_box(&needle)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_status_updates, bench_name_resolution);
criterion_main!(benches);
