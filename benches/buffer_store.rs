//! Criterion benchmarks for the ingestion hot path.
//!
//! Readings arrive every couple of seconds on the real kit, so these are about
//! headroom: append with eviction, full snapshot copies at capacity, and the
//! validator on a wire payload.
//!
//! Run with: cargo bench --bench buffer_store

use calor_daq::calorimetry::HeatSample;
use calor_daq::core::{Calorimeter, Control};
use calor_daq::data::buffer::BufferStore;
use calor_daq::experiment::EffectiveReading;
use calor_daq::reading;
use calor_daq::simulator::ProbeRig;
use calor_daq::units::UnitValues;
use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn effective(c: f64) -> EffectiveReading {
    EffectiveReading {
        timestamp: Utc::now(),
        cold: UnitValues::from_celsius(c),
        hot: UnitValues::from_celsius(c + 70.0),
        mixture: UnitValues::from_celsius(c + 20.0),
    }
}

/// Append into a full store so every write evicts.
fn buffer_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_append");
    group.throughput(Throughput::Elements(1));

    for capacity in [100_usize, 1_000, 10_000] {
        let mut store = BufferStore::new(capacity);
        for i in 0..capacity {
            store.append(effective(i as f64), HeatSample::ZERO);
        }
        let row = effective(10.0);
        group.bench_with_input(BenchmarkId::new("evicting", capacity), &capacity, |b, _| {
            b.iter(|| store.append(black_box(row), HeatSample::ZERO));
        });
    }

    group.finish();
}

/// Snapshot cost at capacity, which the presentation side pays every poll.
fn snapshot_copy(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for capacity in [100_usize, 1_000] {
        let mut cal = Calorimeter::new(
            BufferStore::new(capacity),
            Default::default(),
            Default::default(),
        );
        let mut rig = ProbeRig::new(1);
        for _ in 0..capacity {
            let _ = cal.ingest_payload(&rig.next_payload(), Utc::now());
        }
        let _ = cal.apply(Control::Lock, Utc::now());

        group.bench_with_input(BenchmarkId::new("copy", capacity), &capacity, |b, _| {
            b.iter(|| black_box(cal.snapshot()));
        });
        let snapshot = cal.snapshot();
        group.bench_with_input(BenchmarkId::new("rows", capacity), &capacity, |b, _| {
            b.iter(|| black_box(snapshot.rows()));
        });
    }

    group.finish();
}

fn validate_payload(c: &mut Criterion) {
    let payload = ProbeRig::new(3).next_payload();
    c.bench_function("validate_payload", |b| {
        b.iter(|| reading::validate(black_box(&payload), Utc::now()));
    });
}

criterion_group!(benches, buffer_append, snapshot_copy, validate_payload);
criterion_main!(benches);
