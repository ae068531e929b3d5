//! Feature Store Benchmarks
//!
//! Measures upsert throughput for fresh identities and for re-sightings,
//! which dominate a long recording.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use beetle_link::features::{FeatureStore, DEFAULT_CAPACITY};

/// Deterministic id sequence spread over the whole range
fn scattered_ids(count: usize) -> Vec<i64> {
    (0..count)
        .map(|i| ((i as u64 * 7919) % DEFAULT_CAPACITY as u64) as i64)
        .collect()
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("feature_insert");

    for count in [1_000usize, 10_000, 100_000] {
        let ids = scattered_ids(count);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::from_parameter(count), &ids, |b, ids| {
            b.iter(|| {
                let mut store = FeatureStore::new();
                for &id in ids {
                    let _ = store.upsert(black_box(id), 0.1, 0.2, 0.3, 1.0, 0.5, 0.0);
                }
                black_box(store.size())
            });
        });
    }

    group.finish();
}

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("feature_update");
    let ids = scattered_ids(10_000);

    let mut store = FeatureStore::new();
    for &id in &ids {
        let _ = store.upsert(id, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
    }

    group.throughput(Throughput::Elements(ids.len() as u64));
    group.bench_function("resighting", |b| {
        b.iter(|| {
            for &id in &ids {
                let _ = store.upsert(black_box(id), 1.0, 2.0, 3.0, 0.5, 0.5, 0.5);
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_insert, bench_update);
criterion_main!(benches);
