//! Benchmarks for admission checks against the in-memory store.
//!
//! Target: a single consume well under 1ms, including CAS retries under contention.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use std::time::Duration;
use switchyard::admission::{
    AdmissionController, BucketKey, MemoryBucketStore, PolicyTable, RateLimitPolicy,
};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn bench_consume_single_key(c: &mut Criterion) {
    let rt = runtime();
    let controller = AdmissionController::new(
        Arc::new(MemoryBucketStore::new()),
        PolicyTable::builtin(),
    );

    c.bench_function("admission_consume_single_key", |b| {
        b.iter(|| {
            rt.block_on(controller.consume(
                black_box("chat:send"),
                black_box("bench-user"),
                black_box("enterprise"),
            ))
            .unwrap()
        })
    });
}

fn bench_consume_many_callers(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("admission_consume_callers");

    for callers in [10usize, 1_000, 100_000] {
        let controller = AdmissionController::new(
            Arc::new(MemoryBucketStore::new()),
            PolicyTable::builtin(),
        );
        let ids: Vec<String> = (0..callers).map(|i| format!("caller-{}", i)).collect();
        let mut next = 0usize;

        group.bench_with_input(BenchmarkId::from_parameter(callers), &callers, |b, _| {
            b.iter(|| {
                next = (next + 1) % ids.len();
                rt.block_on(controller.consume("tasks:create", &ids[next], "pro"))
                    .unwrap()
            })
        });
    }
    group.finish();
}

fn bench_denied_path(c: &mut Criterion) {
    let rt = runtime();
    let controller = AdmissionController::new(
        Arc::new(MemoryBucketStore::new()),
        PolicyTable::empty(),
    );
    let policy = RateLimitPolicy::per_window(1, Duration::from_secs(3600));
    let key = BucketKey::new("chat:send", "drained", "free");
    rt.block_on(controller.consume_with_policy(&key, &policy))
        .unwrap();

    c.bench_function("admission_consume_denied", |b| {
        b.iter(|| {
            rt.block_on(controller.consume_with_policy(black_box(&key), &policy))
                .unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_consume_single_key,
    bench_consume_many_callers,
    bench_denied_path
);
criterion_main!(benches);
