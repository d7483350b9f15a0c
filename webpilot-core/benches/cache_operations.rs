//! Benchmark for cache and dispatcher hot paths
//!
//! Run with:
//! ```bash
//! cargo bench --bench cache_operations
//! ```

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::{json, Value};
use tokio::runtime::Runtime;

use webpilot_core::cache::{CacheKey, CacheStore};
use webpilot_core::config::{CacheConfig, DispatcherConfig};
use webpilot_core::dispatcher::ParallelDispatcher;

/// Create Tokio Runtime for async benchmarks
fn rt() -> Runtime {
    tokio::runtime::Runtime::new().unwrap()
}

fn bench_key_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_key");

    let small = json!({ "selector": "h1" });
    let nested = json!({
        "selector": "#results .item",
        "fields": ["title", "price", "url"],
        "options": { "trim": true, "limit": 50, "wait": { "visible": true, "timeout": 5000 } }
    });

    group.bench_function("derive_small", |b| {
        b.iter(|| CacheKey::derive(black_box("webpilot_get_text"), black_box(&small), None));
    });

    group.bench_function("derive_nested", |b| {
        b.iter(|| {
            CacheKey::derive(black_box("webpilot_extract"), black_box(&nested), Some("tab-1"))
        });
    });

    group.finish();
}

fn bench_get_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_get_put");

    for size in [100usize, 1_000, 10_000] {
        let cache: CacheStore<Value> = CacheStore::new(CacheConfig::new(size, Duration::from_secs(300)));
        for i in 0..size {
            cache.put(format!("key-{}", i), json!({ "n": i }), None);
        }

        group.bench_with_input(BenchmarkId::new("get_hit", size), &size, |b, &size| {
            let mut i = 0;
            b.iter(|| {
                i = (i + 1) % size;
                black_box(cache.get(&format!("key-{}", i)))
            });
        });

        group.bench_with_input(BenchmarkId::new("put_evict", size), &size, |b, &size| {
            let mut i = size;
            b.iter(|| {
                i += 1;
                cache.put(format!("key-{}", i), json!({ "n": i }), None);
            });
        });
    }

    group.finish();
}

fn bench_get_or_compute(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_get_or_compute");
    let cache: CacheStore<Value> = CacheStore::default();
    cache.put("warm", json!({ "title": "Example Domain" }), None);
    let cache = &cache;

    group.bench_function("hit", |b| {
        b.to_async(rt()).iter(move || async move {
            let value = cache
                .get_or_compute("warm", || async { Ok::<_, ()>(Value::Null) }, None)
                .await;
            black_box(value)
        });
    });

    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatcher");
    let dispatcher = ParallelDispatcher::new(DispatcherConfig::default());
    let dispatcher = &dispatcher;

    for concurrency in [1usize, 4, 16] {
        group.bench_with_input(
            BenchmarkId::from_parameter(concurrency),
            &concurrency,
            |b, &concurrency| {
                b.to_async(rt()).iter(move || async move {
                    let jobs: Vec<_> = (0..64u32)
                        .map(|i| move || async move { Ok::<_, ()>(i * 2) })
                        .collect();
                    black_box(dispatcher.run_batch(jobs, concurrency).await)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_key_derivation,
    bench_get_put,
    bench_get_or_compute,
    bench_dispatch
);
criterion_main!(benches);
