//! Benchmarks for kubedemo request accounting and metrics exposition.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use kubedemo::config::MetricsConfig;
use kubedemo::metrics::{AppMetrics, ItemOperation};
use std::time::Duration;

fn metrics() -> AppMetrics {
    AppMetrics::new(&MetricsConfig::default()).unwrap()
}

fn benchmark_record_request(c: &mut Criterion) {
    let metrics = metrics();
    let http = metrics.http();

    c.bench_function("record_request", |b| {
        b.iter(|| {
            http.record_request(
                black_box("GET"),
                black_box("/api/items"),
                black_box(200),
                Duration::from_micros(250),
            );
        })
    });
}

fn benchmark_request_tracker(c: &mut Criterion) {
    let metrics = metrics();
    let http = metrics.http();

    c.bench_function("request_tracker", |b| {
        b.iter(|| {
            let tracker = http.start_request();
            tracker.finish(black_box("POST"), black_box("/api/items"), black_box(201));
        })
    });
}

fn benchmark_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for routes in [1usize, 10, 100] {
        let metrics = metrics();
        for i in 0..routes {
            let route = format!("/route/{i}");
            metrics
                .http()
                .record_request("GET", &route, 200, Duration::from_millis(3));
        }
        metrics.business().record_item(ItemOperation::Read);

        group.throughput(Throughput::Elements(routes as u64));
        group.bench_function(format!("{routes}_routes"), |b| {
            b.iter(|| black_box(metrics.snapshot().unwrap()))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_record_request,
    benchmark_request_tracker,
    benchmark_snapshot
);
criterion_main!(benches);
