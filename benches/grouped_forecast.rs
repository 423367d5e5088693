//! Grouped forecasting benchmarks comparing sequential and pooled dispatch.

use anofox_batch::core::GroupedBuffer;
use anofox_batch::engine::{self, CVConfig};
use anofox_batch::models::baseline::{
    HistoricAverage, SeasonalNaive, SimpleMovingAverage, WindowAverage,
};
use anofox_batch::models::BoxedForecaster;
use anofox_batch::parallel::{self, RayonPool, WorkerPool};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn generate_panel(n_groups: usize, len: usize) -> GroupedBuffer {
    let series: Vec<Vec<f64>> = (0..n_groups)
        .map(|g| {
            (0..len)
                .map(|t| {
                    g as f64 + 10.0 * (2.0 * std::f64::consts::PI * t as f64 / 7.0).sin()
                        + (t as f64 * 0.37).cos()
                })
                .collect()
        })
        .collect();
    GroupedBuffer::from_series(&series)
}

fn models() -> Vec<BoxedForecaster> {
    vec![
        Box::new(SeasonalNaive::new(7)),
        Box::new(WindowAverage::new(7)),
        Box::new(HistoricAverage::new()),
        Box::new(SimpleMovingAverage::new(28)),
    ]
}

fn bench_forecast(c: &mut Criterion) {
    let sizes = [100, 1000, 10000];
    let models = models();
    let pool = RayonPool::global();
    let n_jobs = pool.num_threads();
    let mut group = c.benchmark_group("forecast");

    for size in sizes {
        let buffer = generate_panel(size, 120);

        group.bench_with_input(BenchmarkId::new("sequential", size), &buffer, |b, buf| {
            b.iter(|| {
                black_box(
                    engine::forecast(buf, &models, None, 14, None, &[80.0, 95.0], false, false)
                        .unwrap(),
                )
            })
        });

        group.bench_with_input(BenchmarkId::new("rayon", size), &buffer, |b, buf| {
            b.iter(|| {
                black_box(
                    parallel::forecast(
                        &pool, n_jobs, buf, &models, None, 14, None, &[80.0, 95.0], false,
                    )
                    .unwrap(),
                )
            })
        });
    }
    group.finish();
}

fn bench_cross_validation(c: &mut Criterion) {
    let sizes = [100, 1000];
    let models = models();
    let pool = RayonPool::global();
    let n_jobs = pool.num_threads();
    let config = CVConfig::from_windows(7, 4).with_step_size(7);
    let mut group = c.benchmark_group("cross_validation");

    for size in sizes {
        let buffer = generate_panel(size, 120);

        group.bench_with_input(BenchmarkId::new("sequential", size), &buffer, |b, buf| {
            b.iter(|| {
                black_box(engine::cross_validation(buf, &models, &config, &[], false, false).unwrap())
            })
        });

        group.bench_with_input(BenchmarkId::new("rayon", size), &buffer, |b, buf| {
            b.iter(|| {
                black_box(
                    parallel::cross_validation(&pool, n_jobs, buf, &models, &config, &[], false)
                        .unwrap(),
                )
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_forecast, bench_cross_validation);
criterion_main!(benches);
