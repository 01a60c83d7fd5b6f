//! Benchmark: rule evaluation cost per campaign
//!
//! The ads agent evaluates every campaign of every product on each
//! optimization run, and the monitor agent evaluates once per product per
//! health check. Both paths should stay far below the cost of fetching
//! the metrics they evaluate.
//!
//! - `evaluate/*`: condition checks only, no action handlers
//! - `evaluate_and_execute/*`: includes the logging action handlers

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use vaspera::domain::models::{CampaignMetrics, Config, Context, ProductConfig};
use vaspera::services::{ads_domain, MONITOR_DOMAIN};
use vaspera::{Orchestrator, RulesEngine};

const PRODUCT: &str = "vaspera-memory";

fn engine() -> RulesEngine {
    let mut config = Config::default();
    config
        .products
        .insert(PRODUCT.to_string(), ProductConfig::new("VasperaMemory"));
    Orchestrator::build_engine(&config).unwrap()
}

fn campaign(spend: f64, conversions: u64) -> Context {
    CampaignMetrics {
        campaign_id: "bench_1".to_string(),
        campaign_name: "bench".to_string(),
        platform: "google".to_string(),
        product_id: PRODUCT.to_string(),
        spend,
        impressions: 20_000,
        clicks: 400,
        conversions,
        revenue: 120.0,
        frequency: 2.5,
        spend_today: 30.0,
        in_learning_phase: false,
    }
    .to_context()
}

fn bench_evaluate(c: &mut Criterion) {
    let engine = engine();
    let domain = ads_domain(PRODUCT);
    let mut group = c.benchmark_group("evaluate");

    let cases = [
        ("ads_converting", campaign(150.0, 5)),
        ("ads_non_converting", campaign(200.0, 0)),
    ];
    for (name, ctx) in &cases {
        group.bench_with_input(BenchmarkId::new("ads", name), ctx, |b, ctx| {
            b.iter(|| black_box(engine.evaluate(&domain, ctx).len()));
        });
    }

    let health = Context::new()
        .with("error_rate", 6.0)
        .with("response_time_p95", 2500.0)
        .with("uptime", 99.5);
    group.bench_function("monitor/degraded", |b| {
        b.iter(|| black_box(engine.evaluate(MONITOR_DOMAIN, &health).len()));
    });

    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let engine = engine();
    let domain = ads_domain(PRODUCT);
    let mut group = c.benchmark_group("evaluate_batch");

    for size in [10u64, 100, 1000] {
        let contexts: Vec<Context> = (0..size)
            .map(|i| campaign(50.0 + (i % 300) as f64, i % 4))
            .collect();
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &contexts, |b, contexts| {
            b.iter(|| {
                contexts
                    .iter()
                    .map(|ctx| engine.evaluate(&domain, ctx).len())
                    .sum::<usize>()
            });
        });
    }

    group.finish();
}

fn bench_evaluate_and_execute(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let engine = engine();
    let domain = ads_domain(PRODUCT);
    let ctx = campaign(200.0, 0);

    c.bench_function("evaluate_and_execute/ads_non_converting", |b| {
        b.to_async(&runtime)
            .iter(|| async { black_box(engine.evaluate_and_execute(&domain, &ctx).await.len()) });
    });
}

criterion_group!(benches, bench_evaluate, bench_batch, bench_evaluate_and_execute);
criterion_main!(benches);
