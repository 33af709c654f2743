// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Rigor Kernel Metric Benchmarks
// ─────────────────────────────────────────────────────────────────────
//! Criterion benchmarks for the metric engine, bootstrap resampling and
//! multiple-comparison correction.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use rigor_core::{CorrectionEngine, MetricEngine, NativeBackend, StatBackend, TestData, TestKind};
use rigor_types::{CorrectionMethod, KappaInterval, RigorConfig, Tail};

fn labels(n: usize) -> (Vec<String>, Vec<String>) {
    let truth: Vec<String> = (0..n)
        .map(|i| if i % 4 == 0 { "pos" } else { "neg" }.to_string())
        .collect();
    let pred: Vec<String> = (0..n)
        .map(|i| if i % 4 == 0 || i % 11 == 0 { "pos" } else { "neg" }.to_string())
        .collect();
    (pred, truth)
}

// ── MetricEngine.classification() ───────────────────────────────────

fn bench_point_estimates(c: &mut Criterion) {
    let engine = MetricEngine::new(RigorConfig {
        kappa_interval: KappaInterval::Analytic,
        bootstrap_resamples: 100,
        ..Default::default()
    });
    let (pred, truth) = labels(1000);
    c.bench_function("classification_1000x100_analytic_kappa", |b| {
        b.iter(|| engine.classification(black_box(&pred), black_box(&truth), Some("pos")))
    });
}

fn bench_bootstrap(c: &mut Criterion) {
    let (pred, truth) = labels(500);
    for parallel in [false, true] {
        let engine = MetricEngine::new(RigorConfig {
            parallel_resampling: parallel,
            ..Default::default()
        });
        let name = if parallel {
            "bootstrap_500x1000_parallel"
        } else {
            "bootstrap_500x1000_sequential"
        };
        c.bench_function(name, |b| {
            b.iter(|| engine.classification(black_box(&pred), black_box(&truth), Some("pos")))
        });
    }
}

// ── CorrectionEngine.adjust() ───────────────────────────────────────

fn bench_correction(c: &mut Criterion) {
    let p: Vec<f64> = (0..200).map(|i| ((i * 37) % 200) as f64 / 400.0).collect();
    for method in [CorrectionMethod::Holm, CorrectionMethod::FdrBh] {
        let Ok(engine) = CorrectionEngine::new(method, 0.05) else {
            return;
        };
        c.bench_function(&format!("correction_{method}_200"), |b| {
            b.iter(|| engine.adjust(black_box(&p)))
        });
    }
}

// ── NativeBackend.run() ─────────────────────────────────────────────

fn bench_mann_whitney(c: &mut Criterion) {
    let data = TestData::TwoSample {
        a: (0..200).map(|i| (i % 17) as f64).collect(),
        b: (0..200).map(|i| (i % 13) as f64 + 0.5).collect(),
    };
    c.bench_function("mann_whitney_200x200", |b| {
        b.iter(|| NativeBackend.run(&TestKind::MannWhitneyU, black_box(&data), Tail::TwoSided, 0.95))
    });
}

criterion_group!(
    benches,
    bench_point_estimates,
    bench_bootstrap,
    bench_correction,
    bench_mann_whitney,
);
criterion_main!(benches);
