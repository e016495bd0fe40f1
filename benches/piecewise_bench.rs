use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use piecewise_mp::algorithms::common::{sliding_dot_product_fft, sliding_dot_product_naive};
use piecewise_mp::{
    JoinInvoker, PiecewiseConfig, PiecewiseProfile, PrecisionType, Profile, ProfileKind,
    RollingStats,
};

fn series(n: usize, phase: f64) -> Vec<f64> {
    (0..n)
        .map(|i| (i as f64 * 0.1 + phase).sin() + 0.3 * (i as f64 * 0.037).cos())
        .collect()
}

fn bench_sdp_naive_vs_fft(c: &mut Criterion) {
    let mut group = c.benchmark_group("sdp_naive_vs_fft");
    let m = 100;
    for n in [1_000, 5_000, 10_000] {
        let ts = series(n, 0.0);
        let q: Vec<f64> = ts[0..m].to_vec();
        group.bench_with_input(BenchmarkId::new("naive", n), &n, |b, _| {
            b.iter(|| sliding_dot_product_naive(black_box(&q), black_box(&ts)))
        });
        group.bench_with_input(BenchmarkId::new("fft", n), &n, |b, _| {
            b.iter(|| sliding_dot_product_fft(black_box(&q), black_box(&ts)))
        });
    }
    group.finish();
}

fn bench_rolling_stats(c: &mut Criterion) {
    let mut group = c.benchmark_group("rolling_stats");
    for n in [1_000, 10_000] {
        let ts = series(n, 0.0);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| RollingStats::compute(black_box(&ts), 100))
        });
    }
    group.finish();
}

fn bench_self_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("self_join");
    group.sample_size(10);
    let ts = series(4_000, 0.0);
    for precision in [PrecisionType::Double, PrecisionType::Mixed, PrecisionType::Single] {
        let config = PiecewiseConfig::new(64).with_precision(precision);
        let invoker = JoinInvoker::new(&config);
        group.bench_function(precision.as_str(), |b| {
            b.iter(|| {
                let mut profile = Profile::with_len(ProfileKind::NnIndex, 0, 1).unwrap();
                invoker.self_join(black_box(&ts), &mut profile).unwrap();
                profile
            })
        });
    }
    group.finish();
}

fn bench_piecewise_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("piecewise_ingest");
    group.sample_size(10);
    let segments: Vec<Vec<f64>> = (0..6).map(|k| series(1_500, k as f64 * 0.7)).collect();
    group.bench_function("6x1500", |b| {
        b.iter(|| {
            let mut pw = PiecewiseProfile::new(PiecewiseConfig::new(64)).unwrap();
            for s in &segments {
                pw.add_segment(s);
            }
            pw.process_pending().unwrap();
            pw.len()
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_sdp_naive_vs_fft,
    bench_rolling_stats,
    bench_self_join,
    bench_piecewise_ingest
);
criterion_main!(benches);
