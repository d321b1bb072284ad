// SPDX-License-Identifier: MIT OR Apache-2.0

use cpa_core::{AlgorithmConfig, AlgorithmId, Series};
use cpa_detect::build_detector;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

fn staircase(n: usize, segment: usize) -> Series {
    let values: Vec<f64> = (0..n)
        .map(|i| {
            let level = (i / segment) as f64 * 4.0;
            let jitter = if i % 2 == 0 { 0.25 } else { -0.25 };
            level + jitter
        })
        .collect();
    Series::from_values(&values).expect("bench series should build")
}

fn bench_detectors(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect");
    for &n in &[256_usize, 1024, 4096] {
        let series = staircase(n, n / 8);
        for id in AlgorithmId::ALL {
            let detector = build_detector(&AlgorithmConfig::with_defaults(id))
                .expect("default config should build");
            group.bench_with_input(
                BenchmarkId::new(id.as_str(), n),
                &series,
                |b, series| b.iter(|| detector.detect(series).expect("detect should succeed")),
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_detectors);
criterion_main!(benches);
