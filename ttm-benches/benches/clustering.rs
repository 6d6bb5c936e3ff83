//! Clusterer benchmarks.
//!
//! Runs each registered clusterer on well-separated synthetic blobs, so the
//! timings reflect the algorithms rather than hard convergence cases.
#![expect(
    missing_docs,
    reason = "Criterion macros generate items without doc comments"
)]
#![expect(
    clippy::shadow_reuse,
    reason = "Criterion bench_with_input closures rebind parameter names"
)]
use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use ttm_benches::{
    blobs::{BlobConfig, Blobs},
    error::BenchSetupError,
    params::MethodBenchParams,
};
use ttm_providers_dense::clusterer_registry;

const SEED: u64 = 42;
const DIMENSIONS: usize = 5;
const CENTRES: usize = 6;
const ROW_COUNTS: &[usize] = &[200, 1_000];

/// Methods and options, as typed after `ttm cluster`.
const METHODS: &[(&str, &[&str])] = &[
    ("kmeans", &["--clusters", "6"]),
    ("aggl", &["--clusters", "6", "--linkage", "average"]),
    ("hdbscan", &["--min-cluster-size", "20"]),
];

fn clusterers_impl(c: &mut Criterion) -> Result<(), BenchSetupError> {
    let mut group = c.benchmark_group("cluster");
    group.sample_size(10);

    for &rows in ROW_COUNTS {
        let blobs = Blobs::generate(&BlobConfig {
            rows,
            dimensions: DIMENSIONS,
            centres: CENTRES,
            seed: SEED,
        })?;
        for &(method, args) in METHODS {
            let params = MethodBenchParams { method, args, rows };
            let clusterer = clusterer_registry().resolve(method, &params.owned_args())?;
            group.bench_with_input(
                BenchmarkId::from_parameter(&params),
                blobs.vectors(),
                |b, vectors| {
                    b.iter(|| black_box(clusterer.cluster(vectors)));
                },
            );
        }
    }

    group.finish();
    Ok(())
}

fn clusterers(c: &mut Criterion) {
    if let Err(err) = clusterers_impl(c) {
        panic!("cluster benchmark setup failed: {err}");
    }
}

criterion_group!(benches, clusterers);
criterion_main!(benches);
