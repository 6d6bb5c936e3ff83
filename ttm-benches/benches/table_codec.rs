//! Table codec benchmarks.
//!
//! Measures serialising an enriched table with a vector column and parsing
//! it back, which bounds the per-stage overhead of the TSV interchange
//! format.
#![expect(
    missing_docs,
    reason = "Criterion macros generate items without doc comments"
)]
#![expect(
    clippy::shadow_reuse,
    reason = "Criterion bench_with_input closures rebind parameter names"
)]
use std::hint::black_box;
use std::io::Cursor;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use ttm_benches::{
    blobs::{BlobConfig, Blobs},
    error::BenchSetupError,
    params::BlobBenchParams,
};
use ttm_core::Table;

const SEED: u64 = 42;
const DIMENSIONS: usize = 64;
const ROW_COUNTS: &[usize] = &[1_000, 10_000];

fn table_codec_impl(c: &mut Criterion) -> Result<(), BenchSetupError> {
    let mut group = c.benchmark_group("table_codec");
    group.sample_size(20);

    for &rows in ROW_COUNTS {
        let table = Blobs::generate(&BlobConfig {
            rows,
            dimensions: DIMENSIONS,
            centres: 8,
            seed: SEED,
        })?
        .to_table()?;
        let mut encoded = Vec::new();
        table.write(&mut encoded)?;
        let params = BlobBenchParams {
            rows,
            dimensions: DIMENSIONS,
        };
        group.throughput(Throughput::Bytes(u64::try_from(encoded.len()).unwrap_or(u64::MAX)));

        group.bench_with_input(BenchmarkId::new("write", &params), &table, |b, table| {
            b.iter(|| {
                let mut out = Vec::with_capacity(encoded.len());
                black_box(table.write(&mut out))
            });
        });
        group.bench_with_input(BenchmarkId::new("read", &params), &encoded, |b, encoded| {
            b.iter(|| black_box(Table::read(Cursor::new(encoded.as_slice()), "bench")));
        });
    }

    group.finish();
    Ok(())
}

fn table_codec(c: &mut Criterion) {
    if let Err(err) = table_codec_impl(c) {
        panic!("table_codec benchmark setup failed: {err}");
    }
}

criterion_group!(benches, table_codec);
criterion_main!(benches);
