//! Benchmark support crate for ttm.
//!
//! Provides seeded synthetic clusterings and parameter types used by the
//! Criterion benchmarks for the table codec, the clusterers and the `eval`
//! quality metrics.

pub mod blobs;
pub mod error;
pub mod params;
