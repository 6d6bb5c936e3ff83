//! Signed feature hashing.

use clap::Parser;
use ttm_core::{ColumnRef, Matrix, Result, TableSource, TtmError, parse_method_args};

use super::{Embedder, normalise_rows};
use crate::tokenize::tokenize;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

#[derive(Debug, Parser)]
#[command(about = "Hashed term vectors")]
struct HashArgs {
    /// Number of vector components.
    #[arg(long, default_value_t = 256)]
    features: usize,
}

/// Single-pass embedder that hashes tokens into a fixed number of buckets.
///
/// Each token adds `±1` to bucket `fnv1a(token) mod features`, the sign taken
/// from the hash's top bit; rows are then L2-normalised.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FeatureHasher {
    features: usize,
}

impl FeatureHasher {
    /// Create a hasher with `features` buckets.
    ///
    /// # Errors
    /// Returns [`TtmError::Config`] when `features` is zero.
    pub fn new(features: usize) -> Result<Self> {
        if features == 0 {
            return Err(TtmError::config("hash", "--features must be positive"));
        }
        Ok(Self { features })
    }

    pub(super) fn from_args(args: &[String]) -> Result<Self> {
        let parsed: HashArgs = parse_method_args("hash", args)?;
        Self::new(parsed.features)
    }

    fn bucket(&self, token: &str) -> (usize, f64) {
        let hash = fnv1a(token.as_bytes());
        let buckets = u64::try_from(self.features).unwrap_or(u64::MAX);
        let index = usize::try_from(hash % buckets).unwrap_or(0);
        let sign = if hash >> 63 == 1 { -1.0 } else { 1.0 };
        (index, sign)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

impl Embedder for FeatureHasher {
    fn name(&self) -> &'static str {
        "hash"
    }

    fn embed(&self, source: &mut TableSource, column: &ColumnRef) -> Result<Matrix> {
        let mut data = Vec::new();
        let mut rows = 0;
        for cell in source.cells(column)? {
            let mut vector = vec![0.0; self.features];
            for token in tokenize(&cell?) {
                let (index, sign) = self.bucket(&token);
                vector[index] += sign;
            }
            data.extend(vector);
            rows += 1;
        }
        let mut matrix = Matrix::from_flat(rows, self.features, data)
            .ok_or_else(|| TtmError::algorithm("hash", "vector buffer has the wrong length"))?;
        normalise_rows(&mut matrix);
        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_matches_reference_vectors() {
        assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(fnv1a(b"foobar"), 0x8594_4171_f739_67e8);
    }

    #[test]
    fn zero_features_are_rejected() {
        assert!(matches!(FeatureHasher::new(0), Err(TtmError::Config { .. })));
    }

    #[test]
    fn buckets_stay_in_range() -> Result<()> {
        let hasher = FeatureHasher::new(7)?;
        for token in ["alpha", "beta", "gamma", "delta"] {
            assert!(hasher.bucket(token).0 < 7);
        }
        Ok(())
    }
}
