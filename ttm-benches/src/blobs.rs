//! Seeded synthetic clusterings for benchmarking.
//!
//! [`Blobs`] places `centres` cluster centres on the diagonal, ten units
//! apart, and scatters rows uniformly within one unit of their centre. Rows
//! are assigned to centres round-robin so every cluster has the same size.

use rand::{Rng, SeedableRng, rngs::SmallRng};
use ttm_core::vector::encode_vector;
use ttm_core::{DocumentId, Header, Matrix, Row, Table};

use crate::error::BenchSetupError;

/// Distance between neighbouring centres along each axis.
const CENTRE_SPACING: f64 = 10.0;

/// Errors that may occur during blob generation.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum BlobError {
    /// A size parameter was zero.
    #[error("{what} must be greater than zero")]
    Zero {
        /// The parameter that was zero.
        what: &'static str,
    },
    /// More centres than rows were requested.
    #[error("cannot place {centres} centres among {rows} rows")]
    TooManyCentres {
        /// Requested centres.
        centres: usize,
        /// Requested rows.
        rows: usize,
    },
}

/// Configuration for blob generation.
#[derive(Clone, Copy, Debug)]
pub struct BlobConfig {
    /// Number of rows.
    pub rows: usize,
    /// Vector dimensionality.
    pub dimensions: usize,
    /// Number of clusters.
    pub centres: usize,
    /// RNG seed.
    pub seed: u64,
}

/// Vectors together with the cluster each was drawn around.
///
/// # Examples
/// ```
/// use ttm_benches::blobs::{BlobConfig, Blobs};
///
/// let blobs = Blobs::generate(&BlobConfig { rows: 6, dimensions: 2, centres: 3, seed: 7 })?;
/// assert_eq!(blobs.vectors().rows(), 6);
/// assert_eq!(blobs.labels(), ["0", "1", "2", "0", "1", "2"]);
/// # Ok::<(), ttm_benches::blobs::BlobError>(())
/// ```
#[derive(Clone, Debug)]
pub struct Blobs {
    vectors: Matrix,
    labels: Vec<String>,
}

impl Blobs {
    /// Generate blobs from `config`.
    ///
    /// # Errors
    /// Returns [`BlobError::Zero`] for an empty shape and
    /// [`BlobError::TooManyCentres`] when clusters would be empty.
    #[expect(
        clippy::float_arithmetic,
        clippy::cast_precision_loss,
        reason = "centre offsets are small multiples of the spacing"
    )]
    pub fn generate(config: &BlobConfig) -> Result<Self, BlobError> {
        for (what, value) in [
            ("row count", config.rows),
            ("dimension count", config.dimensions),
            ("centre count", config.centres),
        ] {
            if value == 0 {
                return Err(BlobError::Zero { what });
            }
        }
        if config.centres > config.rows {
            return Err(BlobError::TooManyCentres {
                centres: config.centres,
                rows: config.rows,
            });
        }

        let mut rng = SmallRng::seed_from_u64(config.seed);
        let mut data = Vec::with_capacity(config.rows.saturating_mul(config.dimensions));
        let mut labels = Vec::with_capacity(config.rows);
        for (_, centre) in (0..config.rows).zip((0..config.centres).cycle()) {
            let offset = centre as f64 * CENTRE_SPACING;
            data.extend((0..config.dimensions).map(|_| offset + rng.gen_range(-1.0..1.0)));
            labels.push(centre.to_string());
        }
        let vectors = Matrix::from_flat(config.rows, config.dimensions, data)
            .ok_or(BlobError::Zero { what: "row count" })?;
        Ok(Self { vectors, labels })
    }

    /// The generated vectors.
    #[must_use]
    pub const fn vectors(&self) -> &Matrix {
        &self.vectors
    }

    /// The centre each row was drawn around.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// An enriched table with `lowdim` and `cluster` columns.
    ///
    /// # Errors
    /// Propagates [`ttm_core::FormatError`] from table assembly and
    /// [`ttm_core::vector::VectorCellError`] from cell encoding.
    pub fn to_table(&self) -> Result<Table, BenchSetupError> {
        let mut table = Table::new(Header::new(["lowdim", "cluster"])?);
        for (index, (vector, label)) in self.vectors.iter_rows().zip(&self.labels).enumerate() {
            table.push_row(Row::new(
                DocumentId::from_parts("blobs", index),
                vec![encode_vector(vector)?, label.clone()],
            ))?;
        }
        Ok(table)
    }
}
