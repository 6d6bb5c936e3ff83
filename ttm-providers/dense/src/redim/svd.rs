//! Truncated singular value decomposition.

use clap::Parser;
use rand::{Rng, SeedableRng, rngs::StdRng};
use ttm_core::{Matrix, Result, TtmError, parse_method_args};

use super::Reducer;
use crate::linalg::{mul, orthonormalise_columns, symmetric_eigen, transpose_mul};

/// Extra basis vectors carried through the power iterations.
const OVERSAMPLING: usize = 5;
/// Number of subspace power iterations.
const POWER_ITERATIONS: usize = 10;
/// Seed for the random starting subspace.
const SUBSPACE_SEED: u64 = 0;

#[derive(Debug, Parser)]
#[command(about = "Project onto the leading right singular vectors")]
struct SvdArgs {
    /// Number of output dimensions.
    #[arg(long, default_value_t = 5)]
    components: usize,
}

/// Projects vectors onto their top right singular vectors, without centering,
/// so sparse bag-of-words input stays meaningful (latent semantic analysis).
///
/// The subspace is found by seeded randomised power iteration followed by a
/// Jacobi eigen solve of the small projected Gram matrix. Each output column
/// is sign-normalised so that its largest-magnitude entry is positive, which
/// makes the result independent of the eigen solver's sign choices.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TruncatedSvd {
    components: usize,
}

impl TruncatedSvd {
    /// Reduce to `components` dimensions.
    #[must_use]
    pub const fn new(components: usize) -> Self {
        Self { components }
    }

    pub(super) fn from_args(args: &[String]) -> Result<Self> {
        let parsed: SvdArgs = parse_method_args("svd", args)?;
        if parsed.components == 0 {
            return Err(TtmError::config("svd", "--components must be at least 1"));
        }
        Ok(Self::new(parsed.components))
    }

    fn starting_subspace(dimensions: usize, width: usize) -> Matrix {
        let mut rng = StdRng::seed_from_u64(SUBSPACE_SEED);
        let data = (0..dimensions * width)
            .map(|_| rng.gen_range(-1.0..1.0))
            .collect();
        Matrix::from_flat(dimensions, width, data).unwrap_or_else(|| Matrix::zeros(dimensions, width))
    }
}

fn leading_columns(matrix: &Matrix, count: usize) -> Matrix {
    let data = matrix
        .iter_rows()
        .flat_map(|row| row[..count].iter().copied())
        .collect();
    Matrix::from_flat(matrix.rows(), count, data).unwrap_or_else(|| Matrix::zeros(matrix.rows(), count))
}

#[expect(clippy::float_arithmetic, reason = "sign flips are floating-point")]
fn normalise_signs(matrix: &mut Matrix) {
    for col in 0..matrix.cols() {
        let pivot = matrix
            .iter_rows()
            .map(|row| row[col])
            .max_by(|a, b| a.abs().total_cmp(&b.abs()))
            .unwrap_or(0.0);
        if pivot < 0.0 {
            for row in 0..matrix.rows() {
                matrix.row_mut(row)[col] = -matrix.row(row)[col];
            }
        }
    }
}

impl Reducer for TruncatedSvd {
    fn name(&self) -> &'static str {
        "svd"
    }

    fn reduce(&self, vectors: &Matrix) -> Result<Matrix> {
        let dimensions = vectors.cols();
        if vectors.rows() == 0 {
            return Ok(Matrix::zeros(0, self.components));
        }
        if self.components > dimensions {
            return Err(TtmError::algorithm(
                "svd",
                format!(
                    "cannot extract {} components from {dimensions}-dimensional vectors",
                    self.components
                ),
            ));
        }

        let width = (self.components + OVERSAMPLING).min(dimensions);
        let mut basis = Self::starting_subspace(dimensions, width);
        orthonormalise_columns(&mut basis);
        for _ in 0..POWER_ITERATIONS {
            let projected = mul(vectors, &basis);
            basis = transpose_mul(vectors, &projected);
            orthonormalise_columns(&mut basis);
        }

        let projected = mul(vectors, &basis);
        let gram = transpose_mul(&projected, &projected);
        let (_, rotation) = symmetric_eigen(&gram);
        let mut reduced = mul(&projected, &leading_columns(&rotation, self.components));
        normalise_signs(&mut reduced);
        Ok(reduced)
    }
}
