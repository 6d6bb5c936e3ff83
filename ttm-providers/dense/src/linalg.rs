//! Small dense linear-algebra kernels for truncated SVD.

use rayon::prelude::*;
use ttm_core::Matrix;

/// `left · right`, with `left.cols() == right.rows()`.
#[expect(clippy::float_arithmetic, reason = "matrix products are floating-point")]
pub(crate) fn mul(left: &Matrix, right: &Matrix) -> Matrix {
    let (rows, inner, cols) = (left.rows(), left.cols(), right.cols());
    let mut data = vec![0.0; rows * cols];
    data.par_chunks_mut(cols.max(1))
        .enumerate()
        .for_each(|(row, out)| {
            let lhs = left.row(row);
            for (k, &scale) in lhs.iter().enumerate().take(inner) {
                if scale == 0.0 {
                    continue;
                }
                for (cell, &value) in out.iter_mut().zip(right.row(k)) {
                    *cell += scale * value;
                }
            }
        });
    Matrix::from_flat(rows, cols, data).unwrap_or_else(|| Matrix::zeros(rows, cols))
}

/// `leftᵀ · right`, with `left.rows() == right.rows()`.
#[expect(clippy::float_arithmetic, reason = "matrix products are floating-point")]
pub(crate) fn transpose_mul(left: &Matrix, right: &Matrix) -> Matrix {
    let (rows, cols) = (left.cols(), right.cols());
    let mut out = Matrix::zeros(rows, cols);
    for (lhs, rhs) in left.iter_rows().zip(right.iter_rows()) {
        for (i, &scale) in lhs.iter().enumerate() {
            if scale == 0.0 {
                continue;
            }
            for (cell, &value) in out.row_mut(i).iter_mut().zip(rhs) {
                *cell += scale * value;
            }
        }
    }
    out
}

/// Orthonormalise the columns of `matrix` in place (modified Gram-Schmidt).
///
/// Columns that become numerically zero are left as zeros.
#[expect(clippy::float_arithmetic, reason = "orthogonalisation is floating-point")]
pub(crate) fn orthonormalise_columns(matrix: &mut Matrix) {
    let (rows, cols) = (matrix.rows(), matrix.cols());
    for col in 0..cols {
        for prev in 0..col {
            let dot: f64 = (0..rows)
                .map(|r| matrix.row(r)[col] * matrix.row(r)[prev])
                .sum();
            for r in 0..rows {
                let row = matrix.row_mut(r);
                row[col] -= dot * row[prev];
            }
        }
        let norm = (0..rows)
            .map(|r| matrix.row(r)[col] * matrix.row(r)[col])
            .sum::<f64>()
            .sqrt();
        for r in 0..rows {
            let row = matrix.row_mut(r);
            row[col] = if norm > 1e-12 { row[col] / norm } else { 0.0 };
        }
    }
}

/// Eigen-decomposition of a symmetric matrix by cyclic Jacobi rotations.
///
/// Returns eigenvalues in descending order together with the matching
/// eigenvectors stored as columns.
#[expect(clippy::float_arithmetic, reason = "Jacobi rotations are floating-point")]
pub(crate) fn symmetric_eigen(symmetric: &Matrix) -> (Vec<f64>, Matrix) {
    const SWEEPS: usize = 64;
    let n = symmetric.rows();
    let mut a = symmetric.clone();
    let mut v = Matrix::zeros(n, n);
    for i in 0..n {
        v.row_mut(i)[i] = 1.0;
    }

    for _ in 0..SWEEPS {
        let off: f64 = (0..n)
            .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
            .map(|(i, j)| a.row(i)[j] * a.row(i)[j])
            .sum();
        if off < 1e-22 {
            break;
        }
        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a.row(p)[q];
                if apq.abs() < 1e-300 {
                    continue;
                }
                let theta = (a.row(q)[q] - a.row(p)[p]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + theta.mul_add(theta, 1.0).sqrt());
                let t = if theta == 0.0 { 1.0 } else { t };
                let c = 1.0 / t.mul_add(t, 1.0).sqrt();
                let s = t * c;
                rotate(&mut a, &mut v, (p, q), (c, s));
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&x, &y| a.row(y)[y].total_cmp(&a.row(x)[x]));
    let values = order.iter().map(|&i| a.row(i)[i]).collect();
    let mut vectors = Matrix::zeros(n, n);
    for (target, &source) in order.iter().enumerate() {
        for r in 0..n {
            vectors.row_mut(r)[target] = v.row(r)[source];
        }
    }
    (values, vectors)
}

#[expect(clippy::float_arithmetic, reason = "Jacobi rotations are floating-point")]
fn rotate(a: &mut Matrix, v: &mut Matrix, (p, q): (usize, usize), (c, s): (f64, f64)) {
    let n = a.rows();
    for k in 0..n {
        let akp = a.row(k)[p];
        let akq = a.row(k)[q];
        a.row_mut(k)[p] = c * akp - s * akq;
        a.row_mut(k)[q] = s * akp + c * akq;
    }
    for k in 0..n {
        let apk = a.row(p)[k];
        let aqk = a.row(q)[k];
        a.row_mut(p)[k] = c * apk - s * aqk;
        a.row_mut(q)[k] = s * apk + c * aqk;
    }
    for k in 0..n {
        let vkp = v.row(k)[p];
        let vkq = v.row(k)[q];
        v.row_mut(k)[p] = c * vkp - s * vkq;
        v.row_mut(k)[q] = s * vkp + c * vkq;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: usize, cols: usize, data: &[f64]) -> Matrix {
        Matrix::from_flat(rows, cols, data.to_vec()).expect("shape matches")
    }

    #[test]
    fn products_agree_with_hand_computation() {
        let a = matrix(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = matrix(3, 1, &[1.0, 0.0, -1.0]);
        assert_eq!(mul(&a, &b).as_slice(), &[-2.0, -2.0]);
        let c = matrix(2, 1, &[1.0, 1.0]);
        assert_eq!(transpose_mul(&a, &c).as_slice(), &[5.0, 7.0, 9.0]);
    }

    #[test]
    fn orthonormalised_columns_have_unit_length() {
        let mut q = matrix(3, 2, &[1.0, 1.0, 1.0, 0.0, 0.0, 1.0]);
        orthonormalise_columns(&mut q);
        let gram = transpose_mul(&q, &q);
        for (i, value) in gram.as_slice().iter().enumerate() {
            let expected = if i == 0 || i == 3 { 1.0 } else { 0.0 };
            assert!((value - expected).abs() < 1e-12, "gram[{i}] = {value}");
        }
    }

    #[test]
    fn jacobi_recovers_eigenvalues_in_descending_order() {
        let symmetric = matrix(2, 2, &[2.0, 1.0, 1.0, 2.0]);
        let (values, vectors) = symmetric_eigen(&symmetric);
        assert!((values[0] - 3.0).abs() < 1e-10);
        assert!((values[1] - 1.0).abs() < 1e-10);
        let first = [vectors.row(0)[0], vectors.row(1)[0]];
        assert!((first[0].abs() - first[1].abs()).abs() < 1e-10);
    }
}
