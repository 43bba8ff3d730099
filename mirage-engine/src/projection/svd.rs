//! Truncated SVD for short, wide matrices
//!
//! Corpus matrices have one row per item (tens to hundreds) and one column per
//! pixel (90 000 at 300x300). The right singular vectors are recovered from the
//! eigen-decomposition of the small Gram matrix `X Xᵀ`:
//!
//! ```text
//! X Xᵀ = U Σ² Uᵀ   =>   v_i = Xᵀ u_i / σ_i
//! ```
//!
//! The eigen-decomposition uses cyclic Jacobi rotations, which are exact enough
//! for symmetric positive semi-definite matrices of this size.

use ndarray::{Array1, Array2};

/// Upper bound on Jacobi sweeps; convergence normally takes fewer than 15
const MAX_SWEEPS: usize = 100;

/// Off-diagonal mass (relative to total mass) at which a sweep loop stops
const CONVERGENCE_TOLERANCE: f64 = 1e-22;

/// Singular values below `σ_max * RANK_TOLERANCE` count as zero.
///
/// Squaring through the Gram matrix costs half the digits, so this sits near
/// `sqrt(f64::EPSILON)` rather than at machine precision.
pub const RANK_TOLERANCE: f64 = 1e-7;

/// Eigen-decomposition of a symmetric matrix
#[derive(Debug, Clone)]
pub struct SymmetricEigen {
    /// Eigenvalues, descending
    pub values: Vec<f64>,
    /// Eigenvectors as columns, in the order of `values`
    pub vectors: Array2<f64>,
}

/// Leading right singular vectors of a matrix
#[derive(Debug, Clone)]
pub struct TruncatedSvd {
    /// Singular values, descending
    pub singular_values: Vec<f64>,
    /// One right singular vector per row (`k x ncols`)
    pub basis: Array2<f64>,
}

/// Cyclic Jacobi eigen-decomposition of a symmetric matrix
///
/// Only the upper triangle drives the rotations; the input is assumed
/// symmetric.
pub fn symmetric_eigen(matrix: &Array2<f64>) -> SymmetricEigen {
    let n = matrix.nrows();
    let mut a = matrix.clone();
    let mut v = Array2::<f64>::eye(n);

    for sweep in 0..MAX_SWEEPS {
        let mut off = 0.0;
        let mut total = 0.0;
        for p in 0..n {
            total += a[[p, p]] * a[[p, p]];
            for q in (p + 1)..n {
                off += a[[p, q]] * a[[p, q]];
            }
        }
        total += 2.0 * off;

        if off == 0.0 || off <= CONVERGENCE_TOLERANCE * total {
            tracing::trace!(sweeps = sweep, "Jacobi converged");
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[[p, q]];
                if apq == 0.0 {
                    continue;
                }

                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let t = if theta.abs() > 1e150 {
                    0.5 / theta
                } else {
                    theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt())
                };
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[[k, p]];
                    let akq = a[[k, q]];
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[[p, k]];
                    let aqk = a[[q, k]];
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let vkp = v[[k, p]];
                    let vkq = v[[k, q]];
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| a[[j, j]].total_cmp(&a[[i, i]]));

    let values = order.iter().map(|&i| a[[i, i]]).collect();
    let mut vectors = Array2::<f64>::zeros((n, n));
    for (dst, &src) in order.iter().enumerate() {
        vectors.column_mut(dst).assign(&v.column(src));
    }

    SymmetricEigen { values, vectors }
}

/// Top-`k` right singular vectors of `x`, clamped to its numerical rank
pub fn truncated_svd(x: &Array2<f64>, k: usize) -> TruncatedSvd {
    let ncols = x.ncols();
    let gram = x.dot(&x.t());
    let eigen = symmetric_eigen(&gram);

    let sigma: Vec<f64> = eigen.values.iter().map(|l| l.max(0.0).sqrt()).collect();
    let sigma_max = sigma.first().copied().unwrap_or(0.0);
    let rank = sigma
        .iter()
        .take_while(|s| **s > 0.0 && **s > sigma_max * RANK_TOLERANCE)
        .count();
    let k_eff = k.min(rank);

    let mut basis = Array2::<f64>::zeros((k_eff, ncols));
    for i in 0..k_eff {
        let u = eigen.vectors.column(i);
        let v: Array1<f64> = x.t().dot(&u) / sigma[i];
        basis.row_mut(i).assign(&v);
    }

    TruncatedSvd {
        singular_values: sigma[..k_eff].to_vec(),
        basis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn approx(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn test_eigen_of_diagonal_matrix() {
        let m = array![[1.0, 0.0, 0.0], [0.0, 5.0, 0.0], [0.0, 0.0, 3.0]];
        let eigen = symmetric_eigen(&m);
        assert_eq!(eigen.values, vec![5.0, 3.0, 1.0]);
        assert!(approx(eigen.vectors[[1, 0]].abs(), 1.0, 1e-12));
    }

    #[test]
    fn test_eigen_reconstructs_matrix() {
        let m = array![[4.0, 1.0, 2.0], [1.0, 3.0, 0.5], [2.0, 0.5, 5.0]];
        let eigen = symmetric_eigen(&m);

        let lambda = Array2::from_diag(&Array1::from(eigen.values.clone()));
        let rebuilt = eigen.vectors.dot(&lambda).dot(&eigen.vectors.t());

        for (x, y) in rebuilt.iter().zip(m.iter()) {
            assert!(approx(*x, *y, 1e-9), "{} != {}", x, y);
        }
        assert!(eigen.values.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_truncated_svd_known_values() {
        // Singular values of this 2x3 matrix are 5 and 3
        let x = array![[3.0, 2.0, 2.0], [2.0, 3.0, -2.0]];
        let svd = truncated_svd(&x, 5);

        assert_eq!(svd.singular_values.len(), 2);
        assert!(approx(svd.singular_values[0], 5.0, 1e-9));
        assert!(approx(svd.singular_values[1], 3.0, 1e-9));
        assert_eq!(svd.basis.dim(), (2, 3));

        for row in svd.basis.rows() {
            let norm = row.dot(&row).sqrt();
            assert!(approx(norm, 1.0, 1e-9));
        }
        let cross = svd.basis.row(0).dot(&svd.basis.row(1));
        assert!(approx(cross, 0.0, 1e-9));
    }

    #[test]
    fn test_rank_clamps_components() {
        // Second row is twice the first: rank 1
        let x = array![[1.0, 2.0, 3.0, 4.0], [2.0, 4.0, 6.0, 8.0]];
        let svd = truncated_svd(&x, 50);
        assert_eq!(svd.singular_values.len(), 1);
        assert_eq!(svd.basis.nrows(), 1);
    }

    #[test]
    fn test_zero_matrix_has_no_components() {
        let x = Array2::<f64>::zeros((3, 4));
        let svd = truncated_svd(&x, 2);
        assert!(svd.singular_values.is_empty());
        assert_eq!(svd.basis.dim(), (0, 4));
    }
}
