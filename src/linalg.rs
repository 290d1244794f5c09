//! Small dense linear-algebra helpers on top of `nalgebra`.

use nalgebra::{DMatrix, DVector, SymmetricEigen};

#[inline]
pub(crate) fn squared_euclidean(a: &DVector<f64>, b: &DVector<f64>) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// `vᵀ M v`.
#[inline]
pub(crate) fn quadratic_form(v: &DVector<f64>, m: &DMatrix<f64>) -> f64 {
    v.dot(&(m * v))
}

/// Eigendecomposition of a symmetric matrix, sorted by descending eigenvalue.
///
/// Eigenvectors are the columns of the returned matrix, in the same order as
/// the eigenvalues. Ties keep the decomposition's order.
pub(crate) fn sorted_symmetric_eigen(m: DMatrix<f64>) -> (Vec<f64>, DMatrix<f64>) {
    let n = m.nrows();
    let eig = SymmetricEigen::new(m);
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| eig.eigenvalues[b].total_cmp(&eig.eigenvalues[a]));

    let values = order.iter().map(|&i| eig.eigenvalues[i]).collect();
    let vectors = DMatrix::from_fn(n, n, |r, c| eig.eigenvectors[(r, order[c])]);
    (values, vectors)
}

/// `V diag(w) Vᵀ` for the columns of `v`.
pub(crate) fn weighted_projector(v: &DMatrix<f64>, weights: &[f64]) -> DMatrix<f64> {
    debug_assert_eq!(v.ncols(), weights.len());
    let mut scaled = v.clone();
    for (mut col, &w) in scaled.column_iter_mut().zip(weights) {
        col *= w;
    }
    scaled * v.transpose()
}

/// Orthonormalize the given vectors with classical Gram–Schmidt.
///
/// Returns the basis as matrix columns, or `None` when the vectors are
/// linearly dependent (a residual vanishes) or contain non-finite values.
pub(crate) fn orthonormal_basis(vectors: &[DVector<f64>]) -> Option<DMatrix<f64>> {
    let first = vectors.first()?;
    let mut basis = DMatrix::zeros(first.len(), vectors.len());
    for (i, v) in vectors.iter().enumerate() {
        let mut u = v.clone();
        for j in 0..i {
            let b = basis.column(j);
            let f = v.dot(&b);
            if f.is_nan() {
                return None;
            }
            u.axpy(-f, &b, 1.0);
        }
        let len = u.norm();
        if len.is_nan() || len < f64::MIN_POSITIVE {
            return None;
        }
        basis.set_column(i, &(u / len));
    }
    Some(basis)
}

/// The first `cols` unit vectors of `dim`-space as matrix columns.
pub(crate) fn unit_basis(dim: usize, cols: usize) -> DMatrix<f64> {
    DMatrix::from_fn(dim, cols, |r, c| if r == c { 1.0 } else { 0.0 })
}
