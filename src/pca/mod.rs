//! Local Principal Component Analysis.
//!
//! [`PcaRunner`] turns a set of point ids into eigenpairs of their covariance
//! matrix ([`PcaResult`]). An [`EigenPairFilter`] then splits the eigenvectors
//! into a *strong* prefix (directions of high variance, the local subspace)
//! and a *weak* remainder (directions of near-constant value, its orthogonal
//! complement). The split is captured in a [`PcaFilteredResult`].
//!
//! ```text
//!   ids ──► covariance ──► eigenpairs (λ₁ ≥ λ₂ ≥ … ≥ λ_d)
//!                              │
//!                 filter ──► correlation dimension c
//!                              │
//!          strong = v₁..v_c    weak = v_{c+1}..v_d
//!          dissimilarity M̂ = Σ_weak vᵢ vᵢᵀ
//! ```
//!
//! For a difference vector `x`, `xᵀ M̂ x` is the squared length of the part of
//! `x` that leaves the local subspace. This is the distance notion shared by
//! COPAC, ERiC and HiCO.

mod filter;
mod weight;

pub use filter::EigenPairFilter;
pub use weight::WeightFunction;

use nalgebra::{DMatrix, DMatrixView, DVector};

use crate::error::{Error, Result};
use crate::linalg;
use crate::relation::{Neighbor, PointId, Relation};

/// Eigenpairs of a covariance matrix, sorted by descending eigenvalue.
#[derive(Debug, Clone)]
pub struct PcaResult {
    eigenvalues: Vec<f64>,
    /// Eigenvectors as columns, matching `eigenvalues`.
    eigenvectors: DMatrix<f64>,
}

impl PcaResult {
    /// Eigenvalues, non-increasing.
    pub fn eigenvalues(&self) -> &[f64] {
        &self.eigenvalues
    }

    /// Eigenvectors as matrix columns.
    pub fn eigenvectors(&self) -> &DMatrix<f64> {
        &self.eigenvectors
    }

    /// Zero variance along the coordinate axes.
    ///
    /// Stands in for PCA of a set too small to have a covariance.
    pub fn axis_aligned(dim: usize) -> Self {
        Self {
            eigenvalues: vec![0.0; dim],
            eigenvectors: DMatrix::identity(dim, dim),
        }
    }
}

/// Computes [`PcaResult`]s for point subsets.
#[derive(Debug, Clone, Copy, Default)]
pub struct PcaRunner {
    weight: WeightFunction,
}

impl PcaRunner {
    /// Unweighted PCA.
    pub fn new() -> Self {
        Self::default()
    }

    /// Weight points by their distance to the centroid.
    pub fn with_weight(mut self, weight: WeightFunction) -> Self {
        self.weight = weight;
        self
    }

    /// PCA of the named points.
    ///
    /// Fails with [`Error::InsufficientPoints`] for fewer than two ids.
    pub fn process_ids(&self, relation: &Relation, ids: &[PointId]) -> Result<PcaResult> {
        if ids.len() < 2 {
            return Err(Error::InsufficientPoints {
                required: 2,
                found: ids.len(),
            });
        }
        let cov = self.covariance(relation, ids);
        let (mut eigenvalues, eigenvectors) = linalg::sorted_symmetric_eigen(cov);
        // Round-off can push the smallest eigenvalues of a PSD matrix below zero.
        for ev in &mut eigenvalues {
            if *ev < 0.0 {
                *ev = 0.0;
            }
        }
        Ok(PcaResult {
            eigenvalues,
            eigenvectors,
        })
    }

    /// PCA of a neighbor query result.
    pub fn process_neighbors(
        &self,
        relation: &Relation,
        neighbors: &[Neighbor],
    ) -> Result<PcaResult> {
        let ids: Vec<PointId> = neighbors.iter().map(|n| n.id).collect();
        self.process_ids(relation, &ids)
    }

    /// Population covariance, optionally weighted.
    fn covariance(&self, relation: &Relation, ids: &[PointId]) -> DMatrix<f64> {
        let dim = relation.dimensionality();
        let weights = self.weights(relation, ids);
        let total: f64 = weights.iter().sum();
        let (weights, total) = if total > 0.0 && total.is_finite() {
            (weights, total)
        } else {
            (vec![1.0; ids.len()], ids.len() as f64)
        };

        let mut mean = DVector::zeros(dim);
        for (&id, &w) in ids.iter().zip(&weights) {
            mean.axpy(w, relation.get(id), 1.0);
        }
        mean /= total;

        let mut cov = DMatrix::zeros(dim, dim);
        for (&id, &w) in ids.iter().zip(&weights) {
            let d = relation.get(id) - &mean;
            cov.ger(w, &d, &d, 1.0);
        }
        cov / total
    }

    fn weights(&self, relation: &Relation, ids: &[PointId]) -> Vec<f64> {
        if self.weight == WeightFunction::Constant {
            return vec![1.0; ids.len()];
        }
        let centroid = relation.centroid(ids);
        let dists: Vec<f64> = ids
            .iter()
            .map(|&id| linalg::squared_euclidean(relation.get(id), &centroid).sqrt())
            .collect();
        let max = dists.iter().copied().fold(0.0, f64::max);
        let stddev = (dists.iter().map(|d| d * d).sum::<f64>() / dists.len() as f64).sqrt();
        dists
            .iter()
            .map(|&d| self.weight.weight(d, max, stddev))
            .collect()
    }
}

/// A [`PcaResult`] split into strong and weak eigenvectors.
#[derive(Debug, Clone)]
pub struct PcaFilteredResult {
    eigenvalues: Vec<f64>,
    eigenvectors: DMatrix<f64>,
    correlation_dimension: usize,
    dissimilarity: DMatrix<f64>,
}

impl PcaFilteredResult {
    /// Split `result` with `filter`.
    pub fn new(result: PcaResult, filter: &EigenPairFilter) -> Self {
        let strong = filter.filter(&result.eigenvalues);
        Self::with_dimension(result, strong)
    }

    /// Split `result` after the first `strong` eigenvectors.
    pub fn with_dimension(result: PcaResult, strong: usize) -> Self {
        let dim = result.eigenvalues.len();
        let strong = strong.min(dim);
        let weights: Vec<f64> = (0..dim).map(|i| if i < strong { 0.0 } else { 1.0 }).collect();
        let dissimilarity = linalg::weighted_projector(&result.eigenvectors, &weights);
        Self {
            eigenvalues: result.eigenvalues,
            eigenvectors: result.eigenvectors,
            correlation_dimension: strong,
            dissimilarity,
        }
    }

    /// The "no correlation detected" model: every axis is strong.
    ///
    /// Used when a neighborhood is too small for PCA.
    pub fn full_dimensional(dim: usize) -> Self {
        Self::with_dimension(PcaResult::axis_aligned(dim), dim)
    }

    /// Ambient dimensionality.
    pub fn dimensionality(&self) -> usize {
        self.eigenvalues.len()
    }

    /// Number of strong eigenvectors.
    pub fn correlation_dimension(&self) -> usize {
        self.correlation_dimension
    }

    /// Eigenvalues, non-increasing.
    pub fn eigenvalues(&self) -> &[f64] {
        &self.eigenvalues
    }

    /// All eigenvectors as columns.
    pub fn eigenvectors(&self) -> &DMatrix<f64> {
        &self.eigenvectors
    }

    /// The first `correlation_dimension` eigenvectors.
    pub fn strong_eigenvectors(&self) -> DMatrixView<'_, f64> {
        self.eigenvectors.columns(0, self.correlation_dimension)
    }

    /// The remaining eigenvectors.
    pub fn weak_eigenvectors(&self) -> DMatrixView<'_, f64> {
        self.eigenvectors.columns(
            self.correlation_dimension,
            self.dimensionality() - self.correlation_dimension,
        )
    }

    /// Projector onto the weak eigenvectors.
    pub fn dissimilarity_matrix(&self) -> &DMatrix<f64> {
        &self.dissimilarity
    }

    /// `V diag(w) Vᵀ` with `strong` on strong and `weak` on weak directions.
    pub fn weighted_matrix(&self, strong: f64, weak: f64) -> DMatrix<f64> {
        let weights: Vec<f64> = (0..self.dimensionality())
            .map(|i| if i < self.correlation_dimension { strong } else { weak })
            .collect();
        linalg::weighted_projector(&self.eigenvectors, &weights)
    }

    /// Fraction of the total variance carried by the strong eigenvectors.
    pub fn explained_variance(&self) -> f64 {
        let total: f64 = self.eigenvalues.iter().sum();
        if total <= 0.0 {
            return 1.0;
        }
        self.eigenvalues[..self.correlation_dimension].iter().sum::<f64>() / total
    }

    /// Squared length of `x` outside the strong subspace: `xᵀ M̂ x`.
    pub fn weak_distance_sq(&self, x: &DVector<f64>) -> f64 {
        linalg::quadratic_form(x, &self.dissimilarity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Points on the line y = 2x in the plane, plus a tiny wobble.
    fn line_relation() -> Relation {
        let data: Vec<Vec<f64>> = (0..20)
            .map(|i| {
                let t = i as f64 * 0.5;
                let wobble = if i % 2 == 0 { 1e-3 } else { -1e-3 };
                vec![t, 2.0 * t + wobble]
            })
            .collect();
        Relation::new(&data).unwrap()
    }

    #[test]
    fn eigenvalues_are_non_increasing() {
        let rel = line_relation();
        let ids: Vec<_> = rel.ids().collect();
        let res = PcaRunner::new().process_ids(&rel, &ids).unwrap();
        for w in res.eigenvalues().windows(2) {
            assert!(w[0] >= w[1]);
        }
    }

    #[test]
    fn line_has_one_strong_direction() {
        let rel = line_relation();
        let ids: Vec<_> = rel.ids().collect();
        let res = PcaRunner::new().process_ids(&rel, &ids).unwrap();
        let f = PcaFilteredResult::new(res, &EigenPairFilter::default());
        assert_eq!(f.correlation_dimension(), 1);
        let v = f.strong_eigenvectors();
        // Direction (1, 2) / sqrt(5), up to sign.
        let cos = (v[(0, 0)] + 2.0 * v[(1, 0)]).abs() / 5f64.sqrt();
        assert!(cos > 0.9999);
        assert_eq!(f.weak_eigenvectors().ncols(), 1);

        // Moving along the line costs nothing, moving across it costs everything.
        let along = DVector::from_vec(vec![1.0, 2.0]);
        let across = DVector::from_vec(vec![-2.0, 1.0]);
        assert!(f.weak_distance_sq(&along) < 1e-6);
        assert!((f.weak_distance_sq(&across) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn pca_is_idempotent() {
        let rel = line_relation();
        let ids: Vec<_> = rel.ids().collect();
        let a = PcaFilteredResult::new(
            PcaRunner::new().process_ids(&rel, &ids).unwrap(),
            &EigenPairFilter::default(),
        );
        let b = PcaFilteredResult::new(
            PcaRunner::new().process_ids(&rel, &ids).unwrap(),
            &EigenPairFilter::default(),
        );
        assert_eq!(a.eigenvalues(), b.eigenvalues());
        assert_eq!(a.correlation_dimension(), b.correlation_dimension());
        for c in 0..2 {
            let dot = a.eigenvectors().column(c).dot(&b.eigenvectors().column(c));
            assert!((dot.abs() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn too_few_points_is_an_error() {
        let rel = line_relation();
        assert!(matches!(
            PcaRunner::new().process_ids(&rel, &[3]),
            Err(Error::InsufficientPoints { required: 2, found: 1 })
        ));
    }

    #[test]
    fn weighted_matrix_scales_weak_directions() {
        let rel = line_relation();
        let ids: Vec<_> = rel.ids().collect();
        let f = PcaFilteredResult::new(
            PcaRunner::new().process_ids(&rel, &ids).unwrap(),
            &EigenPairFilter::default(),
        );
        let w = f.weighted_matrix(1.0, 50.0);
        let across = DVector::from_vec(vec![-2.0, 1.0]) / 5f64.sqrt();
        let along = DVector::from_vec(vec![1.0, 2.0]) / 5f64.sqrt();
        assert!((linalg::quadratic_form(&across, &w) - 50.0).abs() < 1e-3);
        assert!((linalg::quadratic_form(&along, &w) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn weighting_keeps_the_dominant_direction() {
        let rel = line_relation();
        let ids: Vec<_> = rel.ids().collect();
        for weight in [
            WeightFunction::Linear,
            WeightFunction::Gaussian,
            WeightFunction::GaussianStddev,
            WeightFunction::Exponential,
        ] {
            let res = PcaRunner::new()
                .with_weight(weight)
                .process_ids(&rel, &ids)
                .unwrap();
            let f = PcaFilteredResult::new(res, &EigenPairFilter::default());
            assert_eq!(f.correlation_dimension(), 1, "{weight:?}");
        }
    }

    #[test]
    fn full_dimensional_fallback() {
        let f = PcaFilteredResult::full_dimensional(3);
        assert_eq!(f.correlation_dimension(), 3);
        assert_eq!(f.weak_eigenvectors().ncols(), 0);
        assert_eq!(f.weak_distance_sq(&DVector::from_vec(vec![1.0, 2.0, 3.0])), 0.0);
        assert_eq!(f.explained_variance(), 1.0);
    }
}
