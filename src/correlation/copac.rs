//! COPAC: COrrelation PArtition Clustering.
//!
//! # The Algorithm (Achtert et al., 2007)
//!
//! 1. For every point, run PCA over its `k` nearest neighbors and count the
//!    strong eigenvectors. This *correlation dimension* is the dimensionality
//!    of the subspace the point locally lies on.
//! 2. Two points are neighbors iff they have the same correlation dimension
//!    and each lies within `epsilon` of the other's local subspace:
//!
//! ```text
//!   dₚ(p, q) = (p − q)ᵀ M̂ₚ (p − q)        M̂ₚ: weak projector of p
//!   neighbors ⇔ dim(p) = dim(q)  ∧  max(dₚ, d_q) ≤ ε²
//! ```
//!
//! 3. Run generalized DBSCAN with this neighbor predicate and a MinPts core
//!    predicate. Clusters therefore never mix dimensionalities.
//!
//! ## References
//!
//! Achtert, Böhm, Kriegel, Kröger, Zimek (2007). "Robust, Complete, and
//! Efficient Correlation Clustering." SDM.

use tracing::{debug, info};

use crate::cluster::{
    ClusteringAlgorithm, Clustering, DimensionModel, GeneralizedDbscan,
    MinPtsCorePredicate, NeighborPredicate,
};
use crate::error::{Error, Result};
use crate::linalg;
use crate::pca::{EigenPairFilter, PcaFilteredResult, PcaRunner, WeightFunction};
use crate::progress::Progress;
use crate::relation::{PointId, Relation};

use super::{identical, LocalPca, Memo, Neighborhood};

/// COPAC neighbor predicate settings.
#[derive(Debug, Clone, Copy)]
pub struct CopacNeighborPredicate {
    k: usize,
    epsilon: f64,
    filter: EigenPairFilter,
    weight: WeightFunction,
}

impl CopacNeighborPredicate {
    /// PCA over `k` nearest neighbors; subspace distance threshold `epsilon`.
    pub fn new(k: usize, epsilon: f64) -> Self {
        Self {
            k,
            epsilon,
            filter: EigenPairFilter::default(),
            weight: WeightFunction::Constant,
        }
    }

    /// Eigenpair filter for local PCA (default: 85% of the variance).
    pub fn with_filter(mut self, filter: EigenPairFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Weighting of neighbors in local PCA.
    pub fn with_weight(mut self, weight: WeightFunction) -> Self {
        self.weight = weight;
        self
    }

    /// Check parameters.
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(Error::InvalidParameter {
                name: "k",
                message: "must be at least 1",
            });
        }
        if !(self.epsilon >= 0.0) {
            return Err(Error::InvalidParameter {
                name: "epsilon",
                message: "must be non-negative",
            });
        }
        self.filter.validate()
    }

    /// Bind to a relation.
    pub fn instantiate<'a>(&self, relation: &'a Relation) -> CopacNeighbors<'a> {
        CopacNeighbors {
            relation,
            local: LocalPca {
                neighborhood: Neighborhood::Knn(self.k),
                runner: PcaRunner::new().with_weight(self.weight),
                filter: self.filter,
            },
            epsilon_sq: self.epsilon * self.epsilon,
            models: Memo::new(relation.len()),
        }
    }
}

/// [`CopacNeighborPredicate`] bound to a relation.
#[derive(Debug)]
pub struct CopacNeighbors<'a> {
    relation: &'a Relation,
    local: LocalPca,
    epsilon_sq: f64,
    models: Memo<PcaFilteredResult>,
}

impl CopacNeighbors<'_> {
    /// Local PCA of a point, computed on first use.
    pub fn local_pca(&self, id: PointId) -> &PcaFilteredResult {
        self.models
            .get_or_init(id, || self.local.compute(self.relation, id))
    }

    fn is_neighbor(&self, p: PointId, q: PointId) -> bool {
        if identical(self.relation, p, q) {
            return true;
        }
        let pp = self.local_pca(p);
        let pq = self.local_pca(q);
        if pp.correlation_dimension() != pq.correlation_dimension() {
            return false;
        }
        let diff = self.relation.get(p) - self.relation.get(q);
        let dp = linalg::quadratic_form(&diff, pp.dissimilarity_matrix());
        if !(dp <= self.epsilon_sq) {
            return false;
        }
        let dq = linalg::quadratic_form(&diff, pq.dissimilarity_matrix());
        dq <= self.epsilon_sq
    }
}

impl NeighborPredicate for CopacNeighbors<'_> {
    fn neighbors(&self, id: PointId) -> Vec<PointId> {
        self.relation
            .ids()
            .filter(|&q| self.is_neighbor(id, q))
            .collect()
    }

    fn dimensionality(&self, id: PointId) -> usize {
        self.local_pca(id).correlation_dimension()
    }
}

/// COPAC clustering.
#[derive(Debug, Clone)]
pub struct Copac {
    npred: CopacNeighborPredicate,
    minpts: usize,
    progress: Progress,
}

impl Copac {
    /// Create a COPAC run.
    ///
    /// # Arguments
    ///
    /// * `k` - Neighborhood size for local PCA (the point included).
    /// * `epsilon` - Maximum distance of a neighbor from the local subspace.
    /// * `minpts` - Minimum neighborhood size of a core point.
    pub fn new(k: usize, epsilon: f64, minpts: usize) -> Self {
        Self {
            npred: CopacNeighborPredicate::new(k, epsilon),
            minpts,
            progress: Progress::none(),
        }
    }

    /// Eigenpair filter for local PCA.
    pub fn with_filter(mut self, filter: EigenPairFilter) -> Self {
        self.npred = self.npred.with_filter(filter);
        self
    }

    /// Weighting of neighbors in local PCA.
    pub fn with_weight(mut self, weight: WeightFunction) -> Self {
        self.npred = self.npred.with_weight(weight);
        self
    }

    /// Report progress to `progress`.
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    fn validate(&self) -> Result<()> {
        self.npred.validate()?;
        if self.minpts == 0 {
            return Err(Error::InvalidParameter {
                name: "minpts",
                message: "must be at least 1",
            });
        }
        Ok(())
    }
}

impl ClusteringAlgorithm for Copac {
    type Model = DimensionModel;

    fn run(&self, relation: &Relation) -> Result<Clustering<DimensionModel>> {
        self.validate()?;
        let dim = relation.dimensionality();
        let npred = self.npred.instantiate(relation);
        let gdbscan = GeneralizedDbscan::new(&npred, MinPtsCorePredicate::new(self.minpts))
            .with_progress(self.progress.clone());
        let flat = gdbscan.run(relation);

        let mut result = Clustering::new("COPAC Clustering");
        for cluster in flat.into_clusters() {
            let noise = cluster.is_noise();
            // Neighbors share their dimensionality, so any member represents the cluster.
            let cluster = cluster.map_model(|ids, _| DimensionModel {
                dimensionality: match ids.first() {
                    Some(&first) if !noise => npred.dimensionality(first),
                    _ => dim,
                },
            });
            debug!(
                name = cluster.name(),
                size = cluster.len(),
                dimensionality = cluster.model().dimensionality,
                "copac cluster"
            );
            result.add_toplevel(cluster);
        }
        info!(
            clusters = result.non_noise().count(),
            points = relation.len(),
            "copac finished"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::NOISE;

    /// Two lines through the same region: along x at z = 0, along y at z = 3.
    fn crossing_lines() -> Vec<Vec<f64>> {
        let mut data = Vec::new();
        for i in 0..25 {
            let t = i as f64 * 0.2 - 2.5;
            data.push(vec![t, 0.0, 0.0]);
        }
        for i in 0..25 {
            let t = i as f64 * 0.2 - 2.5;
            data.push(vec![0.0, t, 3.0]);
        }
        data
    }

    #[test]
    fn separates_lines_by_subspace() {
        let data = crossing_lines();
        let labels = Copac::new(5, 0.1, 3).fit_predict(&data).unwrap();
        assert!(labels[..25].iter().all(|&l| l == labels[0]));
        assert!(labels[25..].iter().all(|&l| l == labels[25]));
        assert_ne!(labels[0], labels[25]);
        assert_ne!(labels[0], NOISE);
    }

    #[test]
    fn line_clusters_have_dimension_one() {
        let rel = Relation::new(&crossing_lines()).unwrap();
        let clustering = Copac::new(5, 0.1, 3).run(&rel).unwrap();
        assert_eq!(clustering.non_noise().count(), 2);
        for c in clustering.non_noise() {
            assert_eq!(c.model().dimensionality, 1);
            assert_eq!(c.len(), 25);
        }
    }

    #[test]
    fn identical_points_are_neighbors() {
        let data = vec![vec![1.0, 1.0], vec![1.0, 1.0], vec![5.0, -3.0]];
        let rel = Relation::new(&data).unwrap();
        let npred = CopacNeighborPredicate::new(2, 0.0).instantiate(&rel);
        assert_eq!(npred.neighbors(0), vec![0, 1]);
        assert_eq!(npred.neighbors(1), vec![0, 1]);
    }

    #[test]
    fn tiny_neighborhood_is_full_dimensional() {
        let data = vec![vec![0.0, 0.0], vec![1.0, 2.0], vec![3.0, 1.0]];
        let rel = Relation::new(&data).unwrap();
        let npred = CopacNeighborPredicate::new(1, 0.5).instantiate(&rel);
        assert_eq!(npred.dimensionality(0), 2);
        assert_eq!(npred.local_pca(0).weak_eigenvectors().ncols(), 0);
    }

    #[test]
    fn noise_gets_ambient_dimensionality() {
        let data = crossing_lines();
        let rel = Relation::new(&data).unwrap();
        // Nothing can be core with minpts above the dataset size.
        let clustering = Copac::new(5, 0.1, 100).run(&rel).unwrap();
        assert_eq!(clustering.len(), 1);
        let noise = clustering.cluster(0);
        assert!(noise.is_noise());
        assert_eq!(noise.len(), 50);
        assert_eq!(noise.model().dimensionality, 3);
    }

    #[test]
    fn invalid_parameters() {
        let data = crossing_lines();
        assert!(Copac::new(0, 0.1, 3).fit_predict(&data).is_err());
        assert!(Copac::new(5, -0.1, 3).fit_predict(&data).is_err());
        assert!(Copac::new(5, 0.1, 0).fit_predict(&data).is_err());
        assert!(Copac::new(5, 0.1, 3)
            .with_filter(EigenPairFilter::Percentage { alpha: 2.0 })
            .fit_predict(&data)
            .is_err());
    }
}
