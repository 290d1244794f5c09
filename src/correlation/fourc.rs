//! 4C: Computing Correlation Connected Clusters.
//!
//! # The Algorithm (Böhm et al., 2004)
//!
//! 4C is DBSCAN with a distance that is cheap along a point's local subspace
//! and expensive across it.
//!
//! For each point `p`, PCA over its Euclidean ε-range yields eigenpairs. An
//! eigenvalue is strong if it is at least `delta` (relative to the largest
//! eigenvalue unless configured absolute). The *correlation similarity
//! matrix* weights strong directions by 1 and weak directions by `kappa`:
//!
//! ```text
//!   Wₚ = V diag(1, …, 1, κ, …, κ) Vᵀ
//!   distₚ(p, q) = sqrt((p − q)ᵀ Wₚ (p − q))
//! ```
//!
//! `q` is a neighbor of `p` iff it is in the ε-range of `p` and
//! `max(distₚ, dist_q) ≤ ε`, which keeps the relation symmetric. A point is
//! core iff it has at least `minpts` neighbors and its correlation dimension
//! is at most `lambda`.
//!
//! ## References
//!
//! Böhm, Kailing, Kröger, Zimek (2004). "Computing Clusters of Correlation
//! Connected Objects." SIGMOD.

use nalgebra::DMatrix;
use tracing::{debug, info, warn};

use crate::cluster::{
    ClusterModel, ClusteringAlgorithm, Clustering, CorePredicate, GeneralizedDbscan,
    NeighborPredicate,
};
use crate::error::{Error, Result};
use crate::linalg;
use crate::pca::{EigenPairFilter, PcaFilteredResult, PcaRunner};
use crate::progress::Progress;
use crate::relation::{PointId, Relation};

use super::{identical, LocalPca, Memo, Neighborhood};

/// 4C neighbor predicate settings.
#[derive(Debug, Clone, Copy)]
pub struct FourCNeighborPredicate {
    epsilon: f64,
    delta: f64,
    absolute: bool,
    kappa: f64,
}

impl FourCNeighborPredicate {
    /// Neighborhood radius `epsilon`, default `delta` 0.1 (relative) and `kappa` 50.
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon,
            delta: 0.1,
            absolute: false,
            kappa: 50.0,
        }
    }

    /// Eigenvalue threshold for strong directions.
    pub fn with_delta(mut self, delta: f64) -> Self {
        self.delta = delta;
        self
    }

    /// Interpret `delta` as an absolute eigenvalue rather than a fraction of the largest.
    pub fn with_absolute(mut self, absolute: bool) -> Self {
        self.absolute = absolute;
        self
    }

    /// Penalty weight for weak directions.
    pub fn with_kappa(mut self, kappa: f64) -> Self {
        self.kappa = kappa;
        self
    }

    /// Check parameters.
    pub fn validate(&self) -> Result<()> {
        if !(self.epsilon > 0.0) {
            return Err(Error::InvalidParameter {
                name: "epsilon",
                message: "must be positive",
            });
        }
        if !(self.kappa >= 1.0) {
            return Err(Error::InvalidParameter {
                name: "kappa",
                message: "must be at least 1",
            });
        }
        if !self.absolute && !(self.delta <= 1.0) {
            return Err(Error::InvalidParameter {
                name: "delta",
                message: "relative threshold must be at most 1",
            });
        }
        self.filter().validate()
    }

    fn filter(&self) -> EigenPairFilter {
        EigenPairFilter::Limit {
            delta: self.delta,
            absolute: self.absolute,
        }
    }

    /// Bind to a relation.
    pub fn instantiate<'a>(&self, relation: &'a Relation) -> FourCNeighbors<'a> {
        FourCNeighbors {
            relation,
            epsilon: self.epsilon,
            kappa: self.kappa,
            local: LocalPca {
                neighborhood: Neighborhood::Range(self.epsilon),
                runner: PcaRunner::new(),
                filter: self.filter(),
            },
            models: Memo::new(relation.len()),
        }
    }
}

/// Local model of a 4C point: its PCA and weighted matrix.
#[derive(Debug)]
struct LocalModel {
    pca: PcaFilteredResult,
    weighted: DMatrix<f64>,
}

/// [`FourCNeighborPredicate`] bound to a relation.
#[derive(Debug)]
pub struct FourCNeighbors<'a> {
    relation: &'a Relation,
    epsilon: f64,
    kappa: f64,
    local: LocalPca,
    models: Memo<LocalModel>,
}

impl FourCNeighbors<'_> {
    fn model(&self, id: PointId) -> &LocalModel {
        self.models.get_or_init(id, || {
            let pca = self.local.compute(self.relation, id);
            // Without weak directions the weighting is plain Euclidean.
            let weighted = pca.weighted_matrix(1.0, self.kappa);
            LocalModel { pca, weighted }
        })
    }

    /// Local PCA of a point's ε-range, computed on first use.
    pub fn local_pca(&self, id: PointId) -> &PcaFilteredResult {
        &self.model(id).pca
    }

    /// Correlation distance of `q` as seen from `p`.
    pub fn correlation_distance(&self, p: PointId, q: PointId) -> f64 {
        let diff = self.relation.get(p) - self.relation.get(q);
        linalg::quadratic_form(&diff, &self.model(p).weighted).sqrt()
    }
}

impl NeighborPredicate for FourCNeighbors<'_> {
    fn neighbors(&self, id: PointId) -> Vec<PointId> {
        self.relation
            .range(id, self.epsilon)
            .into_iter()
            .map(|n| n.id)
            .filter(|&q| {
                identical(self.relation, id, q)
                    || (self.correlation_distance(id, q) <= self.epsilon
                        && self.correlation_distance(q, id) <= self.epsilon)
            })
            .collect()
    }

    fn dimensionality(&self, id: PointId) -> usize {
        self.local_pca(id).correlation_dimension()
    }
}

/// 4C core predicate: enough neighbors on a low-dimensional subspace.
#[derive(Debug, Clone, Copy)]
pub struct FourCCorePredicate<'p, 'a> {
    npred: &'p FourCNeighbors<'a>,
    minpts: usize,
    lambda: usize,
}

impl<'p, 'a> FourCCorePredicate<'p, 'a> {
    /// Core iff `|neighbors| ≥ minpts` and `dim ≤ lambda`.
    pub fn new(npred: &'p FourCNeighbors<'a>, minpts: usize, lambda: usize) -> Self {
        Self {
            npred,
            minpts,
            lambda,
        }
    }
}

impl CorePredicate for FourCCorePredicate<'_, '_> {
    fn is_core(&self, id: PointId, neighbors: &[PointId]) -> bool {
        neighbors.len() >= self.minpts && self.npred.dimensionality(id) <= self.lambda
    }
}

/// 4C clustering.
#[derive(Debug, Clone)]
pub struct FourC {
    npred: FourCNeighborPredicate,
    minpts: usize,
    lambda: Option<usize>,
    progress: Progress,
}

impl FourC {
    /// Create a 4C run with radius `epsilon` and MinPts `minpts`.
    pub fn new(epsilon: f64, minpts: usize) -> Self {
        Self {
            npred: FourCNeighborPredicate::new(epsilon),
            minpts,
            lambda: None,
            progress: Progress::none(),
        }
    }

    /// Maximum correlation dimension of a core point (default: ambient dimensionality).
    pub fn with_lambda(mut self, lambda: usize) -> Self {
        self.lambda = Some(lambda);
        self
    }

    /// Eigenvalue threshold for strong directions (default 0.1).
    pub fn with_delta(mut self, delta: f64) -> Self {
        self.npred = self.npred.with_delta(delta);
        self
    }

    /// Interpret `delta` as an absolute eigenvalue.
    pub fn with_absolute(mut self, absolute: bool) -> Self {
        self.npred = self.npred.with_absolute(absolute);
        self
    }

    /// Penalty weight for weak directions (default 50).
    pub fn with_kappa(mut self, kappa: f64) -> Self {
        self.npred = self.npred.with_kappa(kappa);
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
        if self.lambda == Some(0) {
            return Err(Error::InvalidParameter {
                name: "lambda",
                message: "must be at least 1",
            });
        }
        Ok(())
    }
}

impl ClusteringAlgorithm for FourC {
    type Model = ClusterModel;

    fn run(&self, relation: &Relation) -> Result<Clustering<ClusterModel>> {
        self.validate()?;
        let dim = relation.dimensionality();
        let lambda = self.lambda.unwrap_or(dim);
        if lambda > dim {
            warn!(lambda, dim, "lambda exceeds the data dimensionality");
        }
        let npred = self.npred.instantiate(relation);
        let cpred = FourCCorePredicate::new(&npred, self.minpts, lambda);
        let flat = GeneralizedDbscan::new(&npred, cpred)
            .with_progress(self.progress.clone())
            .run(relation);

        let mut result = Clustering::new("4C Clustering");
        for cluster in flat.into_clusters() {
            debug!(name = cluster.name(), size = cluster.len(), "4C cluster");
            result.add_toplevel(cluster);
        }
        info!(
            clusters = result.non_noise().count(),
            points = relation.len(),
            "4C finished"
        );
        Ok(result)
    }
}
