//! HiCO: Hierarchical Correlation Ordering.
//!
//! # The Algorithm (Achtert et al., 2006)
//!
//! HiCO is OPTICS with a two-part reachability. The first part is the
//! *correlation distance* of two local subspaces: starting from the strong
//! eigenvectors of one point, insert every strong eigenvector of the other
//! point that sticks out of the current span by more than `delta`, and count
//! the resulting dimensions. Do this both ways and take the maximum.
//!
//! ```text
//!   r² = vᵀ W v          W: projector onto the current weak space
//!   r² > δ²  ⇒  u = Wv / ‖Wv‖,  W ← W − u uᵀ,  λ ← λ + 1
//!   corr(p, q) = max(λ_p→q, λ_q→p)
//! ```
//!
//! The second part is the Euclidean distance, floored at a core distance.
//! Ranking all points by `(corr, dist)`, the core distance of `p` is the
//! Euclidean distance of the `mu`-th ranked point.
//!
//! Points on a common low-dimensional subspace are thus emitted together,
//! and nested subspaces show up as steps in the correlation values.
//!
//! ## References
//!
//! Achtert, Böhm, Kröger, Zimek (2006). "Mining Hierarchies of Correlation
//! Clusters." SSDBM.

use tracing::{debug, info, warn};

use crate::cluster::{run_optics, ClusterOrder, OpticsExpansion, Reachability};
use crate::error::{Error, Result};
use crate::linalg;
use crate::pca::{EigenPairFilter, PcaFilteredResult, PcaRunner, WeightFunction};
use crate::progress::Progress;
use crate::relation::{PointId, Relation};

use super::{LocalPca, Neighborhood};

/// HiCO cluster ordering.
#[derive(Debug, Clone)]
pub struct HiCO {
    mu: usize,
    k: Option<usize>,
    alpha: f64,
    delta: f64,
    weight: WeightFunction,
    progress: Progress,
}

impl HiCO {
    /// Create a HiCO run with smoothing factor `mu`.
    ///
    /// Local PCA uses the `mu` nearest neighbors unless [`with_k`](Self::with_k) is set.
    pub fn new(mu: usize) -> Self {
        Self {
            mu,
            k: None,
            alpha: 0.85,
            delta: 0.25,
            weight: WeightFunction::Constant,
            progress: Progress::none(),
        }
    }

    /// Neighborhood size for local PCA.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }

    /// Fraction of variance the strong eigenvectors must explain (default 0.85).
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Maximum distance of an eigenvector from a span it counts as part of (default 0.25).
    pub fn with_delta(mut self, delta: f64) -> Self {
        self.delta = delta;
        self
    }

    /// Weighting of neighbors in local PCA.
    pub fn with_weight(mut self, weight: WeightFunction) -> Self {
        self.weight = weight;
        self
    }

    /// Report progress to `progress`.
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    fn k(&self) -> usize {
        self.k.unwrap_or(self.mu)
    }

    fn filter(&self) -> EigenPairFilter {
        EigenPairFilter::Percentage { alpha: self.alpha }
    }

    fn validate(&self, n: usize) -> Result<()> {
        if self.mu == 0 {
            return Err(Error::InvalidParameter {
                name: "mu",
                message: "must be at least 1",
            });
        }
        if self.mu >= n {
            return Err(Error::InvalidParameter {
                name: "mu",
                message: "must be smaller than the number of points",
            });
        }
        if self.k() == 0 {
            return Err(Error::InvalidParameter {
                name: "k",
                message: "must be at least 1",
            });
        }
        if !(self.delta >= 0.0) {
            return Err(Error::InvalidParameter {
                name: "delta",
                message: "must be non-negative",
            });
        }
        self.filter().validate()
    }

    /// Correlation distance of two local subspaces.
    ///
    /// Both results must have the same ambient dimensionality.
    pub fn correlation_distance(&self, a: &PcaFilteredResult, b: &PcaFilteredResult) -> usize {
        let delta_sq = self.delta * self.delta;
        grown_dimension(a, b, delta_sq).max(grown_dimension(b, a, delta_sq))
    }

    /// Compute the cluster order of `relation`.
    pub fn run(&self, relation: &Relation) -> Result<ClusterOrder> {
        let n = relation.len();
        self.validate(n)?;
        let dim = relation.dimensionality();
        let k = self.k();
        if k <= dim {
            warn!(k, dim, "local PCA over k <= dim neighbors is not meaningful");
        }

        self.progress.step(1, 2, "local PCA");
        let local = LocalPca {
            neighborhood: Neighborhood::Knn(k),
            runner: PcaRunner::new().with_weight(self.weight),
            filter: self.filter(),
        };
        let pcas: Vec<PcaFilteredResult> = relation
            .ids()
            .map(|id| local.compute(relation, id))
            .collect();
        debug!(points = n, k, "local PCA done");

        self.progress.step(2, 2, "cluster order");
        let expansion = HiCOExpansion {
            hico: self,
            relation,
            pcas,
        };
        let order = run_optics(&expansion, n, &self.progress);
        info!(points = n, mu = self.mu, "HiCO finished");
        Ok(order)
    }
}

/// Dimension of `base`'s strong span after inserting the strong eigenvectors
/// of `other` that lie farther than `sqrt(delta_sq)` from it.
fn grown_dimension(base: &PcaFilteredResult, other: &PcaFilteredResult, delta_sq: f64) -> usize {
    let dim = base.dimensionality();
    let mut lambda = base.correlation_dimension();
    let mut weak = base.dissimilarity_matrix().clone();
    for v in other.strong_eigenvectors().column_iter() {
        if lambda >= dim {
            break;
        }
        let v = v.into_owned();
        let wv = &weak * &v;
        let residual_sq = v.dot(&wv);
        if residual_sq > delta_sq {
            let u = &wv / wv.norm();
            weak -= &u * u.transpose();
            lambda += 1;
        }
    }
    lambda
}

struct HiCOExpansion<'a> {
    hico: &'a HiCO,
    relation: &'a Relation,
    pcas: Vec<PcaFilteredResult>,
}

impl OpticsExpansion for HiCOExpansion<'_> {
    fn expand(&self, id: PointId, processed: &[bool]) -> Vec<(PointId, Reachability)> {
        let p = self.relation.get(id);
        let mut ranked: Vec<(usize, f64, PointId)> = self
            .relation
            .ids()
            .map(|q| {
                let corr = self
                    .hico
                    .correlation_distance(&self.pcas[id], &self.pcas[q]);
                let dist = linalg::squared_euclidean(p, self.relation.get(q)).sqrt();
                (corr, dist, q)
            })
            .collect();
        ranked.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then(a.1.total_cmp(&b.1))
                .then(a.2.cmp(&b.2))
        });

        let core = ranked
            .get(self.hico.mu - 1)
            .map_or(f64::INFINITY, |&(_, dist, _)| dist);
        ranked
            .into_iter()
            .filter(|&(_, _, q)| !processed[q])
            .map(|(corr, dist, q)| (q, Reachability::correlated(corr, dist.max(core))))
            .collect()
    }
}
