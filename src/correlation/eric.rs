//! ERiC: Exploring Relationships among Correlation clusters.
//!
//! # The Algorithm (Achtert et al., 2007)
//!
//! ERiC finds correlation clusters like COPAC and then arranges them in a
//! hierarchy: a line lying inside a plane becomes a child of that plane.
//!
//! 1. Local PCA over each point's `k` nearest neighbors.
//! 2. Generalized DBSCAN with the *strong* neighbor relation: same
//!    correlation dimension, mutually approximately linearly dependent strong
//!    eigenvectors, and each point within `tau` of the other's subspace.
//! 3. Partition the flat clusters by correlation dimension and give each a
//!    [`CorrelationModel`] (PCA restricted to that dimension plus centroid).
//!    Noise and full-dimensional clusters merge into one `[noise]` cluster.
//! 4. Build the hierarchy bottom-up with the *weak* relation: a
//!    higher-dimensional cluster is a parent if its subspace contains the
//!    child's strong directions (within `delta`) and the child's centroid
//!    (within `tau`).
//!
//! ## Approximate linear dependence
//!
//! The strong eigenvectors of `b` are approximately linearly dependent on
//! those of `a` when every strong eigenvector `s` of `b` has a small residual
//! outside `a`'s subspace:
//!
//! ```text
//!   sᵀ M̂ₐ s ≤ δ²
//! ```
//!
//! ## Hierarchy construction order
//!
//! Whether a candidate parent is accepted depends on the parents a child
//! already has (see [`Eric::run`]), so the result depends on the order
//! clusters are visited in. Clusters are visited by ascending dimensionality
//! and then in creation order.
//!
//! ## References
//!
//! Achtert, Böhm, Kriegel, Kröger, Zimek (2007). "On Exploring Complex
//! Relationships of Correlation Clusters." SSDBM.

use tracing::{debug, info, trace};

use crate::cluster::{
    Cluster, ClusterModel, ClusteringAlgorithm, Clustering, CorrelationModel, GeneralizedDbscan,
    MinPtsCorePredicate, NeighborPredicate,
};
use crate::error::{Error, Result};
use crate::linalg;
use crate::pca::{EigenPairFilter, PcaFilteredResult, PcaResult, PcaRunner, WeightFunction};
use crate::progress::Progress;
use crate::relation::{PointId, Relation};

use super::{identical, LocalPca, Memo, Neighborhood};

/// ERiC neighbor predicate settings.
#[derive(Debug, Clone, Copy)]
pub struct EricNeighborPredicate {
    k: usize,
    delta: f64,
    tau: f64,
    filter: EigenPairFilter,
    weight: WeightFunction,
}

impl EricNeighborPredicate {
    /// PCA over `k` nearest neighbors, default tolerances.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            delta: 0.1,
            tau: 0.1,
            filter: EigenPairFilter::default(),
            weight: WeightFunction::Constant,
        }
    }

    /// Tolerance for approximate linear dependence (default 0.1).
    pub fn with_delta(mut self, delta: f64) -> Self {
        self.delta = delta;
        self
    }

    /// Maximum distance between parallel subspaces (default 0.1).
    pub fn with_tau(mut self, tau: f64) -> Self {
        self.tau = tau;
        self
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
        if !(self.delta >= 0.0) {
            return Err(Error::InvalidParameter {
                name: "delta",
                message: "must be non-negative",
            });
        }
        if !(self.tau >= 0.0) {
            return Err(Error::InvalidParameter {
                name: "tau",
                message: "must be non-negative",
            });
        }
        self.filter.validate()
    }

    /// Bind to a relation.
    pub fn instantiate<'a>(&self, relation: &'a Relation) -> EricNeighbors<'a> {
        EricNeighbors {
            relation,
            settings: *self,
            local: LocalPca {
                neighborhood: Neighborhood::Knn(self.k),
                runner: PcaRunner::new().with_weight(self.weight),
                filter: self.filter,
            },
            models: Memo::new(relation.len()),
        }
    }

    /// Whether the strong eigenvectors of `b` lie in the subspace of `a`.
    pub fn approximately_linear_dependent(
        &self,
        a: &PcaFilteredResult,
        b: &PcaFilteredResult,
    ) -> bool {
        let m = a.dissimilarity_matrix();
        let delta_sq = self.delta * self.delta;
        b.strong_eigenvectors().column_iter().all(|s| {
            let s = s.clone_owned();
            linalg::quadratic_form(&s, m) <= delta_sq
        })
    }

    /// The asymmetric cluster-level relation used to build the hierarchy.
    ///
    /// The model with the larger correlation dimension plays the parent: its
    /// subspace must contain the other's strong directions, and the centroid
    /// difference must be within `tau` of it.
    pub fn weak_neighbors(&self, a: &CorrelationModel, b: &CorrelationModel) -> bool {
        let (hi, lo) = if a.dimensionality() >= b.dimensionality() {
            (a, b)
        } else {
            (b, a)
        };
        if !self.approximately_linear_dependent(&hi.pca, &lo.pca) {
            return false;
        }
        let diff = &hi.centroid - &lo.centroid;
        let dist = hi.pca.weak_distance_sq(&diff).sqrt();
        dist <= self.tau
    }
}

/// [`EricNeighborPredicate`] bound to a relation.
#[derive(Debug)]
pub struct EricNeighbors<'a> {
    relation: &'a Relation,
    settings: EricNeighborPredicate,
    local: LocalPca,
    models: Memo<PcaFilteredResult>,
}

impl EricNeighbors<'_> {
    /// Local PCA of a point, computed on first use.
    pub fn local_pca(&self, id: PointId) -> &PcaFilteredResult {
        self.models
            .get_or_init(id, || self.local.compute(self.relation, id))
    }

    /// The symmetric point-level relation.
    pub fn strong_neighbors(&self, p: PointId, q: PointId) -> bool {
        if identical(self.relation, p, q) {
            return true;
        }
        let pp = self.local_pca(p);
        let pq = self.local_pca(q);
        if pp.correlation_dimension() != pq.correlation_dimension() {
            return false;
        }
        let s = &self.settings;
        if !s.approximately_linear_dependent(pp, pq) || !s.approximately_linear_dependent(pq, pp) {
            return false;
        }
        let diff = self.relation.get(p) - self.relation.get(q);
        pp.weak_distance_sq(&diff).sqrt() <= s.tau && pq.weak_distance_sq(&diff).sqrt() <= s.tau
    }
}

impl NeighborPredicate for EricNeighbors<'_> {
    fn neighbors(&self, id: PointId) -> Vec<PointId> {
        self.relation
            .ids()
            .filter(|&q| self.strong_neighbors(id, q))
            .collect()
    }

    fn dimensionality(&self, id: PointId) -> usize {
        self.local_pca(id).correlation_dimension()
    }
}

/// ERiC clustering.
#[derive(Debug, Clone)]
pub struct Eric {
    npred: EricNeighborPredicate,
    minpts: usize,
    progress: Progress,
}

impl Eric {
    /// Create an ERiC run with PCA over `k` nearest neighbors and MinPts `minpts`.
    pub fn new(k: usize, minpts: usize) -> Self {
        Self {
            npred: EricNeighborPredicate::new(k),
            minpts,
            progress: Progress::none(),
        }
    }

    /// Tolerance for approximate linear dependence (default 0.1).
    pub fn with_delta(mut self, delta: f64) -> Self {
        self.npred = self.npred.with_delta(delta);
        self
    }

    /// Maximum distance between parallel subspaces (default 0.1).
    pub fn with_tau(mut self, tau: f64) -> Self {
        self.npred = self.npred.with_tau(tau);
        self
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

    /// Group the flat clusters into buckets by correlation dimension.
    ///
    /// Bucket `dim` holds the merged noise. Empty buckets at the top are
    /// dropped, so the last bucket is the highest dimensionality found.
    fn extract_correlation_clusters(
        &self,
        flat: Clustering<ClusterModel>,
        relation: &Relation,
        npred: &EricNeighbors<'_>,
    ) -> Vec<Vec<Cluster<CorrelationModel>>> {
        let dim = relation.dimensionality();
        let runner = &npred.local.runner;
        let mut buckets: Vec<Vec<Cluster<CorrelationModel>>> =
            (0..=dim).map(|_| Vec::new()).collect();
        let mut noise: Vec<PointId> = Vec::new();

        for cluster in flat.into_clusters() {
            let corr_dim = match cluster.ids().first() {
                Some(&first) if !cluster.is_noise() => npred.dimensionality(first),
                _ => dim,
            };
            if corr_dim < dim {
                let name = format!("[{}_{}]", corr_dim, buckets[corr_dim].len());
                let ids = cluster.ids().to_vec();
                let model = correlation_model(runner, relation, &ids, corr_dim);
                buckets[corr_dim].push(Cluster::new(name, ids, model));
            } else {
                noise.extend_from_slice(cluster.ids());
            }
        }

        if !noise.is_empty() {
            noise.sort_unstable();
            let model = correlation_model(runner, relation, &noise, dim);
            buckets[dim].push(Cluster::noise("[noise]", noise, model));
        }

        while buckets.len() > 1 && buckets.last().is_some_and(|b| b.is_empty()) {
            buckets.pop();
        }
        buckets
    }

    /// Whether `parent` is weakly related to one of `existing`, the parents
    /// a child already has.
    ///
    /// Returns false as soon as an existing parent has the candidate's
    /// dimensionality, so the answer depends on the order of `existing`.
    fn is_parent(
        &self,
        clustering: &Clustering<CorrelationModel>,
        parent: usize,
        existing: &[usize],
    ) -> bool {
        let p = clustering.cluster(parent).model();
        for &other in existing {
            let o = clustering.cluster(other).model();
            if p.dimensionality() == o.dimensionality() {
                return false;
            }
            if self.npred.weak_neighbors(p, o) {
                return true;
            }
        }
        false
    }

    fn build_hierarchy(
        &self,
        buckets: Vec<Vec<Cluster<CorrelationModel>>>,
    ) -> Clustering<CorrelationModel> {
        let lambda_max = buckets.len() - 1;
        let mut clustering = Clustering::new("ERiC Clustering");
        let mut layers: Vec<Vec<usize>> = Vec::with_capacity(buckets.len());
        for bucket in buckets {
            let layer = bucket.into_iter().map(|c| clustering.add_cluster(c)).collect();
            layers.push(layer);
        }

        for child_dim in 0..lambda_max {
            for &child in &layers[child_dim] {
                for parent_layer in &layers[child_dim + 1..] {
                    for &parent in parent_layer {
                        let parent_dim = clustering.cluster(parent).model().dimensionality();
                        let orphan = clustering.parents(child).is_empty();
                        let link = if parent_dim == lambda_max && orphan {
                            true
                        } else {
                            let related = self.npred.weak_neighbors(
                                clustering.cluster(parent).model(),
                                clustering.cluster(child).model(),
                            );
                            let siblings = clustering.parents(child);
                            related && (orphan || !self.is_parent(&clustering, parent, siblings))
                        };
                        if link {
                            trace!(
                                parent = clustering.cluster(parent).name(),
                                child = clustering.cluster(child).name(),
                                "hierarchy edge"
                            );
                            clustering.add_child(parent, child);
                        }
                    }
                }
            }
        }

        for &top in &layers[lambda_max] {
            clustering.mark_toplevel(top);
        }
        clustering
    }
}

/// PCA over a cluster, split after its correlation dimension.
fn correlation_model(
    runner: &PcaRunner,
    relation: &Relation,
    ids: &[PointId],
    corr_dim: usize,
) -> CorrelationModel {
    let res = runner
        .process_ids(relation, ids)
        .unwrap_or_else(|_| PcaResult::axis_aligned(relation.dimensionality()));
    CorrelationModel {
        pca: PcaFilteredResult::with_dimension(res, corr_dim),
        centroid: relation.centroid(ids),
    }
}

impl ClusteringAlgorithm for Eric {
    type Model = CorrelationModel;

    /// Cluster and build the hierarchy.
    ///
    /// Clusters are visited by ascending dimensionality. A child gets an edge
    /// from a candidate parent when either
    ///
    /// - the candidate has the top dimensionality and the child has no
    ///   parent yet, or
    /// - the candidate is weakly related to the child, and the child has no
    ///   parent yet or none of its parents is weakly related to the
    ///   candidate (an existing parent of the candidate's dimensionality
    ///   stops that scan early).
    fn run(&self, relation: &Relation) -> Result<Clustering<CorrelationModel>> {
        self.validate()?;
        let npred = self.npred.instantiate(relation);

        self.progress.step(1, 3, "preprocessing and clustering");
        let gdbscan = GeneralizedDbscan::new(&npred, MinPtsCorePredicate::new(self.minpts))
            .with_progress(self.progress.clone());
        let flat = gdbscan.run(relation);
        debug!(clusters = flat.len(), "ERiC density clustering done");

        self.progress.step(2, 3, "extracting correlation clusters");
        let buckets = self.extract_correlation_clusters(flat, relation, &npred);
        debug!(
            clusters = buckets.iter().map(Vec::len).sum::<usize>(),
            lambda_max = buckets.len() - 1,
            "correlation clusters extracted"
        );

        self.progress.step(3, 3, "building hierarchy");
        let clustering = self.build_hierarchy(buckets);
        info!(
            clusters = clustering.len(),
            edges = clustering.edges().count(),
            "ERiC finished"
        );
        Ok(clustering)
    }
}
