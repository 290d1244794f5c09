//! Clustering results: clusters, their models, and the cluster hierarchy.

use nalgebra::{DMatrix, DVector};

use crate::pca::PcaFilteredResult;
use crate::relation::PointId;

/// Label given to noise points by [`Clustering::labels`].
pub const NOISE: usize = usize::MAX;

/// Model of a cluster found by density alone (no subspace information).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterModel;

/// A cluster's subspace dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionModel {
    /// Correlation dimension of the cluster members.
    pub dimensionality: usize,
}

/// A cluster's local PCA and centroid.
#[derive(Debug, Clone)]
pub struct CorrelationModel {
    /// PCA over the cluster members, split at the cluster's dimensionality.
    pub pca: PcaFilteredResult,
    /// Mean of the cluster members.
    pub centroid: DVector<f64>,
}

impl CorrelationModel {
    /// Correlation dimension of the cluster.
    pub fn dimensionality(&self) -> usize {
        self.pca.correlation_dimension()
    }
}

/// A projected cluster: centroid plus the directions it is compact along.
#[derive(Debug, Clone)]
pub struct SubspaceModel {
    /// Mean of the cluster members.
    pub centroid: DVector<f64>,
    /// Least-variance directions as matrix columns.
    pub basis: DMatrix<f64>,
}

/// A set of point ids with a model attached.
#[derive(Debug, Clone)]
pub struct Cluster<M> {
    name: String,
    ids: Vec<PointId>,
    noise: bool,
    model: M,
}

impl<M> Cluster<M> {
    /// A regular cluster.
    pub fn new(name: impl Into<String>, ids: Vec<PointId>, model: M) -> Self {
        Self {
            name: name.into(),
            ids,
            noise: false,
            model,
        }
    }

    /// A cluster holding points not assigned elsewhere.
    pub fn noise(name: impl Into<String>, ids: Vec<PointId>, model: M) -> Self {
        Self {
            noise: true,
            ..Self::new(name, ids, model)
        }
    }

    /// Display name, e.g. `cluster_0` or `[1_0]`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member ids in ascending order.
    pub fn ids(&self) -> &[PointId] {
        &self.ids
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the cluster has no members.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Whether this is a noise cluster.
    pub fn is_noise(&self) -> bool {
        self.noise
    }

    /// Attached model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Replace the model, keeping name, ids and noise flag.
    pub fn map_model<N>(self, f: impl FnOnce(&[PointId], M) -> N) -> Cluster<N> {
        let model = f(&self.ids, self.model);
        Cluster {
            name: self.name,
            ids: self.ids,
            noise: self.noise,
            model,
        }
    }
}

/// A named set of clusters with an optional parent/child hierarchy.
///
/// Clusters live in an arena and are addressed by their index in
/// [`Clustering::clusters`]. Flat clusterings mark every cluster top-level and
/// have no edges.
#[derive(Debug, Clone)]
pub struct Clustering<M> {
    name: String,
    clusters: Vec<Cluster<M>>,
    toplevel: Vec<usize>,
    parents: Vec<Vec<usize>>,
    children: Vec<Vec<usize>>,
}

impl<M> Clustering<M> {
    /// An empty clustering.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            clusters: Vec::new(),
            toplevel: Vec::new(),
            parents: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Name of the algorithm run that produced this result.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a cluster without marking it top-level; returns its index.
    pub fn add_cluster(&mut self, cluster: Cluster<M>) -> usize {
        self.clusters.push(cluster);
        self.parents.push(Vec::new());
        self.children.push(Vec::new());
        self.clusters.len() - 1
    }

    /// Add a top-level cluster; returns its index.
    pub fn add_toplevel(&mut self, cluster: Cluster<M>) -> usize {
        let idx = self.add_cluster(cluster);
        self.toplevel.push(idx);
        idx
    }

    /// Mark an existing cluster as top-level.
    pub fn mark_toplevel(&mut self, idx: usize) {
        if !self.toplevel.contains(&idx) {
            self.toplevel.push(idx);
        }
    }

    /// Add a `parent → child` edge. Repeated edges are ignored.
    pub fn add_child(&mut self, parent: usize, child: usize) {
        if self.children[parent].contains(&child) {
            return;
        }
        self.children[parent].push(child);
        self.parents[child].push(parent);
    }

    /// Every cluster, in insertion order.
    pub fn clusters(&self) -> &[Cluster<M>] {
        &self.clusters
    }

    /// Take the clusters out, dropping the hierarchy.
    pub fn into_clusters(self) -> Vec<Cluster<M>> {
        self.clusters
    }

    /// Cluster by index.
    pub fn cluster(&self, idx: usize) -> &Cluster<M> {
        &self.clusters[idx]
    }

    /// Number of clusters (noise clusters included).
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    /// Whether there are no clusters.
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Indices of the top-level clusters.
    pub fn toplevel(&self) -> &[usize] {
        &self.toplevel
    }

    /// Top-level clusters.
    pub fn toplevel_clusters(&self) -> impl Iterator<Item = &Cluster<M>> + '_ {
        self.toplevel.iter().map(move |&i| &self.clusters[i])
    }

    /// Parents of a cluster, in edge insertion order.
    pub fn parents(&self, idx: usize) -> &[usize] {
        &self.parents[idx]
    }

    /// Children of a cluster, in edge insertion order.
    pub fn children(&self, idx: usize) -> &[usize] {
        &self.children[idx]
    }

    /// Every `(parent, child)` edge.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.children
            .iter()
            .enumerate()
            .flat_map(|(p, cs)| cs.iter().map(move |&c| (p, c)))
    }

    /// Non-noise clusters.
    pub fn non_noise(&self) -> impl Iterator<Item = &Cluster<M>> + '_ {
        self.clusters.iter().filter(|c| !c.is_noise())
    }

    /// One label per point id in `0..n`: the index of the cluster holding
    /// it, or [`NOISE`] for noise and unassigned points.
    ///
    /// When clusters overlap, the earliest cluster wins.
    pub fn labels(&self, n: usize) -> Vec<usize> {
        let mut labels = vec![NOISE; n];
        let mut assigned = vec![false; n];
        for (idx, c) in self.clusters.iter().enumerate() {
            for &id in &c.ids {
                if id < n && !assigned[id] {
                    assigned[id] = true;
                    if !c.noise {
                        labels[id] = idx;
                    }
                }
            }
        }
        labels
    }
}
