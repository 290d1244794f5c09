//! Generalized DBSCAN.
//!
//! # The Algorithm (Sander et al., 1998)
//!
//! DBSCAN (Ester et al., 1996) grows clusters from dense points through their
//! ε-neighborhoods. Generalized DBSCAN keeps the same expansion but makes the
//! two ingredients pluggable:
//!
//! - a [`NeighborPredicate`] deciding which points are neighbors, and
//! - a [`CorePredicate`] deciding whether a neighborhood is dense enough.
//!
//! Plain DBSCAN is the pair ([`EpsilonNeighborPredicate`],
//! [`MinPtsCorePredicate`]). The correlation clustering algorithms in
//! [`crate::correlation`] replace the neighbor predicate with one that also
//! compares local subspaces.
//!
//! ## Core Concepts
//!
//! - **Core point**: its neighborhood satisfies the core predicate.
//! - **Border point**: a neighbor of a core point but not core itself.
//! - **Noise point**: neither core nor border.
//!
//! ## Algorithm Steps
//!
//! 1. Visit points in id order. Skip points already assigned.
//! 2. A non-core point is tentatively marked noise.
//! 3. A core point starts a new cluster. Every neighbor joins it (noise is
//!    promoted to border); unvisited neighbors go on a work list.
//! 4. Work-list points that are core add their neighbors the same way.
//!    Border points are never expanded.
//! 5. Points still marked noise form a single noise cluster.
//!
//! Visiting in id order makes cluster numbering reproducible.
//!
//! ## References
//!
//! Sander, Ester, Kriegel, Xu (1998). "Density-Based Clustering in Spatial
//! Databases: The Algorithm GDBSCAN and Its Applications." DMKD 2(2).

use tracing::debug;

use super::model::{Cluster, ClusterModel, Clustering};
use super::traits::{ClusteringAlgorithm, CorePredicate, NeighborPredicate};
use crate::error::{Error, Result};
use crate::progress::Progress;
use crate::relation::{PointId, Relation};

// Labels >= 0 are cluster indices. Tentative noise can still be claimed as
// a border point by a later cluster.
const UNCLASSIFIED: isize = -2;
const NOISE_LABEL: isize = -1;

/// DBSCAN over arbitrary neighbor and core predicates.
#[derive(Debug, Clone)]
pub struct GeneralizedDbscan<N, C> {
    npred: N,
    cpred: C,
    progress: Progress,
}

impl<N: NeighborPredicate, C: CorePredicate> GeneralizedDbscan<N, C> {
    /// Combine an instantiated neighbor predicate with a core predicate.
    pub fn new(npred: N, cpred: C) -> Self {
        Self {
            npred,
            cpred,
            progress: Progress::none(),
        }
    }

    /// Report processed points to `progress`.
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    /// Cluster the points of `relation`.
    ///
    /// Non-noise clusters come first, in creation order, followed by at most
    /// one noise cluster.
    pub fn run(&self, relation: &Relation) -> Clustering<ClusterModel> {
        let n = relation.len();
        let mut labels = vec![UNCLASSIFIED; n];
        let mut num_clusters = 0usize;
        let mut processed = 0usize;

        for id in relation.ids() {
            if labels[id] != UNCLASSIFIED {
                continue;
            }
            let neighbors = self.npred.neighbors(id);
            processed += 1;
            if !self.cpred.is_core(id, &neighbors) {
                labels[id] = NOISE_LABEL;
                continue;
            }

            let cluster_id = num_clusters as isize;
            num_clusters += 1;
            labels[id] = cluster_id;

            // Work list instead of recursion.
            let mut to_process = Vec::new();
            claim(&neighbors, cluster_id, &mut labels, &mut to_process);
            while let Some(q) = to_process.pop() {
                let q_neighbors = self.npred.neighbors(q);
                processed += 1;
                if self.cpred.is_core(q, &q_neighbors) {
                    claim(&q_neighbors, cluster_id, &mut labels, &mut to_process);
                }
            }
            self.progress.processed(processed, n);
        }
        self.progress.processed(n, n);

        let mut members: Vec<Vec<PointId>> = vec![Vec::new(); num_clusters];
        let mut noise = Vec::new();
        for (id, &l) in labels.iter().enumerate() {
            if l >= 0 {
                members[l as usize].push(id);
            } else {
                noise.push(id);
            }
        }
        debug!(
            clusters = num_clusters,
            noise = noise.len(),
            "generalized dbscan finished"
        );

        let mut clustering = Clustering::new("Generalized DBSCAN Clustering");
        for (i, ids) in members.into_iter().enumerate() {
            clustering.add_toplevel(Cluster::new(format!("cluster_{i}"), ids, ClusterModel));
        }
        if !noise.is_empty() {
            clustering.add_toplevel(Cluster::noise("noise", noise, ClusterModel));
        }
        clustering
    }
}

/// Assign `neighbors` to `cluster_id`.
///
/// A point previously labeled noise can become a border point; its
/// neighborhood was already found not to be core, so it is not queued.
fn claim(
    neighbors: &[PointId],
    cluster_id: isize,
    labels: &mut [isize],
    to_process: &mut Vec<PointId>,
) {
    for &nb in neighbors {
        match labels[nb] {
            UNCLASSIFIED => {
                labels[nb] = cluster_id;
                to_process.push(nb);
            }
            NOISE_LABEL => labels[nb] = cluster_id,
            _ => {}
        }
    }
}

/// Euclidean ε-range neighborhoods.
#[derive(Debug, Clone, Copy)]
pub struct EpsilonNeighborPredicate {
    epsilon: f64,
}

impl EpsilonNeighborPredicate {
    /// Neighbors are points within distance `epsilon` (inclusive).
    pub fn new(epsilon: f64) -> Self {
        Self { epsilon }
    }

    /// Bind to a relation.
    pub fn instantiate<'a>(&self, relation: &'a Relation) -> EpsilonNeighbors<'a> {
        EpsilonNeighbors {
            relation,
            epsilon: self.epsilon,
        }
    }
}

/// [`EpsilonNeighborPredicate`] bound to a relation.
#[derive(Debug, Clone, Copy)]
pub struct EpsilonNeighbors<'a> {
    relation: &'a Relation,
    epsilon: f64,
}

impl NeighborPredicate for EpsilonNeighbors<'_> {
    fn neighbors(&self, id: PointId) -> Vec<PointId> {
        self.relation
            .range(id, self.epsilon)
            .into_iter()
            .map(|n| n.id)
            .collect()
    }

    fn dimensionality(&self, _id: PointId) -> usize {
        self.relation.dimensionality()
    }
}

/// Core iff the neighborhood (point included) holds at least `minpts` points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinPtsCorePredicate {
    minpts: usize,
}

impl MinPtsCorePredicate {
    /// Require `minpts` neighbors.
    pub fn new(minpts: usize) -> Self {
        Self { minpts }
    }
}

impl CorePredicate for MinPtsCorePredicate {
    fn is_core(&self, _id: PointId, neighbors: &[PointId]) -> bool {
        neighbors.len() >= self.minpts
    }
}

/// Plain DBSCAN: [`GeneralizedDbscan`] with Euclidean ε-ranges and a
/// point count.
#[derive(Debug, Clone)]
pub struct Dbscan {
    epsilon: f64,
    minpts: usize,
    progress: Progress,
}

impl Dbscan {
    /// Neighbors lie within `epsilon`; a core point needs `minpts` of them,
    /// itself included.
    pub fn new(epsilon: f64, minpts: usize) -> Self {
        Self {
            epsilon,
            minpts,
            progress: Progress::none(),
        }
    }

    /// Neighborhood radius.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Core threshold.
    pub fn with_minpts(mut self, minpts: usize) -> Self {
        self.minpts = minpts;
        self
    }

    /// Report progress to `progress`.
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.epsilon > 0.0) {
            return Err(Error::InvalidParameter {
                name: "epsilon",
                message: "must be positive",
            });
        }
        if self.minpts == 0 {
            return Err(Error::InvalidParameter {
                name: "minpts",
                message: "must be at least 1",
            });
        }
        Ok(())
    }
}

impl Default for Dbscan {
    fn default() -> Self {
        Self::new(0.5, 5)
    }
}

impl ClusteringAlgorithm for Dbscan {
    type Model = ClusterModel;

    fn run(&self, relation: &Relation) -> Result<Clustering<ClusterModel>> {
        self.validate()?;
        let npred = EpsilonNeighborPredicate::new(self.epsilon).instantiate(relation);
        let gdbscan = GeneralizedDbscan::new(npred, MinPtsCorePredicate::new(self.minpts))
            .with_progress(self.progress.clone());
        Ok(gdbscan.run(relation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::NOISE;

    #[test]
    fn separated_blobs() {
        let data = vec![
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![0.0, 0.1],
            vec![0.1, 0.1],
            vec![0.05, 0.05],
            vec![5.0, 5.0],
            vec![5.1, 5.0],
            vec![5.0, 5.1],
            vec![5.1, 5.1],
            vec![5.05, 5.05],
        ];

        let labels = Dbscan::new(0.3, 3).fit_predict(&data).unwrap();
        assert!(labels[1..5].iter().all(|&l| l == labels[0]));
        assert!(labels[6..10].iter().all(|&l| l == labels[5]));
        assert_ne!(labels[0], labels[5]);
        // First cluster found gets index 0.
        assert_eq!(labels[0], 0);
    }

    #[test]
    fn isolated_point_is_noise() {
        let data = vec![
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![0.0, 0.1],
            vec![0.1, 0.1],
            vec![100.0, 100.0],
            vec![5.0, 5.0],
            vec![5.1, 5.0],
            vec![5.0, 5.1],
            vec![5.1, 5.1],
        ];

        let labels = Dbscan::new(0.3, 3).fit_predict(&data).unwrap();
        assert_eq!(labels[4], NOISE);
        for (i, &label) in labels.iter().enumerate() {
            if i != 4 {
                assert_ne!(label, NOISE);
            }
        }
    }

    #[test]
    fn sparse_points_form_one_noise_cluster() {
        let data = vec![
            vec![0.0, 0.0],
            vec![10.0, 0.0],
            vec![0.0, 10.0],
            vec![10.0, 10.0],
        ];
        let rel = Relation::new(&data).unwrap();
        let clustering = Dbscan::new(0.5, 3).run(&rel).unwrap();
        assert_eq!(clustering.len(), 1);
        let noise = clustering.cluster(0);
        assert!(noise.is_noise());
        assert_eq!(noise.ids(), &[0, 1, 2, 3]);
    }

    #[test]
    fn minpts_above_size_is_all_noise() {
        let data: Vec<Vec<f64>> = (0..5).map(|i| vec![i as f64 * 0.1]).collect();
        let rel = Relation::new(&data).unwrap();
        let clustering = Dbscan::new(10.0, 6).run(&rel).unwrap();
        assert_eq!(clustering.non_noise().count(), 0);
        assert_eq!(clustering.len(), 1);
        assert_eq!(clustering.cluster(0).len(), 5);
    }

    #[test]
    fn border_point_promoted_from_noise() {
        // Point 0 is visited first and is not core; point 1 is core and reaches it.
        let data = vec![vec![0.0], vec![1.0], vec![1.5], vec![2.0]];
        let labels = Dbscan::new(1.0, 3).fit_predict(&data).unwrap();
        assert_eq!(labels, vec![0, 0, 0, 0]);
    }

    #[test]
    fn empty_input_is_rejected() {
        let data: Vec<Vec<f64>> = vec![];
        assert!(Dbscan::new(0.5, 3).fit_predict(&data).is_err());
    }

    #[test]
    fn invalid_parameters() {
        let data = vec![vec![1.0, 2.0]];
        assert!(Dbscan::new(0.0, 3).fit_predict(&data).is_err());
        assert!(Dbscan::new(-1.0, 3).fit_predict(&data).is_err());
        assert!(Dbscan::new(f64::NAN, 3).fit_predict(&data).is_err());
        assert!(Dbscan::new(0.5, 0).fit_predict(&data).is_err());
    }

    #[test]
    fn chain_is_density_connected() {
        let data: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64 * 0.3, 0.0]).collect();
        let labels = Dbscan::new(0.5, 2).fit_predict(&data).unwrap();
        assert!(labels.iter().all(|&l| l == labels[0]));
    }

    #[test]
    fn minpts_counts_the_point_itself() {
        let cpred = MinPtsCorePredicate::new(3);
        assert!(!cpred.is_core(0, &[0, 1]));
        assert!(cpred.is_core(0, &[0, 1, 2]));
    }

    #[test]
    fn custom_core_predicate() {
        struct OddIdsAreCore;
        impl CorePredicate for OddIdsAreCore {
            fn is_core(&self, id: PointId, _: &[PointId]) -> bool {
                id % 2 == 1
            }
        }
        // Three isolated pairs; only pairs containing an odd id can form.
        let data = vec![
            vec![0.0],
            vec![0.1],
            vec![10.0],
            vec![10.1],
            vec![20.0],
        ];
        let rel = Relation::new(&data).unwrap();
        let npred = EpsilonNeighborPredicate::new(0.5).instantiate(&rel);
        let clustering = GeneralizedDbscan::new(npred, OddIdsAreCore).run(&rel);
        assert_eq!(clustering.non_noise().count(), 2);
        assert_eq!(clustering.cluster(0).ids(), &[0, 1]);
        assert_eq!(clustering.cluster(1).ids(), &[2, 3]);
        assert!(clustering.cluster(2).is_noise());
        assert_eq!(clustering.cluster(2).ids(), &[4]);
    }
}
