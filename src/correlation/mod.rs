//! Correlation clustering: clusters on arbitrarily oriented subspaces.
//!
//! A *correlation cluster* is a set of points close to a common affine
//! subspace, e.g. points scattered along a line or a plane that is not
//! aligned with the coordinate axes. Plain density clustering cannot see
//! such structure: points along a long line are far apart in Euclidean terms
//! while an unrelated point may sit right next to the line.
//!
//! The algorithms here combine local PCA ([`crate::pca`]) with a density-based
//! core:
//!
//! | Algorithm | Local model | Engine | Result |
//! |---|---|---|---|
//! | [`Copac`] | PCA of the k nearest neighbors | generalized DBSCAN | flat, [`DimensionModel`](crate::cluster::DimensionModel) |
//! | [`Eric`] | PCA of the k nearest neighbors | generalized DBSCAN | hierarchy, [`CorrelationModel`](crate::cluster::CorrelationModel) |
//! | [`FourC`] | PCA of the ε-range | generalized DBSCAN | flat, [`ClusterModel`](crate::cluster::ClusterModel) |
//! | [`HiCO`] | PCA of the k nearest neighbors | generalized OPTICS | [`ClusterOrder`](crate::cluster::ClusterOrder) |
//! | [`Orclus`] | PCA of the current assignment | k-means style iteration | flat, [`SubspaceModel`](crate::cluster::SubspaceModel) |
//! | [`Lmclus`] | sampled manifolds | histogram separation | flat, [`DimensionModel`](crate::cluster::DimensionModel) |
//!
//! ## Usage
//!
//! ```rust
//! use corrclust::cluster::ClusteringAlgorithm;
//! use corrclust::correlation::Copac;
//!
//! // Two parallel lines in 3-D.
//! let mut data = Vec::new();
//! for i in 0..30 {
//!     let t = i as f64 * 0.1;
//!     data.push(vec![t, t, 0.0]);
//!     data.push(vec![t, t, 5.0]);
//! }
//!
//! let labels = Copac::new(6, 0.1, 4).fit_predict(&data).unwrap();
//! assert_eq!(labels.len(), data.len());
//! assert_eq!(labels[0], labels[2]);
//! assert_ne!(labels[0], labels[1]);
//! ```

mod copac;
mod eric;
mod fourc;
mod hico;
mod lmclus;
mod orclus;

pub use copac::{Copac, CopacNeighborPredicate, CopacNeighbors};
pub use eric::{Eric, EricNeighborPredicate, EricNeighbors};
pub use fourc::{FourC, FourCCorePredicate, FourCNeighborPredicate, FourCNeighbors};
pub use hico::HiCO;
pub use lmclus::Lmclus;
pub use orclus::Orclus;

use std::cell::OnceCell;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::linalg;
use crate::pca::{EigenPairFilter, PcaFilteredResult, PcaRunner};
use crate::relation::{PointId, Relation};

/// Per-point values computed on first use and kept for the rest of a run.
#[derive(Debug)]
pub(crate) struct Memo<T> {
    slots: Vec<OnceCell<T>>,
}

impl<T> Memo<T> {
    pub(crate) fn new(n: usize) -> Self {
        Self {
            slots: (0..n).map(|_| OnceCell::new()).collect(),
        }
    }

    pub(crate) fn get_or_init(&self, id: PointId, f: impl FnOnce() -> T) -> &T {
        self.slots[id].get_or_init(f)
    }
}

/// Which points a local PCA is computed over.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Neighborhood {
    /// The `k` nearest neighbors, the point included.
    Knn(usize),
    /// All points within Euclidean distance `epsilon`.
    Range(f64),
}

/// Local PCA of a point's neighborhood.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LocalPca {
    pub(crate) neighborhood: Neighborhood,
    pub(crate) runner: PcaRunner,
    pub(crate) filter: EigenPairFilter,
}

impl LocalPca {
    /// Neighborhood ids of `id`.
    pub(crate) fn neighborhood(&self, relation: &Relation, id: PointId) -> Vec<PointId> {
        let neighbors = match self.neighborhood {
            Neighborhood::Knn(k) => relation.knn(id, k),
            Neighborhood::Range(eps) => relation.range(id, eps),
        };
        neighbors.into_iter().map(|n| n.id).collect()
    }

    /// Filtered PCA of the neighborhood of `id`.
    ///
    /// Neighborhoods of fewer than two points carry no correlation: the
    /// result is full-dimensional with no weak eigenvectors.
    pub(crate) fn compute(&self, relation: &Relation, id: PointId) -> PcaFilteredResult {
        let ids = self.neighborhood(relation, id);
        match self.runner.process_ids(relation, &ids) {
            Ok(res) => PcaFilteredResult::new(res, &self.filter),
            Err(_) => PcaFilteredResult::full_dimensional(relation.dimensionality()),
        }
    }
}

/// Whether two stored points have identical coordinates.
#[inline]
pub(crate) fn identical(relation: &Relation, p: PointId, q: PointId) -> bool {
    p == q || linalg::squared_euclidean(relation.get(p), relation.get(q)) == 0.0
}

/// Seeded generator when a seed is given, OS-seeded otherwise.
pub(crate) fn make_rng(seed: Option<u64>) -> Box<dyn RngCore> {
    match seed {
        Some(s) => Box::new(StdRng::seed_from_u64(s)),
        None => Box::new(rand::rng()),
    }
}
