use super::model::Clustering;
use crate::error::Result;
use crate::relation::{PointId, Relation};

/// Common interface for algorithms producing a [`Clustering`].
pub trait ClusteringAlgorithm {
    /// Model attached to each cluster.
    type Model;

    /// Cluster the points of `relation`.
    fn run(&self, relation: &Relation) -> Result<Clustering<Self::Model>>;

    /// Cluster raw rows and return one label per row.
    ///
    /// Labels are cluster indices into the result; noise is labeled
    /// [`NOISE`](super::NOISE).
    fn fit_predict(&self, data: &[Vec<f64>]) -> Result<Vec<usize>> {
        let relation = Relation::new(data)?;
        let clustering = self.run(&relation)?;
        Ok(clustering.labels(relation.len()))
    }
}

/// Which points count as neighbors of a point.
///
/// Implementations are per-run instances bound to one relation; they may
/// cache per-point state internally.
pub trait NeighborPredicate {
    /// Neighbors of `id` in ascending id order, `id` itself included.
    fn neighbors(&self, id: PointId) -> Vec<PointId>;

    /// Local dimensionality of `id`.
    fn dimensionality(&self, id: PointId) -> usize;
}

impl<T: NeighborPredicate + ?Sized> NeighborPredicate for &T {
    fn neighbors(&self, id: PointId) -> Vec<PointId> {
        (**self).neighbors(id)
    }

    fn dimensionality(&self, id: PointId) -> usize {
        (**self).dimensionality(id)
    }
}

/// Whether a point is dense enough to grow a cluster from.
pub trait CorePredicate {
    /// `neighbors` is the result of [`NeighborPredicate::neighbors`] for `id`.
    fn is_core(&self, id: PointId, neighbors: &[PointId]) -> bool;
}
