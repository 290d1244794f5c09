//! In-memory point set with stable ids and neighbor queries.
//!
//! Every algorithm in this crate reads its input through a [`Relation`]: an
//! immutable mapping from a [`PointId`] (the insertion index) to a vector of
//! the relation's declared dimensionality.
//!
//! Neighbor queries are brute force. Results are ordered deterministically
//! (by distance, ties broken by id) so that cluster numbering is reproducible.

use nalgebra::DVector;

use crate::error::{Error, Result};
use crate::linalg;

/// Stable identifier of a point: its index in insertion order.
pub type PointId = usize;

/// A query result: a point id and its Euclidean distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Id of the neighbor.
    pub id: PointId,
    /// Euclidean distance to the query.
    pub distance: f64,
}

/// A fixed-size collection of equal-length real vectors.
#[derive(Debug, Clone)]
pub struct Relation {
    points: Vec<DVector<f64>>,
    dim: usize,
}

impl Relation {
    /// Build a relation from row vectors.
    ///
    /// Fails on empty input, zero-dimensional rows, or rows of differing length.
    pub fn new(data: &[Vec<f64>]) -> Result<Self> {
        let first = data.first().ok_or(Error::EmptyInput)?;
        let dim = first.len();
        if dim == 0 {
            return Err(Error::InvalidParameter {
                name: "dimension",
                message: "must be at least 1",
            });
        }
        let mut points = Vec::with_capacity(data.len());
        for row in data {
            if row.len() != dim {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    found: row.len(),
                });
            }
            points.push(DVector::from_column_slice(row));
        }
        Ok(Self { points, dim })
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the relation holds no points (never true for a constructed relation).
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Declared dimensionality of every vector.
    pub fn dimensionality(&self) -> usize {
        self.dim
    }

    /// All ids in insertion order.
    pub fn ids(&self) -> std::ops::Range<PointId> {
        0..self.points.len()
    }

    /// Vector of a point.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range; use [`Relation::try_get`] for untrusted ids.
    #[inline]
    pub fn get(&self, id: PointId) -> &DVector<f64> {
        &self.points[id]
    }

    /// Vector of a point, or [`Error::UnknownId`].
    pub fn try_get(&self, id: PointId) -> Result<&DVector<f64>> {
        self.points.get(id).ok_or(Error::UnknownId {
            id,
            len: self.points.len(),
        })
    }

    /// The `k` nearest neighbors of a stored point, including the point itself.
    pub fn knn(&self, id: PointId, k: usize) -> Vec<Neighbor> {
        self.knn_vector(self.get(id), k)
    }

    /// The `k` nearest stored points to an arbitrary query vector.
    ///
    /// Ordered by ascending distance; equal distances are ordered by id.
    pub fn knn_vector(&self, query: &DVector<f64>, k: usize) -> Vec<Neighbor> {
        let mut all: Vec<Neighbor> = self
            .points
            .iter()
            .enumerate()
            .map(|(id, v)| Neighbor {
                id,
                distance: linalg::squared_euclidean(query, v).sqrt(),
            })
            .collect();
        let k = k.min(all.len());
        if k == 0 {
            return Vec::new();
        }
        let by_distance =
            |a: &Neighbor, b: &Neighbor| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id));
        if k < all.len() {
            all.select_nth_unstable_by(k - 1, by_distance);
            all.truncate(k);
        }
        all.sort_by(by_distance);
        all
    }

    /// All points within Euclidean distance `epsilon` of a stored point, ordered by id.
    pub fn range(&self, id: PointId, epsilon: f64) -> Vec<Neighbor> {
        let query = self.get(id);
        let eps_sq = epsilon * epsilon;
        self.points
            .iter()
            .enumerate()
            .filter_map(|(other, v)| {
                let d2 = linalg::squared_euclidean(query, v);
                (d2 <= eps_sq).then(|| Neighbor {
                    id: other,
                    distance: d2.sqrt(),
                })
            })
            .collect()
    }

    /// Arithmetic mean of the named points.
    ///
    /// Returns the zero vector for an empty id set.
    pub fn centroid(&self, ids: &[PointId]) -> DVector<f64> {
        let mut sum = DVector::zeros(self.dim);
        if ids.is_empty() {
            return sum;
        }
        for &id in ids {
            sum += &self.points[id];
        }
        sum / ids.len() as f64
    }
}
