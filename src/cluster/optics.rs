//! Generalized OPTICS: density-based cluster orderings.
//!
//! # The Algorithm (Ankerst et al., 1999)
//!
//! OPTICS does not cut the data into clusters. It emits every point once, in
//! an order where dense regions appear contiguously, together with the
//! *reachability* at which each point was reached from its predecessor. Plot
//! reachability against position and clusters show up as valleys.
//!
//! The generalized form separates the sweep from the notion of distance:
//!
//! - [`OpticsExpansion::expand`] proposes reachabilities for other points
//!   once a point is emitted,
//! - [`OpticsExpansion::compare`] orders reachabilities, and
//! - [`run_optics`] drives the sweep: always emit the best pending candidate
//!   (ties by id), start a new sweep at the lowest unprocessed id when no
//!   candidate remains.
//!
//! [`Optics`] is the classic Euclidean instance. HiCO
//! ([`crate::correlation::HiCO`]) orders by a correlation distance first.
//!
//! ## References
//!
//! Ankerst, Breunig, Kriegel, Sander (1999). "OPTICS: Ordering Points To
//! Identify the Clustering Structure." SIGMOD.

use std::cmp::Ordering;

use tracing::debug;

use crate::error::{Error, Result};
use crate::progress::Progress;
use crate::relation::{PointId, Relation};

/// A reachability value: optional correlation dimension, then a distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reachability {
    /// Correlation distance, for orderings that have one.
    pub correlation: Option<usize>,
    /// Spatial reachability distance.
    pub distance: f64,
}

impl Reachability {
    /// The reachability of the first point of a sweep.
    pub const UNDEFINED: Self = Self {
        correlation: None,
        distance: f64::INFINITY,
    };

    /// A distance-only reachability.
    pub fn distance(distance: f64) -> Self {
        Self {
            correlation: None,
            distance,
        }
    }

    /// A correlation-then-distance reachability.
    pub fn correlated(correlation: usize, distance: f64) -> Self {
        Self {
            correlation: Some(correlation),
            distance,
        }
    }

    /// Lexicographic order: correlation (undefined last), then distance.
    ///
    /// NaN distances sort after every number.
    pub fn cmp_lexicographic(&self, other: &Self) -> Ordering {
        let corr = match (self.correlation, other.correlation) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        corr.then_with(|| nan_last(self.distance, other.distance))
    }
}

fn nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (false, false) => a.total_cmp(&b),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => Ordering::Equal,
    }
}

/// One emitted point of a [`ClusterOrder`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterOrderEntry {
    /// Emitted point.
    pub id: PointId,
    /// Reachability distance; infinite at the start of a sweep.
    pub reachability: f64,
    /// Correlation distance, when the ordering has one.
    pub correlation: Option<usize>,
    /// Point this one was reached from; `None` at the start of a sweep.
    pub predecessor: Option<PointId>,
}

/// A permutation of the points with reachability annotations.
#[derive(Debug, Clone, Default)]
pub struct ClusterOrder {
    entries: Vec<ClusterOrderEntry>,
}

impl ClusterOrder {
    /// Entries in emission order.
    pub fn entries(&self) -> &[ClusterOrderEntry] {
        &self.entries
    }

    /// Ids in emission order.
    pub fn ids(&self) -> impl Iterator<Item = PointId> + '_ {
        self.entries.iter().map(|e| e.id)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the order is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The distance-specific half of an OPTICS run.
pub trait OpticsExpansion {
    /// Reachabilities offered to other points after `id` is emitted.
    ///
    /// `processed` flags already emitted points; offers to them are ignored.
    fn expand(&self, id: PointId, processed: &[bool]) -> Vec<(PointId, Reachability)>;

    /// Order of reachabilities; smaller is emitted first.
    fn compare(&self, a: &Reachability, b: &Reachability) -> Ordering {
        a.cmp_lexicographic(b)
    }
}

/// Produce the cluster order of `n` points.
pub fn run_optics<E: OpticsExpansion + ?Sized>(
    expansion: &E,
    n: usize,
    progress: &Progress,
) -> ClusterOrder {
    let mut processed = vec![false; n];
    let mut pending: Vec<Option<(Reachability, Option<PointId>)>> = vec![None; n];
    let mut entries = Vec::with_capacity(n);
    let mut sweeps = 0usize;

    for start in 0..n {
        if processed[start] {
            continue;
        }
        sweeps += 1;
        pending[start] = Some((Reachability::UNDEFINED, None));

        while let Some(id) = best_candidate(expansion, &pending, &processed) {
            let Some((reach, predecessor)) = pending[id].take() else {
                break;
            };
            processed[id] = true;
            entries.push(ClusterOrderEntry {
                id,
                reachability: reach.distance,
                correlation: reach.correlation,
                predecessor,
            });

            for (other, offer) in expansion.expand(id, &processed) {
                if processed[other] {
                    continue;
                }
                let improves = match &pending[other] {
                    None => true,
                    Some((current, _)) => expansion.compare(&offer, current) == Ordering::Less,
                };
                if improves {
                    pending[other] = Some((offer, Some(id)));
                }
            }
            progress.processed(entries.len(), n);
        }
    }
    debug!(points = n, sweeps, "cluster order complete");
    ClusterOrder { entries }
}

fn best_candidate<E: OpticsExpansion + ?Sized>(
    expansion: &E,
    pending: &[Option<(Reachability, Option<PointId>)>],
    processed: &[bool],
) -> Option<PointId> {
    let mut best: Option<(PointId, &Reachability)> = None;
    for (id, slot) in pending.iter().enumerate() {
        let Some((reach, _)) = slot else { continue };
        if processed[id] {
            continue;
        }
        // Strict comparison keeps the lowest id on ties.
        match best {
            Some((_, b)) if expansion.compare(reach, b) != Ordering::Less => {}
            _ => best = Some((id, reach)),
        }
    }
    best.map(|(id, _)| id)
}

/// OPTICS with Euclidean distances.
#[derive(Debug, Clone)]
pub struct Optics {
    epsilon: f64,
    minpts: usize,
    progress: Progress,
}

impl Optics {
    /// Create an OPTICS run.
    ///
    /// `epsilon` may be infinite; `minpts` counts the point itself.
    pub fn new(epsilon: f64, minpts: usize) -> Self {
        Self {
            epsilon,
            minpts,
            progress: Progress::none(),
        }
    }

    /// Report progress to `progress`.
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    /// Compute the cluster order of `relation`.
    pub fn run(&self, relation: &Relation) -> Result<ClusterOrder> {
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
        let expansion = EuclideanExpansion {
            relation,
            epsilon: self.epsilon,
            minpts: self.minpts,
        };
        Ok(run_optics(&expansion, relation.len(), &self.progress))
    }
}

struct EuclideanExpansion<'a> {
    relation: &'a Relation,
    epsilon: f64,
    minpts: usize,
}

impl OpticsExpansion for EuclideanExpansion<'_> {
    fn expand(&self, id: PointId, processed: &[bool]) -> Vec<(PointId, Reachability)> {
        let mut neighbors = self.relation.range(id, self.epsilon);
        if neighbors.len() < self.minpts {
            // Core distance undefined.
            return Vec::new();
        }
        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));
        let core = neighbors[self.minpts - 1].distance;
        neighbors
            .into_iter()
            .filter(|n| !processed[n.id])
            .map(|n| (n.id, Reachability::distance(n.distance.max(core))))
            .collect()
    }
}
