//! Density-based clustering engines and clustering results.
//!
//! This module holds the parts shared by every correlation clustering
//! algorithm in [`crate::correlation`].
//!
//! ## Predicates
//!
//! Density-based clustering needs two answers per point:
//!
//! - **Which points are its neighbors?** ([`NeighborPredicate`])
//! - **Is it dense enough to grow a cluster?** ([`CorePredicate`])
//!
//! Classic DBSCAN answers with an ε-ball and a point count. Correlation
//! clustering swaps in neighbor predicates that compare local subspaces, and
//! keeps the rest of the algorithm unchanged.
//!
//! ## Engines
//!
//! ### Generalized DBSCAN
//!
//! [`GeneralizedDbscan`] expands clusters from core points through any pair
//! of predicates. Every point reached from a core point joins its cluster;
//! only core points are expanded further. Points never reached become noise.
//!
//! [`Dbscan`] is the Euclidean instance.
//!
//! ### Generalized OPTICS
//!
//! [`run_optics`] orders all points so that dense regions are contiguous,
//! annotating each with the reachability it was reached at. The notion of
//! reachability comes from an [`OpticsExpansion`]. [`Optics`] is the
//! Euclidean instance.
//!
//! ## Results
//!
//! Flat algorithms return a [`Clustering`] whose clusters partition the
//! points, with at most one noise cluster. Hierarchical algorithms (ERiC) add
//! parent/child edges between clusters. Every cluster carries a model:
//! [`ClusterModel`], [`DimensionModel`], [`CorrelationModel`] or
//! [`SubspaceModel`].
//!
//! ## Usage
//!
//! ```rust
//! use corrclust::cluster::{ClusteringAlgorithm, Dbscan, NOISE};
//!
//! let data = vec![
//!     vec![0.0, 0.0],
//!     vec![0.1, 0.1],
//!     vec![10.0, 10.0],
//!     vec![10.1, 10.1],
//!     vec![50.0, 50.0],
//! ];
//!
//! let labels = Dbscan::new(0.5, 2).fit_predict(&data).unwrap();
//! assert_eq!(labels[0], labels[1]);
//! assert_ne!(labels[0], labels[2]);
//! assert_eq!(labels[4], NOISE);
//! ```

mod gdbscan;
mod model;
mod optics;
mod traits;

pub use gdbscan::{
    Dbscan, EpsilonNeighborPredicate, EpsilonNeighbors, GeneralizedDbscan, MinPtsCorePredicate,
};
pub use model::{
    Cluster, ClusterModel, Clustering, CorrelationModel, DimensionModel, SubspaceModel, NOISE,
};
pub use optics::{
    run_optics, ClusterOrder, ClusterOrderEntry, Optics, OpticsExpansion, Reachability,
};
pub use traits::{ClusteringAlgorithm, CorePredicate, NeighborPredicate};
