//! Correlation clustering over dense vectors.
//!
//! `corrclust` finds clusters that lie on arbitrarily oriented linear
//! subspaces: lines, planes and higher-dimensional manifolds that are not
//! aligned with the coordinate axes.
//!
//! The crate is organized bottom-up:
//! - [`relation`]: the input points, with k-nearest-neighbor and range queries
//! - [`pca`]: local PCA and the strong/weak eigenvector split
//! - [`cluster`]: generalized DBSCAN and OPTICS, clustering results
//! - [`correlation`]: COPAC, ERiC, 4C, HiCO, ORCLUS and LMCLUS
//!
//! Algorithms are configured with builders and validate their parameters
//! when run. Progress can be observed through [`Progress`]; diagnostics are
//! emitted with `tracing`.

#![forbid(unsafe_code)]

pub mod cluster;
pub mod correlation;
pub mod error;
mod linalg;
pub mod pca;
pub mod progress;
pub mod relation;

pub use cluster::{Cluster, ClusterOrder, Clustering, ClusteringAlgorithm, NOISE};
pub use correlation::{Copac, Eric, FourC, HiCO, Lmclus, Orclus};
pub use error::{Error, Result};
pub use progress::{Progress, ProgressEvent};
pub use relation::{PointId, Relation};
