use thiserror::Error;

/// Errors returned by the clustering algorithms in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Input slice is empty.
    #[error("empty input")]
    EmptyInput,

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: &'static str,
    },

    /// Requested cluster count is incompatible with the dataset.
    #[error("invalid cluster count: requested {requested}, but dataset has {n_items} items")]
    InvalidClusterCount {
        /// Requested number of clusters.
        requested: usize,
        /// Number of items in the dataset.
        n_items: usize,
    },

    /// Points in a dataset have inconsistent dimensionality.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimensionality.
        expected: usize,
        /// Found dimensionality.
        found: usize,
    },

    /// The data has fewer dimensions than the algorithm was asked to keep.
    #[error("dimensionality of data ({dimensionality}) is smaller than required ({required})")]
    DimensionalityTooSmall {
        /// Dimensionality of the relation.
        dimensionality: usize,
        /// Minimum dimensionality implied by the parameters.
        required: usize,
    },

    /// A statistic needs more points than were supplied.
    #[error("insufficient points: need at least {required}, found {found}")]
    InsufficientPoints {
        /// Minimum number of points.
        required: usize,
        /// Number of points supplied.
        found: usize,
    },

    /// A point id does not resolve in the relation.
    #[error("unknown point id {id} (relation has {len} points)")]
    UnknownId {
        /// Offending id.
        id: usize,
        /// Size of the relation.
        len: usize,
    },

    /// Random sampling kept producing linearly dependent points.
    #[error("too many retries ({retries}) in sampling: samples were always linearly dependent")]
    TooManyRetries {
        /// Number of redraws attempted.
        retries: usize,
    },
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
