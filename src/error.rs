use thiserror::Error;

/// Result alias for `ccal`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the association and consensus-clustering primitives.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Input was empty.
    #[error("empty input provided")]
    EmptyInput,

    /// Length or dimension mismatch (usize).
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Found dimension.
        found: usize,
    },

    /// Shape mismatch (string description).
    #[error("shape mismatch: expected {expected}, actual {actual}")]
    ShapeMismatch {
        /// Expected shape description.
        expected: String,
        /// Actual shape description.
        actual: String,
    },

    /// Input has zero spread or too few observations for density estimation.
    ///
    /// The information coefficient recovers from this locally and scores 0.
    #[error("degenerate input: {0}")]
    DegenerateInput(&'static str),

    /// Matrix cannot be factorized (negative, non-finite, or constant rows).
    #[error("invalid matrix: {reason}")]
    InvalidMatrix {
        /// What is wrong with the matrix.
        reason: String,
    },

    /// Invalid number of clusters requested.
    #[error("cannot create {requested} clusters from {n_items} items")]
    InvalidClusterCount {
        /// Requested count.
        requested: usize,
        /// Number of items.
        n_items: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: &'static str,
    },

    /// The run was cancelled at a trial boundary.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    pub(crate) fn invalid_matrix(reason: impl Into<String>) -> Self {
        Error::InvalidMatrix {
            reason: reason.into(),
        }
    }
}
