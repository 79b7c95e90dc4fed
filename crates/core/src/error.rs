//! Error types for fitting transformations.

use thiserror::Error;

/// Errors raised while building or applying a fitting transformation.
///
/// Construction-time failures (bad plane names, missing masses, mismatched
/// selections) are reported before any frame is touched. Per-frame failures
/// abort the processing of that frame.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    /// Unrecognized option value, e.g. a plane name or centering method.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Mass-based weighting or centering requested on a group without masses.
    #[error("missing attribute: {0}")]
    MissingAttribute(String),

    /// Mobile and reference groups cannot be matched atom for atom.
    #[error("incompatible selections: {0}")]
    IncompatibleSelections(String),

    /// A group does not describe valid positions in the frame it is applied to.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Weights are the wrong length, negative, non-finite, or sum to zero.
    #[error("invalid weights: {0}")]
    InvalidWeights(String),

    /// The rotation solver failed to produce a decomposition.
    #[error("numerical failure: {0}")]
    Numerical(String),
}

pub type FitResult<T> = Result<T, FitError>;
