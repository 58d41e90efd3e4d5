//! Error types for clustering operations.

use std::fmt;

/// Result type for clustering operations.
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Errors that can occur while building datasets or fitting clusterers.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterError {
    /// Requested cluster count is outside `[1, n]`.
    InvalidClusterCount { k: usize, n: usize },

    /// Input contains no vectors.
    EmptyDataset { context: String },

    /// Vector dimensions disagree, or an output shape does not match the labels.
    DimensionMismatch {
        expected: usize,
        got: usize,
        context: String,
    },

    /// A mean was requested over zero points.
    EmptySet { context: String },

    /// Invalid parameter value.
    InvalidParameter { parameter: String, message: String },

    /// The run was aborted through its cancel token.
    Cancelled { context: String },

    /// The run exceeded the deadline on its cancel token.
    DeadlineExceeded { context: String },

    /// A tensor operation failed in the numr backend.
    Backend { message: String },
}

impl ClusterError {
    pub(crate) fn invalid_parameter(parameter: &str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ClusterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidClusterCount { k, n } => {
                write!(
                    f,
                    "Invalid cluster count {}: must be in [1, {}] for {} points",
                    k, n, n
                )
            }
            Self::EmptyDataset { context } => {
                write!(f, "Empty dataset in {}", context)
            }
            Self::DimensionMismatch {
                expected,
                got,
                context,
            } => {
                write!(
                    f,
                    "Dimension mismatch in {}: expected {}, got {}",
                    context, expected, got
                )
            }
            Self::EmptySet { context } => {
                write!(f, "Mean of an empty point set in {}", context)
            }
            Self::InvalidParameter { parameter, message } => {
                write!(f, "Invalid parameter '{}': {}", parameter, message)
            }
            Self::Cancelled { context } => {
                write!(f, "{} was cancelled", context)
            }
            Self::DeadlineExceeded { context } => {
                write!(f, "{} exceeded its deadline", context)
            }
            Self::Backend { message } => {
                write!(f, "Tensor backend error: {}", message)
            }
        }
    }
}

impl std::error::Error for ClusterError {}

// numr errors are neither Clone nor PartialEq, so only the message is kept
impl From<numr::error::Error> for ClusterError {
    fn from(err: numr::error::Error) -> Self {
        Self::Backend {
            message: err.to_string(),
        }
    }
}
