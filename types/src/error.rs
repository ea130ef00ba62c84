use crate::eds::AxisType;

/// Alias for a [`Result`] with the error type [`Error`].
///
/// [`Result`]: std::result::Result
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Representation of all the errors that can occur when interacting with [`lumina_da_types`].
///
/// [`lumina_da_types`]: crate
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Original data square has an invalid shape.
    #[error("Invalid input shape: {0}")]
    InvalidInputShape(String),

    /// Share is too short to hold a namespace.
    #[error("Invalid share size: {0}")]
    InvalidShareSize(usize),

    /// Shares of a single square differ in size.
    #[error("Share size mismatch: expected {expected}, got {got}")]
    ShareSizeMismatch {
        /// Size of the first share in the square.
        expected: usize,
        /// Size of the offending share.
        got: usize,
    },

    /// Namespace has a wrong size.
    #[error("Invalid namespace size: {0}")]
    InvalidNamespaceSize(usize),

    /// Namespaces of a row or column of the original data square are not sorted.
    #[error("Shares of {axis} {index} are not sorted by their namespace")]
    UnsortedNamespaces {
        /// Axis that is not sorted.
        axis: AxisType,
        /// Index of the axis.
        index: u16,
    },

    /// Leaf pushed to the tree has smaller namespace than the previous one.
    #[error("Leaf namespace is smaller than the namespace of the previous leaf")]
    InvalidNmtLeafOrder,

    /// Tree construction was stopped by the node visitor.
    #[error("Tree construction aborted by the node visitor")]
    VisitAborted,

    /// Invalid namespaced hash.
    #[error("Invalid namespaced hash")]
    InvalidNamespacedHash,

    /// Share coordinates are outside of the square.
    #[error("Index ({0}, {1}) out of range")]
    EdsIndexOutOfRange(u16, u16),

    /// Not enough shares are available to recover an axis.
    #[error("Not enough shares to reconstruct: have {available}, need {required}")]
    NotEnoughShares {
        /// Number of present shares.
        available: usize,
        /// Number of shares needed for the recovery.
        required: usize,
    },

    /// Error propagated from the Reed-Solomon codec.
    #[error("Erasure codec error: {0}")]
    Codec(#[from] reed_solomon_erasure::Error),

    /// Error propagated from CID computation.
    #[error(transparent)]
    Cid(#[from] lumina_blockstore::block::CidError),

    /// Validation error.
    #[error(transparent)]
    Validation(#[from] crate::ValidationError),
}
