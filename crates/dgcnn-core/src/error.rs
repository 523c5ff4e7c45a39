//! Error types for dgcnn-core.

use thiserror::Error;

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The run was configured in a way that cannot work (bad percentile, empty data).
    Configuration,
    /// A graph in the dataset is malformed.
    Data,
    /// A numeric precondition failed (degenerate degree matrix).
    Numeric,
    /// Reading or decoding input failed.
    Io,
}

/// Errors that can occur while preparing graph tensors.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Candle tensor error.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// The dataset (or the training split) has no graphs.
    #[error("dataset is empty")]
    EmptyDataset,

    /// Two graphs produced feature matrices of different widths.
    #[error("graph {graph}: feature width {got} differs from dataset width {expected}")]
    InconsistentFeatureWidth {
        graph: usize,
        expected: usize,
        got: usize,
    },

    /// Percentile outside `[0, 100]`.
    #[error("percentile must be within [0, 100], got {0}")]
    InvalidPercentile(f64),

    /// Held-out fraction outside `[0, 1)`.
    #[error("test fraction must be within [0, 1), got {0}")]
    InvalidTestFraction(f64),

    /// Node ids must start at 0 or 1.
    #[error("index_from must be 0 or 1, got {0}")]
    InvalidIndexBase(usize),

    /// An edge references a node outside `[offset, offset + n)`.
    #[error("graph {graph}: edge ({u}, {v}) out of range for {node_count} nodes (offset {offset})")]
    EdgeOutOfRange {
        graph: usize,
        u: usize,
        v: usize,
        node_count: usize,
        offset: usize,
    },

    /// A graph with zero nodes.
    #[error("graph {graph} has no nodes")]
    EmptyGraph { graph: usize },

    /// Label list does not cover every graph.
    #[error("{graphs} graphs but {labels} labels")]
    MissingLabel { graphs: usize, labels: usize },

    /// A vertex tag falls outside the global vocabulary.
    #[error("graph {graph}: tag {tag} out of range for vocabulary of {vocabulary} (offset {offset})")]
    TagOutOfRange {
        graph: usize,
        tag: i64,
        vocabulary: usize,
        offset: usize,
    },

    /// A per-node or per-graph list has the wrong length.
    #[error("graph {graph}: {what} has length {got}, expected {expected}")]
    LengthMismatch {
        graph: usize,
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// A row of the augmented adjacency sums to zero.
    #[error("graph {graph}: node {node} has non-positive degree")]
    DegenerateDegree { graph: usize, node: usize },
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) | Error::Json(_) | Error::Tensor(_) => ErrorKind::Io,
            Error::EmptyDataset
            | Error::InconsistentFeatureWidth { .. }
            | Error::InvalidPercentile(_)
            | Error::InvalidTestFraction(_)
            | Error::InvalidIndexBase(_) => ErrorKind::Configuration,
            Error::EdgeOutOfRange { .. }
            | Error::EmptyGraph { .. }
            | Error::MissingLabel { .. }
            | Error::TagOutOfRange { .. }
            | Error::LengthMismatch { .. } => ErrorKind::Data,
            Error::DegenerateDegree { .. } => ErrorKind::Numeric,
        }
    }
}

/// Result type alias for dgcnn-core.
pub type Result<T> = std::result::Result<T, Error>;
