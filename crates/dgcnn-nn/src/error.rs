//! Error types for dgcnn-nn.

use thiserror::Error;

/// dgcnn-nn error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Candle tensor error.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// Data preparation error.
    #[error(transparent)]
    Data(#[from] dgcnn_core::Error),

    /// Dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Invalid configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Input the model cannot process.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
