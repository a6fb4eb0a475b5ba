//! Error types for image classification.

use thiserror::Error;

/// Result type alias for classifier operations.
pub type Result<T> = std::result::Result<T, ClassifierError>;

/// Errors that cross the classifier boundary.
///
/// Preprocessing problems are deliberately absent: they resolve to an empty
/// prediction instead.
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// The model could not be loaded. Nothing is cached, so a later call
    /// tries again.
    #[error("model unavailable: {reason}")]
    ModelUnavailable { reason: String },

    /// The caller cancelled before any model work began.
    #[error("prediction cancelled")]
    Cancelled,

    /// The model failed while running on a prepared input.
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Errors from turning a bitmap into a pixel buffer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreprocessError {
    /// The source bitmap has no pixels.
    #[error("source image is empty ({width}x{height})")]
    EmptySource { width: u32, height: u32 },

    /// The requested output geometry has no pixels.
    #[error("invalid target size {width}x{height}")]
    InvalidTarget { width: u32, height: u32 },

    /// The output buffer size does not fit in memory.
    #[error("pixel buffer too large for {width}x{height}")]
    BufferTooLarge { width: u32, height: u32 },

    /// Rejected by a custom preprocessor.
    #[error("unsupported image: {0}")]
    Unsupported(String),
}
