//! Error types for the embeddings system.

use thiserror::Error;

/// Result type alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Errors that can occur in the embeddings system.
///
/// Embedding and scoring themselves never fail; these cover building word
/// vector tables and the persistent pieces around them.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Malformed word-vector file.
    #[error("invalid word vector data at line {line}: {reason}")]
    InvalidVectorData { line: usize, reason: String },

    /// Entry missing from an index.
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
