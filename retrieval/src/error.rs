//! Error types for photo search.

use thiserror::Error;

/// Result type alias for search operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur in the search engine.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Classifier error (model unavailable, cancelled, inference).
    #[error("classifier error: {0}")]
    Classifier(#[from] photosearch_vision::ClassifierError),

    /// Embedding error.
    #[error("embedding error: {0}")]
    Embedding(#[from] photosearch_embeddings::EmbeddingError),

    /// Image could not be decoded.
    #[error("failed to decode image {path}: {reason}")]
    Decode { path: String, reason: String },

    /// The word vectors do not match the configured language.
    #[error("word vectors are {actual:?}, configuration expects {expected:?}")]
    LanguageMismatch { expected: String, actual: String },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RetrievalError {
    /// Whether the caller cancelled the operation.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            RetrievalError::Classifier(photosearch_vision::ClassifierError::Cancelled)
        )
    }
}
