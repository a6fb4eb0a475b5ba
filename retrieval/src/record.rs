//! Photo records produced by ingestion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use photosearch_embeddings::Embedding;
use photosearch_vision::ImagePrediction;

/// Everything search needs to know about one photo.
///
/// Records are created at ingestion time and persisted by the caller; the
/// engine only produces them and reads them back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    /// Unique identifier.
    pub id: String,

    /// Reference to the image (path, asset identifier, URL).
    pub image_ref: String,

    /// Classifier output for the image.
    pub prediction: ImagePrediction,

    /// Text used for the embedding instead of the label, if any.
    pub caption: Option<String>,

    /// Embedding of [`PhotoRecord::embedding_text`].
    pub embedding: Embedding,

    /// Word-vector source that produced `embedding`.
    pub embedding_source: String,

    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl PhotoRecord {
    /// Create a record.
    pub fn new(
        id: impl Into<String>,
        image_ref: impl Into<String>,
        prediction: ImagePrediction,
        embedding: Embedding,
        embedding_source: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            image_ref: image_ref.into(),
            prediction,
            caption: None,
            embedding,
            embedding_source: embedding_source.into(),
            created_at: Utc::now(),
        }
    }

    /// The text the embedding is derived from: the caption when set,
    /// otherwise the predicted label.
    pub fn embedding_text(&self) -> &str {
        self.caption
            .as_deref()
            .unwrap_or(self.prediction.label.as_str())
    }

    /// Whether the embedding was produced by a different source.
    pub fn is_stale(&self, source_id: &str) -> bool {
        self.embedding_source != source_id
    }

    /// Whether the record has an embedding that can match a query.
    pub fn is_searchable(&self) -> bool {
        !self.embedding.is_empty()
    }
}
