//! # Photo Search
//!
//! This crate ties image classification and text embeddings together into
//! natural-language search over a photo library:
//!
//! - **Ingestion**: classify each photo once, embed its label, keep the result
//! - **Search**: embed the query and rank photos by cosine similarity
//! - **Configuration**: TOML-loadable settings for every component
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Photo Search                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │   image ──► ImageClassifier ──► label ──► TextEmbedder          │
//! │                                               │                 │
//! │                                               ▼                 │
//! │                                  PhotoRecord / SimilarityIndex  │
//! │                                               ▲                 │
//! │   query ─────────────────────► TextEmbedder ──┘ cosine ranking  │
//! │                                                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use photosearch_retrieval::{PhotoSearch, WordVectorTable};
//!
//! let vectors = WordVectorTable::load("glove.6B.300d.txt", "en").await?;
//! let search = PhotoSearch::builder(my_model_provider, Arc::new(vectors))
//!     .build()
//!     .await?;
//!
//! search.ingest_path("IMG_0001", "photos/IMG_0001.jpg", &cancel).await?;
//! let results = search.search_records("dog on the beach").await;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod record;

pub use config::{EmbeddingConfig, QueryConfig, SearchConfig};
pub use engine::{PhotoSearch, PhotoSearchBuilder, SearchResults, SearchStats};
pub use error::{Result, RetrievalError};
pub use record::PhotoRecord;

// Re-export from dependencies for convenience
pub use photosearch_embeddings::{
    CachePolicy, Embedding, SimilarityResult, TextEmbedder, WordVectorSource, WordVectorTable,
};
pub use photosearch_vision::{
    CancellationToken, ClassifierConfig, ClassifierOutput, ImagePrediction, ModelProvider,
    PixelBuffer,
};
