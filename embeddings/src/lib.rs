//! # Embeddings
//!
//! This crate turns short pieces of text (classifier labels, captions, search
//! queries) into dense vectors and ranks stored vectors against a query.
//!
//! ## Features
//!
//! - **Text Embedding**: Average pre-trained word vectors over the words of a text
//! - **Similarity Search**: Rank photos by cosine similarity to a query
//! - **Pluggable Sources**: Any word-vector table or tokenizer behind a trait
//! - **Caching**: Reuse embeddings computed for labels and captions
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings System                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  Tokenizer ──► TextEmbedder ──► Embedding ──► SimilarityIndex   │
//! │                    │                │              │            │
//! │                    ▼                ▼              ▼            │
//! │           WordVectorSource   EmbeddingCache   cosine ranking    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod embedder;
pub mod error;
pub mod index;
pub mod similarity;
pub mod tokenizer;
pub mod word_vectors;

pub use cache::{CachePolicy, CachedEmbedder, EmbeddingCache};
pub use embedder::TextEmbedder;
pub use error::{EmbeddingError, Result};
pub use index::SimilarityIndex;
pub use similarity::{SimilarityResult, cosine_similarity};
pub use tokenizer::{Token, Tokenizer, UnicodeWordTokenizer};
pub use word_vectors::{WordVectorSource, WordVectorTable};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;
