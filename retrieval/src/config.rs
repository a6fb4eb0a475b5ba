//! Configuration for photo search.
//!
//! Every field has a default, so a TOML file only needs the values it
//! changes:
//!
//! ```toml
//! [embedding]
//! language = "en"
//! cache_policy = "invalidate_on_source_change"
//!
//! [classifier]
//! model_path = "/models/MobileNetV2.onnx"
//! pixel_format = "bgra32"
//!
//! [query]
//! max_results = 50
//! min_score = 0.2
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use photosearch_embeddings::CachePolicy;
use photosearch_embeddings::cache::DEFAULT_PERSIST_EVERY;
use photosearch_vision::ClassifierConfig;

use crate::error::Result;

/// Configuration for the photo search engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Text embedding configuration.
    pub embedding: EmbeddingConfig,

    /// Image classifier configuration.
    pub classifier: ClassifierConfig,

    /// Query processing configuration.
    pub query: QueryConfig,
}

impl SearchConfig {
    /// Parse a configuration from TOML.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load a configuration file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await?;
        debug!("Loaded search configuration from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Set the embedding configuration.
    pub fn with_embedding(mut self, config: EmbeddingConfig) -> Self {
        self.embedding = config;
        self
    }

    /// Set the classifier configuration.
    pub fn with_classifier(mut self, config: ClassifierConfig) -> Self {
        self.classifier = config;
        self
    }

    /// Set the query configuration.
    pub fn with_query(mut self, config: QueryConfig) -> Self {
        self.query = config;
        self
    }
}

/// Configuration for text embeddings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Language of the word-vector vocabulary.
    pub language: String,

    /// Whether to cache embeddings.
    pub cache_enabled: bool,

    /// Maximum cache size.
    pub cache_max_entries: usize,

    /// File the cache is persisted to (in-memory only when unset).
    pub cache_path: Option<PathBuf>,

    /// When cached and stored embeddings become stale.
    pub cache_policy: CachePolicy,

    /// Number of cache changes between writes of the cache file.
    pub cache_persist_every: usize,
}

impl EmbeddingConfig {
    /// Persist the cache under the platform cache directory.
    pub fn persistent(mut self) -> Self {
        self.cache_path = default_cache_path();
        self
    }

    /// Set the cache policy.
    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            cache_enabled: true,
            cache_max_entries: 10000,
            cache_path: None,
            cache_policy: CachePolicy::Indefinite,
            cache_persist_every: DEFAULT_PERSIST_EVERY,
        }
    }
}

/// Default location of the persisted embedding cache.
pub fn default_cache_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("photosearch").join("embeddings.json"))
}

/// Configuration for query processing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Maximum number of results to return (all when unset).
    pub max_results: Option<usize>,

    /// Minimum score a result needs (no threshold when unset).
    pub min_score: Option<f32>,

    /// Clamp scores to [-1.0, 1.0].
    pub clamp_scores: bool,
}

impl QueryConfig {
    /// Limit the number of results.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Drop results scoring below `min_score`.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }

    /// Enable or disable score clamping.
    pub fn with_clamped_scores(mut self, clamp: bool) -> Self {
        self.clamp_scores = clamp;
        self
    }
}
