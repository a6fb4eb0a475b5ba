//! Photo search engine implementation.

use std::path::Path;
use std::sync::Arc;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use photosearch_embeddings::similarity::rank;
use photosearch_embeddings::{
    CachePolicy, CachedEmbedder, Embedding, EmbeddingCache, SimilarityIndex, SimilarityResult,
    TextEmbedder, Tokenizer, WordVectorSource,
};
use photosearch_vision::{
    CancellationToken, ClassifierError, ImageClassifier, ModelProvider, Preprocess,
};

use crate::config::{QueryConfig, SearchConfig};
use crate::error::{Result, RetrievalError};
use crate::record::PhotoRecord;

/// Photo search engine.
///
/// Coordinates:
/// - Image classification at ingestion time
/// - Embedding of labels, captions and queries (cached)
/// - Ranking of indexed photos against a query
pub struct PhotoSearch<P: ModelProvider> {
    /// Configuration.
    config: SearchConfig,

    /// Image classifier owning the lazily loaded model.
    classifier: ImageClassifier<P>,

    /// Cached text embedder.
    embedder: CachedEmbedder,

    /// Embeddings of ingested photos.
    index: RwLock<SimilarityIndex>,
}

impl<P: ModelProvider> PhotoSearch<P> {
    /// Create a new search engine builder.
    pub fn builder(provider: P, source: Arc<dyn WordVectorSource>) -> PhotoSearchBuilder<P> {
        PhotoSearchBuilder::new(provider, source)
    }

    /// Initialize the engine with the given configuration.
    pub async fn new(
        config: SearchConfig,
        provider: P,
        source: Arc<dyn WordVectorSource>,
    ) -> Result<Self> {
        Self::builder(provider, source)
            .with_config(config)
            .build()
            .await
    }

    /// Get the configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Get the image classifier.
    pub fn classifier(&self) -> &ImageClassifier<P> {
        &self.classifier
    }

    /// Get the text embedder.
    pub fn embedder(&self) -> &TextEmbedder {
        self.embedder.embedder()
    }

    /// Embed a piece of text (label, caption or query).
    pub async fn embed_text(&self, text: &str) -> Embedding {
        self.embedder.embed(text).await
    }

    /// Classify an image, embed its label and index the resulting record.
    pub async fn ingest(
        &self,
        id: impl Into<String>,
        image_ref: impl Into<String>,
        image: DynamicImage,
        cancel: &CancellationToken,
    ) -> Result<PhotoRecord> {
        let id = id.into();
        let prediction = self.classifier.predict(image, cancel).await?;

        if prediction.is_empty() {
            debug!("No label for photo {id}; it will not match any query");
        }

        let embedding = self.embed_text(&prediction.label).await;
        let record = PhotoRecord::new(
            id,
            image_ref,
            prediction,
            embedding,
            self.embedder().source_id(),
        );

        self.add_record(&record).await;
        info!(
            "Ingested photo {} as {:?} ({:.2})",
            record.id, record.prediction.label, record.prediction.confidence
        );

        Ok(record)
    }

    /// Decode an image file and ingest it.
    pub async fn ingest_path(
        &self,
        id: impl Into<String>,
        path: impl AsRef<Path>,
        cancel: &CancellationToken,
    ) -> Result<PhotoRecord> {
        if cancel.is_cancelled() {
            return Err(ClassifierError::Cancelled.into());
        }

        let path = path.as_ref().to_path_buf();
        let image_ref = path.to_string_lossy().into_owned();

        let image = tokio::task::spawn_blocking(move || image::open(&path))
            .await
            .map_err(|e| RetrievalError::Decode {
                path: image_ref.clone(),
                reason: e.to_string(),
            })?
            .map_err(|e| RetrievalError::Decode {
                path: image_ref.clone(),
                reason: e.to_string(),
            })?;

        self.ingest(id, image_ref, image, cancel).await
    }

    /// Index a record that was persisted earlier.
    pub async fn add_record(&self, record: &PhotoRecord) {
        self.index.write().await.add(
            record.id.clone(),
            record.embedding.clone(),
            Some(record_metadata(record)),
        );
    }

    /// Remove a photo from the index.
    pub async fn remove(&self, id: &str) -> bool {
        self.index.write().await.remove(id).is_some()
    }

    /// Set a caption on a record and re-embed it from the caption text.
    pub async fn annotate(&self, record: &mut PhotoRecord, caption: impl Into<String>) {
        record.caption = Some(caption.into());
        self.reembed(record).await;
    }

    /// Rank a caller-supplied corpus against a query.
    ///
    /// Results are sorted by descending score; ties keep corpus order.
    pub async fn search(&self, query: &str, corpus: &[(String, Embedding)]) -> SearchResults {
        let query_embedding = self.embed_text(query).await;
        let results = rank(
            &query_embedding,
            corpus.iter().map(|(id, e)| (id.as_str(), e.as_slice())),
        );

        SearchResults::new(query, &query_embedding, results, &self.config.query)
    }

    /// Rank the indexed photos against a query.
    pub async fn search_records(&self, query: &str) -> SearchResults {
        let query_embedding = self.embed_text(query).await;
        let results = self.index.read().await.rank(&query_embedding);

        SearchResults::new(query, &query_embedding, results, &self.config.query)
    }

    /// Re-embed records produced by a different word-vector source.
    ///
    /// Does nothing under [`CachePolicy::Indefinite`]. Returns the number of
    /// records updated.
    pub async fn refresh_stale(&self, records: &mut [PhotoRecord]) -> usize {
        if self.config.embedding.cache_policy == CachePolicy::Indefinite {
            return 0;
        }

        let source_id = self.embedder().source_id().to_string();
        let mut refreshed = 0;
        for record in records.iter_mut().filter(|r| r.is_stale(&source_id)) {
            self.reembed(record).await;
            refreshed += 1;
        }

        if refreshed > 0 {
            info!("Refreshed {refreshed} stale photo embeddings");
        }
        refreshed
    }

    /// Write pending embedding cache changes to disk.
    pub async fn flush(&self) -> Result<()> {
        self.embedder.cache().flush().await.map_err(Into::into)
    }

    /// Get engine statistics.
    pub async fn stats(&self) -> SearchStats {
        SearchStats {
            indexed_photos: self.index.read().await.len(),
            cached_embeddings: self.embedder.cache().stats().await.entries,
            model_loaded: self.classifier.is_loaded(),
            embedding_source: self.embedder().source_id().to_string(),
        }
    }

    async fn reembed(&self, record: &mut PhotoRecord) {
        record.embedding = self.embed_text(record.embedding_text()).await;
        record.embedding_source = self.embedder().source_id().to_string();

        let mut index = self.index.write().await;
        if index.contains(&record.id) {
            index.add(
                record.id.clone(),
                record.embedding.clone(),
                Some(record_metadata(record)),
            );
        }
    }
}

fn record_metadata(record: &PhotoRecord) -> serde_json::Value {
    serde_json::json!({
        "label": record.prediction.label,
        "confidence": record.prediction.confidence,
        "image_ref": record.image_ref,
    })
}

/// Builder for the photo search engine.
pub struct PhotoSearchBuilder<P: ModelProvider> {
    config: SearchConfig,
    provider: P,
    source: Arc<dyn WordVectorSource>,
    tokenizer: Option<Arc<dyn Tokenizer>>,
    preprocessor: Option<Arc<dyn Preprocess>>,
}

impl<P: ModelProvider> PhotoSearchBuilder<P> {
    /// Create a new builder.
    pub fn new(provider: P, source: Arc<dyn WordVectorSource>) -> Self {
        Self {
            config: SearchConfig::default(),
            provider,
            source,
            tokenizer: None,
            preprocessor: None,
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the query configuration.
    pub fn with_query(mut self, config: QueryConfig) -> Self {
        self.config.query = config;
        self
    }

    /// Replace the tokenizer.
    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    /// Replace the image preprocessor.
    pub fn with_preprocessor(mut self, preprocessor: Arc<dyn Preprocess>) -> Self {
        self.preprocessor = Some(preprocessor);
        self
    }

    /// Build the engine.
    pub async fn build(self) -> Result<PhotoSearch<P>> {
        let config = self.config;
        info!("Initializing photo search engine");

        if self.source.language() != config.embedding.language {
            return Err(RetrievalError::LanguageMismatch {
                expected: config.embedding.language,
                actual: self.source.language().to_string(),
            });
        }

        let mut embedder = TextEmbedder::new(self.source);
        if let Some(tokenizer) = self.tokenizer {
            embedder = embedder.with_tokenizer(tokenizer);
        }

        let max_entries = if config.embedding.cache_enabled {
            config.embedding.cache_max_entries
        } else {
            0
        };
        let cache = match (&config.embedding.cache_path, config.embedding.cache_enabled) {
            (Some(path), true) => EmbeddingCache::with_persistence(path, max_entries).await?,
            _ => EmbeddingCache::new(max_entries),
        }
        .with_policy(config.embedding.cache_policy)
        .with_persist_every(config.embedding.cache_persist_every);

        let mut classifier = ImageClassifier::new(self.provider, config.classifier.clone());
        if let Some(preprocessor) = self.preprocessor {
            classifier = classifier.with_preprocessor(preprocessor);
        }

        info!("Photo search engine initialized");
        Ok(PhotoSearch {
            config,
            classifier,
            embedder: CachedEmbedder::new(embedder, cache),
            index: RwLock::new(SimilarityIndex::new()),
        })
    }
}

/// Ranked results for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    /// The query text.
    pub query: String,

    /// Dimension of the query embedding; 0 when no query word was known.
    pub query_dimension: usize,

    /// Matches, most similar first.
    pub results: Vec<SimilarityResult>,
}

impl SearchResults {
    fn new(
        query: &str,
        query_embedding: &[f32],
        results: Vec<SimilarityResult>,
        config: &QueryConfig,
    ) -> Self {
        let results: Vec<SimilarityResult> = results
            .into_iter()
            .map(|mut r| {
                if config.clamp_scores {
                    r.score = r.score.clamp(-1.0, 1.0);
                }
                r
            })
            .filter(|r| config.min_score.is_none_or(|min| r.score >= min))
            .take(config.max_results.unwrap_or(usize::MAX))
            .collect();

        debug!(
            "Query {query:?} ranked {} photos (dimension {})",
            results.len(),
            query_embedding.len()
        );

        Self {
            query: query.to_string(),
            query_dimension: query_embedding.len(),
            results,
        }
    }

    /// Whether the query embedded to nothing, so every score is 0.0 and the
    /// order carries no meaning.
    pub fn is_no_match(&self) -> bool {
        self.query_dimension == 0
    }

    /// `(id, score)` pairs in rank order.
    pub fn scores(&self) -> Vec<(&str, f32)> {
        self.results
            .iter()
            .map(|r| (r.id.as_str(), r.score))
            .collect()
    }

    /// The best match, if any.
    pub fn best(&self) -> Option<&SimilarityResult> {
        self.results.first()
    }
}

/// Statistics about the search engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchStats {
    /// Number of photos in the index.
    pub indexed_photos: usize,

    /// Number of cached text embeddings.
    pub cached_embeddings: usize,

    /// Whether the classification model is loaded.
    pub model_loaded: bool,

    /// Identifier of the word-vector source in use.
    pub embedding_source: String,
}
