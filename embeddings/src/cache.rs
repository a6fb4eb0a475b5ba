//! Embedding cache for labels and captions.
//!
//! Photo labels repeat a lot across a library ("golden retriever", "seashore"),
//! so the embedding for a given text is computed once and reused. Each entry
//! remembers which word-vector source produced it; [`CachePolicy`] decides
//! whether an entry from a different source is still served.
//!
//! A persistent cache writes its file after every `persist_every` changes
//! and on [`EmbeddingCache::flush`], not on every insert.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::Embedding;
use crate::embedder::TextEmbedder;
use crate::error::{EmbeddingError, Result};

/// When cached embeddings stop being valid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Entries are kept and served forever.
    #[default]
    Indefinite,

    /// Entries produced by a different word-vector source are treated as
    /// misses and recomputed.
    InvalidateOnSourceChange,
}

/// Cache entry for an embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The text that was embedded.
    pub text: String,

    /// The embedding vector.
    pub embedding: Embedding,

    /// Word-vector source used to generate the embedding.
    pub source_id: String,

    /// Insertion order, used for eviction.
    pub sequence: u64,
}

/// Cache for embeddings to avoid redundant word-vector averaging.
pub struct EmbeddingCache {
    /// In-memory cache.
    cache: Arc<RwLock<HashMap<String, CacheEntry>>>,

    /// Path for persistent cache storage.
    cache_path: Option<PathBuf>,

    /// Maximum cache size.
    max_entries: usize,

    /// Invalidation policy.
    policy: CachePolicy,

    /// Next insertion sequence number.
    next_sequence: AtomicU64,

    /// Number of changes that trigger a write of the cache file.
    persist_every: usize,

    /// Changes not yet written to disk.
    unsaved: AtomicUsize,
}

/// Default number of changes between writes of a persistent cache.
pub const DEFAULT_PERSIST_EVERY: usize = 32;

impl EmbeddingCache {
    /// Create a new in-memory cache.
    pub fn new(max_entries: usize) -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            cache_path: None,
            max_entries,
            policy: CachePolicy::default(),
            next_sequence: AtomicU64::new(0),
            persist_every: DEFAULT_PERSIST_EVERY,
            unsaved: AtomicUsize::new(0),
        }
    }

    /// Create a cache with persistent storage.
    ///
    /// A cache file that cannot be parsed is logged and replaced by an empty
    /// cache on the next write.
    pub async fn with_persistence(path: impl AsRef<Path>, max_entries: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut cache = Self::new(max_entries);
        cache.cache_path = Some(path.clone());

        match cache.load().await {
            Ok(()) => {}
            Err(EmbeddingError::Serialization(e)) => {
                warn!(
                    "Discarding unreadable embedding cache {}: {e}",
                    path.display()
                );
            }
            Err(e) => return Err(e),
        }

        Ok(cache)
    }

    /// Write the cache file after every `persist_every` changes (at least 1).
    pub fn with_persist_every(mut self, persist_every: usize) -> Self {
        self.persist_every = persist_every.max(1);
        self
    }

    /// Set the invalidation policy.
    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The invalidation policy.
    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Whether an embedding produced by `entry_source` may be served to a
    /// caller currently using `current_source`.
    pub fn is_valid_for(&self, entry_source: &str, current_source: &str) -> bool {
        match self.policy {
            CachePolicy::Indefinite => true,
            CachePolicy::InvalidateOnSourceChange => entry_source == current_source,
        }
    }

    /// Get an embedding from the cache.
    pub async fn get(&self, text: &str, source_id: &str) -> Option<Embedding> {
        let cache = self.cache.read().await;
        cache
            .get(text)
            .filter(|e| self.is_valid_for(&e.source_id, source_id))
            .map(|e| e.embedding.clone())
    }

    /// Put an embedding in the cache.
    pub async fn put(&self, text: &str, source_id: &str, embedding: Embedding) -> Result<()> {
        if self.max_entries == 0 {
            return Ok(());
        }

        let entry = CacheEntry {
            text: text.to_string(),
            embedding,
            source_id: source_id.to_string(),
            sequence: self.next_sequence.fetch_add(1, Ordering::Relaxed),
        };

        let mut cache = self.cache.write().await;

        // Evict if at capacity
        if cache.len() >= self.max_entries && !cache.contains_key(text) {
            // Remove oldest entry
            if let Some(oldest_key) = cache
                .iter()
                .min_by_key(|(_, v)| v.sequence)
                .map(|(k, _)| k.clone())
            {
                cache.remove(&oldest_key);
            }
        }

        cache.insert(entry.text.clone(), entry);
        debug!("Cached embedding for text (source: {source_id})");

        drop(cache);
        self.record_change().await
    }

    /// Check if a valid embedding is cached.
    pub async fn contains(&self, text: &str, source_id: &str) -> bool {
        self.get(text, source_id).await.is_some()
    }

    /// Remove an embedding from the cache. Returns whether it was present.
    pub async fn remove(&self, text: &str) -> Result<bool> {
        let removed = self.cache.write().await.remove(text).is_some();
        if removed {
            self.record_change().await?;
        }
        Ok(removed)
    }

    /// Clear the entire cache.
    pub async fn clear(&self) -> Result<()> {
        self.cache.write().await.clear();
        info!("Cleared embedding cache");
        self.record_change().await
    }

    /// Write pending changes to disk. Does nothing for an in-memory cache or
    /// when nothing changed since the last write.
    pub async fn flush(&self) -> Result<()> {
        if self.cache_path.is_none() || self.unsaved.load(Ordering::Relaxed) == 0 {
            return Ok(());
        }
        self.save().await
    }

    async fn record_change(&self) -> Result<()> {
        if self.cache_path.is_none() {
            return Ok(());
        }

        let unsaved = self.unsaved.fetch_add(1, Ordering::Relaxed) + 1;
        if unsaved >= self.persist_every {
            self.save().await?;
        }
        Ok(())
    }

    /// Get cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let cache = self.cache.read().await;
        let mut sources: Vec<String> = cache
            .values()
            .map(|e| e.source_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        sources.sort();

        CacheStats {
            entries: cache.len(),
            max_entries: self.max_entries,
            sources,
        }
    }

    /// Save cache to disk.
    async fn save(&self) -> Result<()> {
        if let Some(ref path) = self.cache_path {
            let cache = self.cache.read().await;
            let mut entries: Vec<&CacheEntry> = cache.values().collect();
            entries.sort_by_key(|e| e.sequence);
            let content = serde_json::to_string(&entries)?;

            // Ensure parent directory exists
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }

            fs::write(path, content).await?;
            self.unsaved.store(0, Ordering::Relaxed);
            debug!("Saved {} cache entries to disk", entries.len());
        }
        Ok(())
    }

    /// Load cache from disk.
    async fn load(&self) -> Result<()> {
        if let Some(ref path) = self.cache_path {
            if path.exists() {
                let content = fs::read_to_string(path).await?;
                let entries: Vec<CacheEntry> = serde_json::from_str(&content)?;

                let mut cache = self.cache.write().await;
                let mut next_sequence = 0;
                for entry in entries {
                    next_sequence = next_sequence.max(entry.sequence + 1);
                    cache.insert(entry.text.clone(), entry);
                }
                self.next_sequence.store(next_sequence, Ordering::Relaxed);

                info!("Loaded {} cache entries from disk", cache.len());
            }
        }
        Ok(())
    }
}

/// Statistics about the embedding cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of entries in cache.
    pub entries: usize,

    /// Maximum cache size.
    pub max_entries: usize,

    /// Word-vector sources with cached embeddings.
    pub sources: Vec<String>,
}

/// A text embedder backed by an [`EmbeddingCache`].
pub struct CachedEmbedder {
    embedder: TextEmbedder,
    cache: EmbeddingCache,
}

impl CachedEmbedder {
    /// Create a new cached embedder.
    pub fn new(embedder: TextEmbedder, cache: EmbeddingCache) -> Self {
        Self { embedder, cache }
    }

    /// Generate an embedding, using cache if available.
    ///
    /// Empty embeddings are not cached. A failure to persist the cache is
    /// logged and otherwise ignored.
    pub async fn embed(&self, text: &str) -> Embedding {
        let source_id = self.embedder.source_id();

        if let Some(embedding) = self.cache.get(text, source_id).await {
            debug!("Cache hit for embedding");
            return embedding;
        }

        let embedding = self.embedder.embed(text);
        if !embedding.is_empty() {
            if let Err(err) = self.cache.put(text, source_id, embedding.clone()).await {
                warn!("Failed to persist embedding cache: {err}");
            }
        }

        embedding
    }

    /// Get the underlying embedder.
    pub fn embedder(&self) -> &TextEmbedder {
        &self.embedder
    }

    /// Get the underlying cache.
    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }
}
