//! Similarity index over photo embeddings.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::similarity::{SimilarityResult, cosine_similarity, rank};

/// An entry in the similarity index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Unique identifier.
    pub id: String,

    /// The embedding vector, as supplied.
    pub embedding: Embedding,

    /// Associated metadata.
    pub metadata: Option<serde_json::Value>,
}

/// A similarity index for vector lookups.
///
/// Entries are kept in insertion order, which is also the tie-break order of
/// search results. Embeddings of any dimension are accepted; an entry that
/// cannot be compared with the query scores 0.0.
#[derive(Debug, Clone, Default)]
pub struct SimilarityIndex {
    entries: IndexMap<String, IndexEntry>,
}

impl SimilarityIndex {
    /// Create a new similarity index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an embedding to the index. Re-adding an ID replaces the entry and
    /// keeps its position.
    pub fn add(
        &mut self,
        id: impl Into<String>,
        embedding: Embedding,
        metadata: Option<serde_json::Value>,
    ) {
        let id = id.into();
        debug!("Added embedding to index: {id}");

        let entry = IndexEntry {
            id: id.clone(),
            embedding,
            metadata,
        };
        self.entries.insert(id, entry);
    }

    /// Remove an embedding from the index.
    pub fn remove(&mut self, id: &str) -> Option<IndexEntry> {
        self.entries.shift_remove(id)
    }

    /// Get an embedding by ID.
    pub fn get(&self, id: &str) -> Option<&IndexEntry> {
        self.entries.get(id)
    }

    /// Check if an ID exists in the index.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Get the number of entries in the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rank every entry against `query`, most similar first.
    pub fn rank(&self, query: &[f32]) -> Vec<SimilarityResult> {
        let mut results = rank(
            query,
            self.entries
                .values()
                .map(|e| (e.id.as_str(), e.embedding.as_slice())),
        );

        for result in &mut results {
            if let Some(entry) = self.entries.get(&result.id) {
                result.metadata = entry.metadata.clone();
            }
        }

        results
    }

    /// Search for similar embeddings.
    pub fn search(&self, query: &[f32], k: usize, min_score: f32) -> Vec<SimilarityResult> {
        self.rank(query)
            .into_iter()
            .filter(|r| r.score >= min_score)
            .take(k)
            .collect()
    }

    /// Search for the single most similar embedding.
    pub fn search_one(&self, query: &[f32], min_score: f32) -> Option<SimilarityResult> {
        self.search(query, 1, min_score).into_iter().next()
    }

    /// Compute similarity between two IDs in the index.
    pub fn similarity(&self, id1: &str, id2: &str) -> Result<f32> {
        let entry1 = self
            .entries
            .get(id1)
            .ok_or_else(|| EmbeddingError::EntryNotFound(id1.to_string()))?;
        let entry2 = self
            .entries
            .get(id2)
            .ok_or_else(|| EmbeddingError::EntryNotFound(id2.to_string()))?;

        Ok(cosine_similarity(&entry1.embedding, &entry2.embedding))
    }

    /// Get all IDs in insertion order.
    pub fn ids(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Clear the index.
    pub fn clear(&mut self) {
        self.entries.clear();
        info!("Cleared similarity index");
    }

    /// Serialize the index to JSON.
    pub fn to_json(&self) -> Result<String> {
        let entries: Vec<&IndexEntry> = self.entries.values().collect();
        Ok(serde_json::to_string(&entries)?)
    }

    /// Load index from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<IndexEntry> = serde_json::from_str(json)?;

        let mut index = Self::new();
        for entry in entries {
            index.entries.insert(entry.id.clone(), entry);
        }

        info!("Loaded {} entries into similarity index", index.len());
        Ok(index)
    }

    /// Merge another index into this one.
    pub fn merge(&mut self, other: SimilarityIndex) {
        let count = other.entries.len();
        self.entries.extend(other.entries);

        info!("Merged {count} entries into similarity index");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_index_add_and_get() {
        let mut index = SimilarityIndex::new();
        index.add("item1", vec![1.0, 0.0, 0.0], None);

        assert!(index.contains("item1"));
        assert!(!index.contains("item2"));
        assert_eq!(index.get("item1").map(|e| e.embedding.len()), Some(3));
    }

    #[test]
    fn test_index_search() {
        let mut index = SimilarityIndex::new();
        index.add("a", vec![1.0, 0.0, 0.0], None);
        index.add("b", vec![0.0, 1.0, 0.0], None);
        index.add("c", vec![0.7, 0.7, 0.0], None);

        let query = vec![1.0, 0.0, 0.0];
        let results = index.search(&query, 2, 0.0);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "a");
        assert_eq!(results[1].id, "c");
    }

    #[test]
    fn test_mismatched_dimension_scores_zero() {
        let mut index = SimilarityIndex::new();
        index.add("short", vec![1.0, 0.0], None);
        index.add("match", vec![1.0, 0.0, 0.0], None);

        let results = index.rank(&[1.0, 0.0, 0.0]);
        assert_eq!(results[0].id, "match");
        assert_eq!(results[1].score, 0.0);
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut index = SimilarityIndex::new();
        index.add("a", vec![1.0], None);
        index.add("b", vec![1.0], None);
        index.add("c", vec![1.0], None);

        assert!(index.remove("b").is_some());
        assert_eq!(index.ids(), vec!["a", "c"]);
    }

    #[test]
    fn test_search_carries_metadata() {
        let mut index = SimilarityIndex::new();
        index.add(
            "p1",
            vec![0.0, 1.0],
            Some(serde_json::json!({ "label": "seashore" })),
        );

        let best = index.search_one(&[0.0, 2.0], 0.5).unwrap();
        assert_eq!(best.metadata, Some(serde_json::json!({ "label": "seashore" })));
        assert!(index.search_one(&[1.0, 0.0], 0.5).is_none());
    }

    #[test]
    fn test_similarity_between_entries() {
        let mut index = SimilarityIndex::new();
        index.add("a", vec![1.0, 0.0], None);
        index.add("b", vec![1.0, 0.0], None);

        assert!((index.similarity("a", "b").unwrap() - 1.0).abs() < 1e-6);
        assert!(matches!(
            index.similarity("a", "missing"),
            Err(EmbeddingError::EntryNotFound(_))
        ));
    }

    #[test]
    fn test_json_round_trip_and_merge() {
        let mut index = SimilarityIndex::new();
        index.add("a", vec![1.0, 0.0], None);
        index.add("b", vec![0.0, 1.0], None);

        let restored = SimilarityIndex::from_json(&index.to_json().unwrap()).unwrap();
        assert_eq!(restored.ids(), vec!["a", "b"]);

        let mut other = SimilarityIndex::new();
        other.add("c", vec![1.0, 1.0], None);
        index.merge(other);
        assert_eq!(index.len(), 3);
    }
}
