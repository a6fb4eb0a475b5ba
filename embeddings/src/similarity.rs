//! Similarity computation for embeddings.
//!
//! None of these functions fail. Inputs that cannot be compared (different
//! lengths, empty or zero-magnitude vectors) score 0.0 so that a photo with
//! no usable embedding simply sinks to the bottom of a ranking.

use std::cmp::Reverse;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::Embedding;

/// Compute the cosine similarity between two embeddings.
///
/// Returns a value between -1.0 and 1.0, where:
/// - 1.0 means identical direction
/// - 0.0 means orthogonal vectors, or vectors that cannot be compared
/// - -1.0 means opposite vectors
///
/// The result is not clamped, so rounding can push it marginally outside
/// [-1.0, 1.0]. Sums are accumulated in `f64` so large components do not
/// overflow; a non-finite result (NaN or infinite input) scores 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let magnitude_a = magnitude_f64(a);
    let magnitude_b = magnitude_f64(b);

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    let score = (dot_product_f64(a, b) / (magnitude_a * magnitude_b)) as f32;
    if score.is_finite() { score } else { 0.0 }
}

/// Compute the dot product between two embeddings, or 0.0 if their
/// lengths differ.
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    dot_product_f64(a, b) as f32
}

/// Euclidean norm of an embedding.
pub fn magnitude(embedding: &[f32]) -> f32 {
    magnitude_f64(embedding) as f32
}

fn dot_product_f64(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum()
}

fn magnitude_f64(embedding: &[f32]) -> f64 {
    embedding
        .iter()
        .map(|x| f64::from(*x) * f64::from(*x))
        .sum::<f64>()
        .sqrt()
}

/// Normalize an embedding to unit length.
pub fn normalize(embedding: &mut Embedding) {
    let magnitude = magnitude(embedding);
    if magnitude > 0.0 {
        for x in embedding.iter_mut() {
            *x /= magnitude;
        }
    }
}

/// Compute the component-wise mean of multiple embeddings.
///
/// The first embedding fixes the dimension; later embeddings of a different
/// length are left out of the mean. An empty input yields an empty vector.
pub fn average(embeddings: &[Embedding]) -> Embedding {
    let Some(first) = embeddings.first() else {
        return Vec::new();
    };

    let dim = first.len();
    let mut sum = vec![0.0f32; dim];
    let mut count = 0usize;

    for embedding in embeddings.iter().filter(|e| e.len() == dim) {
        for (acc, val) in sum.iter_mut().zip(embedding.iter()) {
            *acc += val;
        }
        count += 1;
    }

    let n = count as f32;
    for x in sum.iter_mut() {
        *x /= n;
    }

    sum
}

/// A similarity search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    /// ID of the matched item.
    pub id: String,

    /// Similarity score.
    pub score: f32,

    /// Additional metadata.
    pub metadata: Option<serde_json::Value>,
}

impl SimilarityResult {
    /// Create a new similarity result.
    pub fn new(id: impl Into<String>, score: f32) -> Self {
        Self {
            id: id.into(),
            score,
            metadata: None,
        }
    }

    /// Add metadata to the result.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Score every candidate against `query` and sort by descending score.
///
/// The sort is stable: candidates with equal scores keep the order in which
/// they were supplied.
pub fn rank<'a>(
    query: &[f32],
    candidates: impl IntoIterator<Item = (&'a str, &'a [f32])>,
) -> Vec<SimilarityResult> {
    let mut results: Vec<SimilarityResult> = candidates
        .into_iter()
        .map(|(id, embedding)| SimilarityResult::new(id, cosine_similarity(query, embedding)))
        .collect();

    results.sort_by_key(|r| Reverse(OrderedFloat(r.score)));
    results
}

/// Find the top-k most similar embeddings scoring at least `min_score`.
pub fn find_top_k<'a>(
    query: &[f32],
    candidates: impl IntoIterator<Item = (&'a str, &'a [f32])>,
    k: usize,
    min_score: f32,
) -> Vec<SimilarityResult> {
    rank(query, candidates)
        .into_iter()
        .filter(|r| r.score >= min_score)
        .take(k)
        .collect()
}
