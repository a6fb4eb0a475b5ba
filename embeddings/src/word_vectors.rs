//! Word-vector sources.
//!
//! A [`WordVectorSource`] maps a lowercase word to a pre-trained dense vector.
//! [`WordVectorTable`] is the in-memory implementation, filled either directly
//! or from the plain-text layout used by GloVe and fastText exports:
//!
//! ```text
//! 400000 300          <- optional "<count> <dimension>" header
//! the 0.418 0.24968 -0.41242 ...
//! dog 0.11008 -0.38781 -0.57615 ...
//! ```

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

use tokio::fs;
use tracing::{debug, info};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};

/// Trait for word-vector sources.
pub trait WordVectorSource: Send + Sync {
    /// Look up the vector for a lowercase word, if the vocabulary has one.
    fn vector_for(&self, token: &str) -> Option<Embedding>;

    /// Dimension of every vector this source returns.
    fn dimension(&self) -> usize;

    /// Language the vocabulary belongs to (e.g. "en").
    fn language(&self) -> &str;

    /// Identifier that changes whenever the vectors change.
    ///
    /// Stored next to cached embeddings so stale ones can be detected.
    fn source_id(&self) -> &str;
}

/// In-memory word-vector table.
#[derive(Debug, Clone)]
pub struct WordVectorTable {
    /// Vectors keyed by lowercase word.
    vectors: HashMap<String, Embedding>,

    /// Dimension of every vector.
    dimension: usize,

    /// Vocabulary language.
    language: String,

    /// Source identifier.
    source_id: String,
}

impl WordVectorTable {
    /// Create an empty table.
    pub fn new(language: impl Into<String>, dimension: usize) -> Self {
        let language = language.into();
        Self {
            source_id: format!("{language}-{dimension}d"),
            vectors: HashMap::new(),
            dimension,
            language,
        }
    }

    /// Override the source identifier.
    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = source_id.into();
        self
    }

    /// Build a table from `(word, vector)` pairs. The first vector fixes the
    /// dimension.
    pub fn from_pairs<W, I>(language: impl Into<String>, pairs: I) -> Result<Self>
    where
        W: AsRef<str>,
        I: IntoIterator<Item = (W, Embedding)>,
    {
        let mut pairs = pairs.into_iter().peekable();
        let dimension = pairs.peek().map(|(_, v)| v.len()).unwrap_or_default();

        let mut table = Self::new(language, dimension);
        for (word, vector) in pairs {
            table.insert(word.as_ref(), vector)?;
        }

        Ok(table)
    }

    /// Insert a vector. Words are stored lowercase; the first vector for a
    /// word wins.
    pub fn insert(&mut self, word: &str, vector: Embedding) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        self.vectors.entry(word.to_lowercase()).or_insert(vector);
        Ok(())
    }

    /// Parse the whitespace-separated text format.
    pub fn parse(language: impl Into<String>, content: &str) -> Result<Self> {
        let language = language.into();

        let mut hasher = DefaultHasher::new();
        content.hash(&mut hasher);
        let source_id = format!("{language}-{:x}", hasher.finish());

        let mut table: Option<Self> = None;
        let mut declared_dimension: Option<usize> = None;

        for (idx, line) in content.lines().enumerate() {
            let line_no = idx + 1;
            let mut fields = line.split_whitespace();
            let Some(word) = fields.next() else {
                continue;
            };
            let rest: Vec<&str> = fields.collect();

            if table.is_none() && declared_dimension.is_none() {
                if let [dimension] = rest.as_slice() {
                    if let (Ok(_), Ok(dimension)) = (word.parse::<usize>(), dimension.parse::<usize>()) {
                        declared_dimension = Some(dimension);
                        continue;
                    }
                }
            }

            let vector = rest
                .iter()
                .map(|field| field.parse::<f32>())
                .collect::<std::result::Result<Embedding, _>>()
                .map_err(|e| EmbeddingError::InvalidVectorData {
                    line: line_no,
                    reason: format!("bad component for {word:?}: {e}"),
                })?;

            if vector.is_empty() {
                return Err(EmbeddingError::InvalidVectorData {
                    line: line_no,
                    reason: format!("no components for {word:?}"),
                });
            }

            let table = table.get_or_insert_with(|| {
                Self::new(language.clone(), declared_dimension.unwrap_or(vector.len()))
                    .with_source_id(source_id.clone())
            });

            table
                .insert(word, vector)
                .map_err(|e| EmbeddingError::InvalidVectorData {
                    line: line_no,
                    reason: e.to_string(),
                })?;
        }

        let table = table.unwrap_or_else(|| {
            Self::new(language, declared_dimension.unwrap_or_default()).with_source_id(source_id)
        });
        debug!(
            "Parsed {} word vectors ({} dimensions)",
            table.len(),
            table.dimension
        );

        Ok(table)
    }

    /// Load a word-vector file from disk.
    pub async fn load(path: impl AsRef<Path>, language: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await?;
        let table = Self::parse(language, &content)?;

        info!(
            "Loaded {} word vectors from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Number of words in the table.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Check if a word is in the vocabulary.
    pub fn contains(&self, word: &str) -> bool {
        self.vectors.contains_key(&word.to_lowercase())
    }
}

impl WordVectorSource for WordVectorTable {
    fn vector_for(&self, token: &str) -> Option<Embedding> {
        self.vectors.get(token).cloned()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn language(&self) -> &str {
        &self.language
    }

    fn source_id(&self) -> &str {
        &self.source_id
    }
}
