//! Text embedding by averaging word vectors.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::Embedding;
use crate::similarity::average;
use crate::tokenizer::{Token, Tokenizer, UnicodeWordTokenizer};
use crate::word_vectors::WordVectorSource;

/// Maps arbitrary text to a single fixed-dimension vector.
///
/// The text is lowercased and split into words; every word found in the
/// word-vector source contributes its vector, and the result is the
/// component-wise mean of those vectors. Words missing from the vocabulary
/// are skipped. When no word has a vector the result is an empty
/// (zero-dimension) vector, which scores 0.0 against everything.
#[derive(Clone)]
pub struct TextEmbedder {
    source: Arc<dyn WordVectorSource>,
    tokenizer: Arc<dyn Tokenizer>,
}

impl TextEmbedder {
    /// Create an embedder over the given word-vector source using the
    /// Unicode word tokenizer.
    pub fn new(source: Arc<dyn WordVectorSource>) -> Self {
        Self {
            source,
            tokenizer: Arc::new(UnicodeWordTokenizer),
        }
    }

    /// Replace the tokenizer.
    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// The word-vector source.
    pub fn source(&self) -> &dyn WordVectorSource {
        self.source.as_ref()
    }

    /// Identifier of the word-vector source.
    pub fn source_id(&self) -> &str {
        self.source.source_id()
    }

    /// Dimension of non-empty embeddings.
    pub fn dimension(&self) -> usize {
        self.source.dimension()
    }

    /// Embed a piece of text.
    pub fn embed(&self, text: &str) -> Embedding {
        let vectors: Vec<Embedding> = self
            .tokenize(text)
            .iter()
            .filter_map(|token| self.lookup(&token.text))
            .collect();

        if vectors.is_empty() {
            debug!("No word vectors found for text: {text:?}");
            return Vec::new();
        }

        average(&vectors)
    }

    /// Embed several texts.
    pub fn embed_batch<S: AsRef<str>>(&self, texts: &[S]) -> Vec<Embedding> {
        texts.iter().map(|t| self.embed(t.as_ref())).collect()
    }

    /// The tokens of `text` that have a vector in the source.
    ///
    /// Spans refer to the lowercased text.
    pub fn matched_tokens(&self, text: &str) -> Vec<Token> {
        self.tokenize(text)
            .into_iter()
            .filter(|token| self.lookup(&token.text).is_some())
            .collect()
    }

    fn tokenize(&self, text: &str) -> Vec<Token> {
        self.tokenizer.tokenize(&text.to_lowercase())
    }

    fn lookup(&self, word: &str) -> Option<Embedding> {
        let vector = self.source.vector_for(word)?;
        let dimension = self.source.dimension();

        if vector.len() != dimension {
            warn!(
                "Ignoring vector for {word:?}: {} dimensions, source declares {dimension}",
                vector.len()
            );
            return None;
        }

        Some(vector)
    }
}

impl std::fmt::Debug for TextEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextEmbedder")
            .field("source_id", &self.source.source_id())
            .field("dimension", &self.source.dimension())
            .field("language", &self.source.language())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::cosine_similarity;
    use crate::word_vectors::WordVectorTable;
    use pretty_assertions::assert_eq;

    fn embedder() -> TextEmbedder {
        let table = WordVectorTable::from_pairs(
            "en",
            [
                ("dog", vec![1.0, 0.0, 0.0]),
                ("puppy", vec![0.9, 0.1, 0.0]),
                ("beach", vec![0.0, 1.0, 0.0]),
                ("sunset", vec![0.0, 0.6, 0.8]),
            ],
        )
        .unwrap();
        TextEmbedder::new(Arc::new(table))
    }

    fn assert_close(a: &[f32], b: &[f32]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-6, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn test_empty_text_embeds_to_empty_vector() {
        assert!(embedder().embed("").is_empty());
    }

    #[test]
    fn test_punctuation_only_embeds_to_empty_vector() {
        assert!(embedder().embed(" ?! ... ,, ").is_empty());
    }

    #[test]
    fn test_unknown_words_are_skipped() {
        let embedder = embedder();
        assert!(embedder.embed("zebra giraffe").is_empty());
        assert_eq!(embedder.embed("a zebra dog"), vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_embedding_is_mean_of_word_vectors() {
        let embedder = embedder();
        let combined = embedder.embed("dog on the beach at sunset");
        let expected = average(&[
            embedder.embed("dog"),
            embedder.embed("beach"),
            embedder.embed("sunset"),
        ]);
        assert_close(&combined, &expected);
        assert_close(&combined, &[1.0 / 3.0, 1.6 / 3.0, 0.8 / 3.0]);
    }

    #[test]
    fn test_embedding_ignores_case_and_word_order() {
        let embedder = embedder();
        assert_close(&embedder.embed("Beach DOG"), &embedder.embed("dog beach"));
    }

    #[test]
    fn test_embedding_is_deterministic() {
        let embedder = embedder();
        assert_eq!(embedder.embed("puppy, beach!"), embedder.embed("puppy, beach!"));
    }

    #[test]
    fn test_related_words_score_higher() {
        let embedder = embedder();
        let query = embedder.embed("puppy");
        let dog = cosine_similarity(&query, &embedder.embed("dog"));
        let beach = cosine_similarity(&query, &embedder.embed("beach"));
        assert!(dog > beach);
    }

    #[test]
    fn test_matched_tokens_and_batch() {
        let embedder = embedder();
        let matched: Vec<String> = embedder
            .matched_tokens("Dog near the sea")
            .into_iter()
            .map(|t| t.text)
            .collect();
        assert_eq!(matched, vec!["dog"]);

        let batch = embedder.embed_batch(&["dog", "", "beach"]);
        assert_eq!(batch.len(), 3);
        assert!(batch[1].is_empty());
        assert_eq!(embedder.dimension(), 3);
    }

    struct SloppySource;

    impl WordVectorSource for SloppySource {
        fn vector_for(&self, token: &str) -> Option<Embedding> {
            match token {
                "good" => Some(vec![1.0, 1.0]),
                "bad" => Some(vec![5.0]),
                _ => None,
            }
        }

        fn dimension(&self) -> usize {
            2
        }

        fn language(&self) -> &str {
            "en"
        }

        fn source_id(&self) -> &str {
            "sloppy"
        }
    }

    #[test]
    fn test_vectors_with_wrong_dimension_are_skipped() {
        let embedder = TextEmbedder::new(Arc::new(SloppySource));
        assert_eq!(embedder.embed("good bad"), vec![1.0, 1.0]);
        assert!(embedder.embed("bad").is_empty());
    }
}
