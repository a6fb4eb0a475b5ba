//! Word-level tokenization.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// A word token and its byte span in the tokenized text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// The token text.
    pub text: String,

    /// Byte range of the token within the input.
    pub span: Range<usize>,
}

impl Token {
    /// Create a new token.
    pub fn new(text: impl Into<String>, span: Range<usize>) -> Self {
        Self {
            text: text.into(),
            span,
        }
    }
}

/// Splits text into word tokens.
///
/// Implementations must drop punctuation and whitespace; only word-like
/// tokens are looked up in a word-vector source.
pub trait Tokenizer: Send + Sync {
    /// Tokenize the given text.
    fn tokenize(&self, text: &str) -> Vec<Token>;
}

/// Tokenizer following the Unicode word boundary rules (UAX #29).
///
/// Contractions such as "don't" and numbers such as "3.5" stay single tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeWordTokenizer;

impl Tokenizer for UnicodeWordTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        text.unicode_word_indices()
            .map(|(start, word)| Token::new(word, start..start + word.len()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn words(text: &str) -> Vec<String> {
        UnicodeWordTokenizer
            .tokenize(text)
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_drops_punctuation_and_whitespace() {
        assert_eq!(words("golden retriever, on a beach!"), vec![
            "golden",
            "retriever",
            "on",
            "a",
            "beach"
        ]);
        assert!(words("  ...?!  -- ").is_empty());
        assert!(words("").is_empty());
    }

    #[test]
    fn test_spans_point_into_input() {
        let text = "red  car";
        let tokens = UnicodeWordTokenizer.tokenize(text);
        assert_eq!(tokens.len(), 2);
        assert_eq!(&text[tokens[1].span.clone()], "car");
        assert_eq!(tokens[1].span, 5..8);
    }

    #[test]
    fn test_keeps_contractions_together() {
        assert_eq!(words("don't stop"), vec!["don't", "stop"]);
    }
}
