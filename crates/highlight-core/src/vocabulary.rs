//! Significant-word vocabulary built from key phrases

use std::collections::HashSet;

/// Characters removed from text-run tokens before lookup.
pub const STRIPPED_PUNCTUATION: &[char] = &[
    '.', ',', '/', '#', '!', '$', '%', '^', '&', '*', ';', ':', '{', '}', '=', '-', '_', '`', '~',
    '(', ')',
];

/// Tokens of this many characters or fewer are never significant.
const MIN_SIGNIFICANT_CHARS: usize = 3;

/// Lowercase words from the key phrases that are worth highlighting.
///
/// Phrase tokens are kept as written apart from lowercasing; only the tokens
/// of the searched text are stripped of punctuation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignificantWordSet {
    words: HashSet<String>,
}

impl SignificantWordSet {
    pub fn from_phrases<S: AsRef<str>>(phrases: &[S]) -> Self {
        let words = phrases
            .iter()
            .flat_map(|phrase| {
                phrase
                    .as_ref()
                    .to_lowercase()
                    .split_whitespace()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|word| is_significant(word))
            .collect();

        Self { words }
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    /// The first token of `text` that is in the set, after normalization.
    pub fn first_match(&self, text: &str) -> Option<String> {
        text.to_lowercase()
            .split_whitespace()
            .map(strip_punctuation)
            .find(|token| self.words.contains(token))
    }
}

fn is_significant(word: &str) -> bool {
    word.chars().count() > MIN_SIGNIFICANT_CHARS && !word.chars().all(|c| c.is_ascii_digit())
}

/// Remove every listed punctuation character, wherever it occurs in the token.
pub fn strip_punctuation(token: &str) -> String {
    token
        .chars()
        .filter(|c| !STRIPPED_PUNCTUATION.contains(c))
        .collect()
}
