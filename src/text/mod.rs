//! Text feature extraction
//!
//! Everything the algorithms know about text comes from here:
//!
//! - **Normalization**: lowercase, punctuation replaced by spaces
//! - **Tokens and keywords**: keywords are tokens longer than two characters,
//!   not stopwords, deduplicated in first-seen order
//! - **Vectors**: see [`vector`] for the hashing contract
//! - **Lexicon matching**: technical terms, hedges, cue words, antonyms
//! - **Language features**: script-based language guess and register

pub mod lexicon;
mod vector;

pub use vector::{
    cosine_similarity, hashed_vector, normalize_l2, token_bucket, EmbeddingError,
    HashedBagOfWords, Vectorizer, VECTOR_DIMENSIONS,
};

#[cfg(feature = "embeddings")]
pub use vector::FastEmbedVectorizer;

use crate::graph::{LanguageFeatures, Score};
use std::collections::{BTreeMap, HashSet};

/// Share of letters a script needs before the text counts as that language
const DOMINANT_SCRIPT_SHARE: f64 = 0.8;

/// Lowercase and replace every non-alphanumeric character with a space
pub fn normalize(text: &str) -> String {
    let mapped: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .flat_map(char::to_lowercase)
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized token stream
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Whether `token` is in the stopword list
pub fn is_stopword(token: &str) -> bool {
    lexicon::STOPWORDS.contains(&token)
}

/// Keywords in first-seen order
pub fn keywords(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(text)
        .into_iter()
        .filter(|t| t.chars().count() > 2 && !is_stopword(t))
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Adjacent token pairs joined by a space
pub fn bigrams(tokens: &[String]) -> Vec<String> {
    tokens
        .windows(2)
        .map(|pair| format!("{} {}", pair[0], pair[1]))
        .collect()
}

/// Token → occurrence count
pub fn word_frequencies(tokens: &[String]) -> BTreeMap<String, usize> {
    let mut freq = BTreeMap::new();
    for token in tokens {
        *freq.entry(token.clone()).or_insert(0) += 1;
    }
    freq
}

/// Split into sentences on terminal punctuation and line breaks
pub fn sentences(text: &str) -> Vec<&str> {
    text.split(|c| matches!(c, '.' | '!' | '?' | '\n'))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Number of lexicon hits in `text`.
///
/// Single-word entries count every token starting with the entry; phrase
/// entries count occurrences starting at a word boundary.
pub fn count_term_hits(text: &str, terms: &[&str]) -> usize {
    let normalized = normalize(text);
    let padded = format!(" {} ", normalized);
    let tokens: Vec<&str> = normalized.split_whitespace().collect();

    terms
        .iter()
        .map(|term| {
            if term.contains(' ') {
                padded.matches(&format!(" {}", term)).count()
            } else {
                tokens.iter().filter(|t| t.starts_with(term)).count()
            }
        })
        .sum()
}

/// Whether any lexicon entry occurs in `text`
pub fn mentions_any(text: &str, terms: &[&str]) -> bool {
    count_term_hits(text, terms) > 0
}

/// Number of technical terms in `text`
pub fn technical_term_count(text: &str) -> usize {
    count_term_hits(text, lexicon::TECHNICAL_TERMS)
}

/// Number of hedging phrases in `text`
pub fn ambiguity_count(text: &str) -> usize {
    count_term_hits(text, lexicon::AMBIGUOUS_PHRASES)
}

/// Antonym pairs split across the two token sets, either way round
pub fn opposing_pairs(a: &HashSet<String>, b: &HashSet<String>) -> usize {
    lexicon::ANTONYM_PAIRS
        .iter()
        .filter(|(x, y)| {
            (a.contains(*x) && b.contains(*y)) || (a.contains(*y) && b.contains(*x))
        })
        .count()
}

/// Script-based language guess plus size and register statistics
pub fn language_features(text: &str) -> LanguageFeatures {
    let mut cyrillic = 0usize;
    let mut latin = 0usize;
    for c in text.chars().filter(|c| c.is_alphabetic()) {
        if ('\u{0400}'..='\u{04FF}').contains(&c) {
            cyrillic += 1;
        } else if c.is_ascii_alphabetic() {
            latin += 1;
        }
    }

    let letters = cyrillic + latin;
    let (language, confidence) = if letters == 0 {
        ("unknown", 0.0)
    } else {
        let share_ru = cyrillic as f64 / letters as f64;
        let share_en = latin as f64 / letters as f64;
        if share_ru >= DOMINANT_SCRIPT_SHARE {
            ("ru", share_ru)
        } else if share_en >= DOMINANT_SCRIPT_SHARE {
            ("en", share_en)
        } else {
            ("mixed", share_ru.max(share_en))
        }
    };

    let word_count = tokenize(text).len();
    LanguageFeatures {
        language: language.to_string(),
        confidence: Score::new(confidence),
        text_length: text.chars().count(),
        word_count,
        formality: Score::new(formality(text)),
    }
}

/// 1.0 for neutral text, lower with exclamations, emoticons and slang
fn formality(text: &str) -> f64 {
    if text.trim().is_empty() {
        return 0.0;
    }
    let sentence_count = sentences(text).len().max(1) as f64;
    let exclamations = text.matches('!').count();
    let emoticons = text.matches(":)").count() + text.matches(":(").count() + text.matches(")))").count();
    let slang = tokenize(text)
        .iter()
        .filter(|t| lexicon::INFORMAL_MARKERS.contains(&t.as_str()))
        .count();
    let markers = (exclamations + emoticons + slang) as f64;
    1.0 - (markers / sentence_count).min(1.0)
}
