//! Text vectorization and similarity
//!
//! The default `HashedBagOfWords` is feature hashing over the normalized
//! token stream: each distinct token adds its in-text frequency to bucket
//! `hash(token) mod 100`, then the vector is L2-normalized. The token hash is
//! the first eight bytes of SHA-256, so vectors are identical across builds
//! and platforms.
//!
//! Uses a trait-based backend (`Vectorizer`) so a learned embedding model can
//! stand in behind the same similarity contract.

use super::{tokenize, word_frequencies};
use sha2::{Digest, Sha256};
use std::fmt;

/// Dimensionality of the hashed vectors
pub const VECTOR_DIMENSIONS: usize = 100;

/// Error type for vectorization backends.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingError {
    /// The model returned no vector
    EmptyResult,
    /// Model loading or inference failed
    ModelError(String),
}

impl fmt::Display for EmbeddingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbeddingError::EmptyResult => write!(f, "embedding returned no results"),
            EmbeddingError::ModelError(msg) => write!(f, "embedding model error: {}", msg),
        }
    }
}

impl std::error::Error for EmbeddingError {}

/// Turns text into a fixed-length numeric vector.
pub trait Vectorizer: Send + Sync {
    /// Backend name, recorded in logs
    fn name(&self) -> &str;

    /// Vector length produced by this backend
    fn dimensions(&self) -> usize;

    /// Vectorize one text
    fn vectorize(&self, text: &str) -> Result<Vec<f64>, EmbeddingError>;
}

/// Feature-hashed bag of words.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashedBagOfWords;

impl Vectorizer for HashedBagOfWords {
    fn name(&self) -> &str {
        "hashed-bow"
    }

    fn dimensions(&self) -> usize {
        VECTOR_DIMENSIONS
    }

    fn vectorize(&self, text: &str) -> Result<Vec<f64>, EmbeddingError> {
        Ok(hashed_vector(text))
    }
}

/// Hashed bag-of-words vector for `text`
pub fn hashed_vector(text: &str) -> Vec<f64> {
    let mut vector = vec![0.0; VECTOR_DIMENSIONS];
    let tokens = tokenize(text);
    for (token, count) in word_frequencies(&tokens) {
        vector[token_bucket(&token)] += count as f64;
    }
    normalize_l2(&mut vector);
    vector
}

/// Bucket index of a token
pub fn token_bucket(token: &str) -> usize {
    let digest = Sha256::digest(token.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(prefix) % VECTOR_DIMENSIONS as u64) as usize
}

/// Scale to unit length in place; the zero vector is left untouched
pub fn normalize_l2(vector: &mut [f64]) {
    let norm = vector.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 when either vector has zero magnitude or the lengths differ.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

// ---------------------------------------------------------------------------
// FastEmbedVectorizer: learned embeddings behind `embeddings` feature
// ---------------------------------------------------------------------------

#[cfg(feature = "embeddings")]
mod fastembed_impl {
    use super::{EmbeddingError, Vectorizer};
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use std::sync::Mutex;

    /// Vectorizer backed by fastembed (ONNX Runtime).
    ///
    /// Wraps `fastembed::TextEmbedding` in a `Mutex` because its `embed`
    /// method requires `&mut self`, while the `Vectorizer` trait uses `&self`.
    pub struct FastEmbedVectorizer {
        model: Mutex<TextEmbedding>,
        dimensions: usize,
    }

    impl FastEmbedVectorizer {
        /// Load a model; `dimensions` is the model's output size
        pub fn new(model: EmbeddingModel, dimensions: usize) -> Result<Self, EmbeddingError> {
            let options = InitOptions::new(model).with_show_download_progress(false);
            let embedding = TextEmbedding::try_new(options)
                .map_err(|e| EmbeddingError::ModelError(e.to_string()))?;
            Ok(Self {
                model: Mutex::new(embedding),
                dimensions,
            })
        }

        /// Multilingual MiniLM, which handles the Russian-language FAQ content
        pub fn multilingual() -> Result<Self, EmbeddingError> {
            Self::new(EmbeddingModel::ParaphraseMLMiniLML12V2, 384)
        }
    }

    impl Vectorizer for FastEmbedVectorizer {
        fn name(&self) -> &str {
            "fastembed"
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }

        fn vectorize(&self, text: &str) -> Result<Vec<f64>, EmbeddingError> {
            let mut model = self
                .model
                .lock()
                .map_err(|e| EmbeddingError::ModelError(e.to_string()))?;
            let embeddings = model
                .embed(vec![text], None)
                .map_err(|e| EmbeddingError::ModelError(e.to_string()))?;
            let first = embeddings.into_iter().next().ok_or(EmbeddingError::EmptyResult)?;
            Ok(first.into_iter().map(f64::from).collect())
        }
    }
}

#[cfg(feature = "embeddings")]
pub use fastembed_impl::FastEmbedVectorizer;
