//! FAQ lookup by question similarity
//!
//! Every node contributes one index entry for its query and one per
//! variation. A search embeds the question, scores it against every entry,
//! keeps the best entry per node and returns the top `k` nodes at or above
//! the threshold. Query vectors are cached, since users repeat questions.

use crate::graph::{FaqNode, NodeId};
use crate::text::{cosine_similarity, EmbeddingError, HashedBagOfWords, Vectorizer};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Default minimum similarity for a hit
pub const DEFAULT_THRESHOLD: f64 = 0.5;
/// Default number of hits returned
pub const DEFAULT_TOP_K: usize = 3;

/// Search settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// One matching node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub node: NodeId,
    /// Position of the node in the indexed collection
    pub index: usize,
    pub similarity: f64,
    pub query: String,
    pub response: String,
    /// The query or variation that matched best
    pub matched_text: String,
}

struct IndexEntry {
    node_index: usize,
    text: String,
    vector: Vec<f64>,
}

/// Snapshot index over a node collection
pub struct FaqSearcher {
    nodes: Vec<FaqNode>,
    entries: Vec<IndexEntry>,
    vectorizer: Arc<dyn Vectorizer>,
    config: SearchConfig,
    query_cache: DashMap<String, Vec<f64>>,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl FaqSearcher {
    /// Index `nodes` with hashed bag-of-words vectors
    pub fn new(nodes: Vec<FaqNode>) -> Result<Self, EmbeddingError> {
        Self::with_vectorizer(nodes, Arc::new(HashedBagOfWords), SearchConfig::default())
    }

    /// Index `nodes` with the given vectorizer and settings
    pub fn with_vectorizer(
        nodes: Vec<FaqNode>,
        vectorizer: Arc<dyn Vectorizer>,
        config: SearchConfig,
    ) -> Result<Self, EmbeddingError> {
        let mut entries = Vec::new();
        for (node_index, node) in nodes.iter().enumerate() {
            let texts = std::iter::once(&node.query).chain(node.variations.iter());
            for text in texts.map(|t| t.trim()).filter(|t| !t.is_empty()) {
                entries.push(IndexEntry {
                    node_index,
                    text: text.to_string(),
                    vector: vectorizer.vectorize(text)?,
                });
            }
        }
        debug!(
            nodes = nodes.len(),
            entries = entries.len(),
            vectorizer = vectorizer.name(),
            "Built search index"
        );
        Ok(Self {
            nodes,
            entries,
            vectorizer,
            config,
            query_cache: DashMap::new(),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
        })
    }

    pub fn nodes(&self) -> &[FaqNode] {
        &self.nodes
    }

    /// Number of indexed texts (queries plus variations)
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// (hits, misses) of the query-vector cache
    pub fn cache_stats(&self) -> (u64, u64) {
        (
            self.cache_hits.load(Ordering::Relaxed),
            self.cache_misses.load(Ordering::Relaxed),
        )
    }

    /// Search with the configured `k` and threshold
    pub fn search(&self, question: &str) -> Result<Vec<SearchHit>, EmbeddingError> {
        self.search_with(question, self.config.top_k, self.config.threshold)
    }

    /// Search with explicit `k` and threshold.
    ///
    /// A threshold outside [0, 1] falls back to the configured one.
    pub fn search_with(&self, question: &str, k: usize, threshold: f64) -> Result<Vec<SearchHit>, EmbeddingError> {
        let question = question.trim();
        if question.is_empty() || k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }
        let threshold = if (0.0..=1.0).contains(&threshold) {
            threshold
        } else {
            warn!(threshold, fallback = self.config.threshold, "Invalid search threshold");
            self.config.threshold
        };

        let vector = self.query_vector(question)?;

        // best entry per node
        let mut best: HashMap<usize, (f64, usize)> = HashMap::new();
        let mut max_similarity = 0.0f64;
        for (entry_index, entry) in self.entries.iter().enumerate() {
            let similarity = cosine_similarity(&vector, &entry.vector);
            max_similarity = max_similarity.max(similarity);
            let slot = best.entry(entry.node_index).or_insert((f64::NEG_INFINITY, entry_index));
            if similarity > slot.0 {
                *slot = (similarity, entry_index);
            }
        }

        let mut ranked: Vec<(usize, f64, usize)> = best
            .into_iter()
            .filter(|(_, (similarity, _))| *similarity >= threshold)
            .map(|(node_index, (similarity, entry_index))| (node_index, similarity, entry_index))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(k);

        if ranked.is_empty() {
            debug!(question, max_similarity, threshold, "No match above threshold");
        }

        Ok(ranked
            .into_iter()
            .map(|(node_index, similarity, entry_index)| {
                let node = &self.nodes[node_index];
                SearchHit {
                    node: node.id().clone(),
                    index: node_index,
                    similarity,
                    query: node.query.clone(),
                    response: node.response.clone(),
                    matched_text: self.entries[entry_index].text.clone(),
                }
            })
            .collect())
    }

    fn query_vector(&self, question: &str) -> Result<Vec<f64>, EmbeddingError> {
        if let Some(cached) = self.query_cache.get(question) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(cached.value().clone());
        }
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
        let vector = self.vectorizer.vectorize(question)?;
        self.query_cache.insert(question.to_string(), vector.clone());
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn searcher() -> FaqSearcher {
        FaqSearcher::new(vec![
            FaqNode::new("How do I reset my password?", "Use the reset link.")
                .with_variation("Forgot password"),
            FaqNode::new("Where is the office?", "Main street 5."),
            FaqNode::new("What are the opening hours?", "Nine to five."),
        ])
        .unwrap()
    }

    #[test]
    fn indexes_queries_and_variations() {
        assert_eq!(searcher().entry_count(), 4);
    }

    #[test]
    fn exact_question_ranks_first() {
        let hits = searcher().search("Where is the office?").unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].query, "Where is the office?");
        assert!((hits[0].similarity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn variations_are_matched() {
        let hits = searcher().search("forgot password").unwrap();
        assert_eq!(hits[0].index, 0);
        assert_eq!(hits[0].matched_text, "Forgot password");
    }

    #[test]
    fn blank_question_has_no_hits() {
        assert!(searcher().search("   ").unwrap().is_empty());
    }

    #[test]
    fn one_hit_per_node() {
        let s = searcher();
        let hits = s.search_with("password", 10, 0.0).unwrap();
        let zero = hits.iter().filter(|h| h.index == 0).count();
        assert_eq!(zero, 1);
        assert!(hits.len() <= 3);
    }

    #[test]
    fn invalid_threshold_falls_back() {
        let s = searcher();
        let hits = s.search_with("Where is the office?", 3, 7.5).unwrap();
        assert_eq!(hits[0].index, 1);
    }

    #[test]
    fn repeated_questions_hit_the_cache() {
        let s = searcher();
        s.search("Where is the office?").unwrap();
        s.search("Where is the office?").unwrap();
        assert_eq!(s.cache_stats(), (1, 1));
    }
}
