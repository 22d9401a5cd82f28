//! Smart linking: prerequisite, follow-up, related and contradiction edges
//!
//! Complexity scores are computed first and written back to the nodes. The
//! directed passes look at every ordered pair, the undirected ones at i < j
//! only. All candidates are then capped per source node to the strongest
//! `max_links_per_node`.

use super::{check_input, ensure_features};
use crate::analysis::traits::{ExecutionContext, FaqAlgorithm};
use crate::analysis::types::{
    AlgorithmConfig, AlgorithmError, AlgorithmResult, OptimizationSuggestion, SuggestionType,
    ValidationReport,
};
use crate::graph::{Connection, ConnectionType, FaqNode, NodeId};
use crate::scoring;
use crate::text::{self, cosine_similarity, lexicon, HashedBagOfWords, Vectorizer};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

const NAME: &str = "relationship_linking";

#[derive(Debug, Clone, PartialEq)]
struct LinkParams {
    prerequisite_threshold: f64,
    follow_up_threshold: f64,
    related_threshold: f64,
    contradiction_threshold: f64,
    max_links_per_node: usize,
    complexity_gap_weight: f64,
    complexity_gap_cap: f64,
    prerequisite_similarity_cap: f64,
    prerequisite_cue_bonus: f64,
    follow_up_similarity_weight: f64,
    follow_up_cue_bonus: f64,
    follow_up_complexity_cap: f64,
    related_similarity_weight: f64,
    related_keyword_cap: f64,
    related_resource_bonus: f64,
    antonym_pair_bonus: f64,
    divergence_question_similarity: f64,
    divergence_response_similarity: f64,
    divergence_bonus: f64,
}

impl LinkParams {
    fn from_config(config: &AlgorithmConfig) -> Result<Self, AlgorithmError> {
        Ok(Self {
            prerequisite_threshold: config.float("prerequisite_threshold")?,
            follow_up_threshold: config.float("follow_up_threshold")?,
            related_threshold: config.float("related_threshold")?,
            contradiction_threshold: config.float("contradiction_threshold")?,
            max_links_per_node: config.usize("max_links_per_node")?,
            complexity_gap_weight: config.float("complexity_gap_weight")?,
            complexity_gap_cap: config.float("complexity_gap_cap")?,
            prerequisite_similarity_cap: config.float("prerequisite_similarity_cap")?,
            prerequisite_cue_bonus: config.float("prerequisite_cue_bonus")?,
            follow_up_similarity_weight: config.float("follow_up_similarity_weight")?,
            follow_up_cue_bonus: config.float("follow_up_cue_bonus")?,
            follow_up_complexity_cap: config.float("follow_up_complexity_cap")?,
            related_similarity_weight: config.float("related_similarity_weight")?,
            related_keyword_cap: config.float("related_keyword_cap")?,
            related_resource_bonus: config.float("related_resource_bonus")?,
            antonym_pair_bonus: config.float("antonym_pair_bonus")?,
            divergence_question_similarity: config.float("divergence_question_similarity")?,
            divergence_response_similarity: config.float("divergence_response_similarity")?,
            divergence_bonus: config.float("divergence_bonus")?,
        })
    }
}

/// Per-node inputs to the scoring passes
struct LinkFeatures {
    id: NodeId,
    query: String,
    complexity: f64,
    vector: Vec<f64>,
    question_vector: Vec<f64>,
    response_vector: Vec<f64>,
    keywords: BTreeSet<String>,
    tokens: HashSet<String>,
    files: BTreeSet<String>,
    prerequisite_cue: bool,
    follow_up_cue: bool,
}

impl LinkFeatures {
    fn of(node: &FaqNode, vectorizer: &dyn Vectorizer) -> Result<Self, AlgorithmError> {
        let combined = node.combined_text();
        Ok(Self {
            id: node.id().clone(),
            query: node.query.clone(),
            complexity: node.algorithm_props.complexity.get(),
            vector: node.algorithm_props.semantic_vector.clone(),
            question_vector: vectorizer.vectorize(&node.query)?,
            response_vector: vectorizer.vectorize(&node.response)?,
            keywords: node.algorithm_props.keywords.iter().cloned().collect(),
            tokens: text::tokenize(&combined).into_iter().collect(),
            files: node.file_paths().into_iter().map(str::to_string).collect(),
            prerequisite_cue: text::mentions_any(&combined, lexicon::PREREQUISITE_CUES),
            follow_up_cue: text::mentions_any(&combined, lexicon::FOLLOW_UP_CUES),
        })
    }
}

/// Keep the `max` strongest connections per source node.
///
/// Sources keep their first-seen order; within a source, ties keep their
/// input order.
pub fn cap_links_per_node(connections: Vec<Connection>, max: usize) -> Vec<Connection> {
    let mut order: Vec<NodeId> = Vec::new();
    let mut by_source: HashMap<NodeId, Vec<Connection>> = HashMap::new();
    for connection in connections {
        let bucket = by_source.entry(connection.source.clone()).or_insert_with(|| {
            order.push(connection.source.clone());
            Vec::new()
        });
        bucket.push(connection);
    }

    let mut capped = Vec::new();
    for source in order {
        if let Some(mut bucket) = by_source.remove(&source) {
            bucket.sort_by(|a, b| b.strength.get().total_cmp(&a.strength.get()));
            bucket.truncate(max);
            capped.extend(bucket);
        }
    }
    capped
}

/// Infers learning-order and topical relationships between nodes
pub struct RelationshipLinker {
    config: AlgorithmConfig,
    vectorizer: Arc<dyn Vectorizer>,
}

impl Default for RelationshipLinker {
    fn default() -> Self {
        Self::new()
    }
}

impl RelationshipLinker {
    pub fn new() -> Self {
        Self {
            config: Self::default_config(),
            vectorizer: Arc::new(HashedBagOfWords),
        }
    }

    pub fn with_vectorizer(mut self, vectorizer: Arc<dyn Vectorizer>) -> Self {
        self.vectorizer = vectorizer;
        self
    }

    pub fn default_config() -> AlgorithmConfig {
        AlgorithmConfig::new()
            .with_param("prerequisite_threshold", 0.5)
            .with_param("follow_up_threshold", 0.5)
            .with_param("related_threshold", 0.3)
            .with_param("contradiction_threshold", 0.6)
            .with_param("max_links_per_node", 8i64)
            .with_param("complexity_gap_weight", 2.0)
            .with_param("complexity_gap_cap", 0.4)
            .with_param("prerequisite_similarity_cap", 0.3)
            .with_param("prerequisite_cue_bonus", 0.3)
            .with_param("follow_up_similarity_weight", 0.4)
            .with_param("follow_up_cue_bonus", 0.3)
            .with_param("follow_up_complexity_cap", 0.3)
            .with_param("related_similarity_weight", 0.5)
            .with_param("related_keyword_cap", 0.3)
            .with_param("related_resource_bonus", 0.2)
            .with_param("antonym_pair_bonus", 0.3)
            .with_param("divergence_question_similarity", 0.7)
            .with_param("divergence_response_similarity", 0.3)
            .with_param("divergence_bonus", 0.4)
    }

    /// `source` should be read before `target`; the cue is looked for in
    /// the target, which refers back to what it needs
    fn prerequisite(source: &LinkFeatures, target: &LinkFeatures, p: &LinkParams) -> Option<Connection> {
        if source.complexity >= target.complexity {
            return None;
        }
        let gap = ((target.complexity - source.complexity) * p.complexity_gap_weight).min(p.complexity_gap_cap);
        let similarity = cosine_similarity(&source.vector, &target.vector).max(0.0);
        let cue = if target.prerequisite_cue {
            p.prerequisite_cue_bonus
        } else {
            0.0
        };
        let score = gap + similarity.min(p.prerequisite_similarity_cap) + cue;
        (score >= p.prerequisite_threshold).then(|| {
            Connection::new(
                source.id.clone(),
                target.id.clone(),
                ConnectionType::Prerequisite,
                score,
                NAME,
            )
            .with_description(format!("Read '{}' first", source.query))
        })
    }

    /// `target` is a natural next question after `source`
    fn follow_up(source: &LinkFeatures, target: &LinkFeatures, p: &LinkParams) -> Option<Connection> {
        let similarity = cosine_similarity(&source.vector, &target.vector).max(0.0);
        let cue = if target.follow_up_cue {
            p.follow_up_cue_bonus
        } else {
            0.0
        };
        let delta = (target.complexity - source.complexity)
            .max(0.0)
            .min(p.follow_up_complexity_cap);
        let score = similarity * p.follow_up_similarity_weight + cue + delta;
        (score >= p.follow_up_threshold).then(|| {
            Connection::new(
                source.id.clone(),
                target.id.clone(),
                ConnectionType::FollowUp,
                score,
                NAME,
            )
            .with_description(format!("Ask next after '{}'", source.query))
        })
    }

    fn related(a: &LinkFeatures, b: &LinkFeatures, p: &LinkParams) -> Option<Connection> {
        let similarity = cosine_similarity(&a.vector, &b.vector).max(0.0);
        let smaller = a.keywords.len().min(b.keywords.len());
        let shared = a.keywords.intersection(&b.keywords).count();
        let keyword_ratio = if smaller == 0 {
            0.0
        } else {
            shared as f64 / smaller as f64
        };
        let resource = if a.files.intersection(&b.files).next().is_some() {
            p.related_resource_bonus
        } else {
            0.0
        };
        let score = similarity * p.related_similarity_weight + keyword_ratio.min(p.related_keyword_cap) + resource;
        (score >= p.related_threshold).then(|| {
            Connection::new(a.id.clone(), b.id.clone(), ConnectionType::Related, score, NAME)
                .with_description(format!("{} shared keyword(s)", shared))
        })
    }

    fn contradiction(a: &LinkFeatures, b: &LinkFeatures, p: &LinkParams) -> Option<Connection> {
        let pairs = text::opposing_pairs(&a.tokens, &b.tokens);
        let question_similarity = cosine_similarity(&a.question_vector, &b.question_vector);
        let response_similarity = cosine_similarity(&a.response_vector, &b.response_vector);
        let diverges = question_similarity > p.divergence_question_similarity
            && response_similarity < p.divergence_response_similarity;

        let mut score = pairs as f64 * p.antonym_pair_bonus;
        if diverges {
            score += p.divergence_bonus;
        }
        (score >= p.contradiction_threshold).then(|| {
            Connection::new(a.id.clone(), b.id.clone(), ConnectionType::Contradiction, score, NAME)
                .with_description(format!(
                    "{} opposing term pair(s){}",
                    pairs,
                    if diverges { ", same question with different answers" } else { "" }
                ))
        })
    }
}

#[async_trait]
impl FaqAlgorithm for RelationshipLinker {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Links prerequisite, follow-up, related and contradicting questions"
    }

    fn configuration(&self) -> &AlgorithmConfig {
        &self.config
    }

    fn update_configuration(&mut self, overrides: &AlgorithmConfig) {
        self.config = self.config.merged(overrides);
    }

    fn validate(&self, nodes: &[FaqNode]) -> ValidationReport {
        let mut report = ValidationReport::new();
        check_input(nodes, 2, &mut report);
        match LinkParams::from_config(&self.config) {
            Ok(p) if p.max_links_per_node == 0 => {
                report.add_warning("max_links_per_node is 0, every link will be dropped")
            }
            Ok(_) => {}
            Err(e) => report.add_error(e.to_string()),
        }
        report
    }

    async fn execute(
        &self,
        nodes: &mut [FaqNode],
        ctx: &ExecutionContext,
    ) -> Result<AlgorithmResult, AlgorithmError> {
        let params = LinkParams::from_config(&self.config)?;
        let mut result = AlgorithmResult::new(NAME);
        result.processed_nodes = nodes.len();
        if nodes.is_empty() {
            return Ok(result);
        }

        ensure_features(nodes, self.vectorizer.as_ref(), ctx)?;
        scoring::assign_complexity(nodes);

        let mut features = Vec::with_capacity(nodes.len());
        for node in nodes.iter() {
            ctx.checkpoint()?;
            features.push(LinkFeatures::of(node, self.vectorizer.as_ref())?);
        }

        let mut candidates = Vec::new();
        let mut counts: HashMap<ConnectionType, usize> = HashMap::new();
        let mut contradictions = Vec::new();
        for (i, a) in features.iter().enumerate() {
            ctx.checkpoint()?;
            for (j, b) in features.iter().enumerate() {
                if i == j {
                    continue;
                }
                ctx.checkpoint()?;
                let mut found = vec![
                    Self::prerequisite(a, b, &params),
                    Self::follow_up(a, b, &params),
                ];
                if i < j {
                    found.push(Self::related(a, b, &params));
                    found.push(Self::contradiction(a, b, &params));
                }
                for connection in found.into_iter().flatten() {
                    *counts.entry(connection.connection_type).or_insert(0) += 1;
                    if connection.connection_type == ConnectionType::Contradiction {
                        contradictions.push(connection.clone());
                    }
                    candidates.push(connection);
                }
            }
            tokio::task::yield_now().await;
        }

        let before = candidates.len();
        let links = cap_links_per_node(candidates, params.max_links_per_node);
        debug!(before, after = links.len(), "Capped links per source node");

        let mut isolated = 0usize;
        for f in &features {
            if !links.iter().any(|c| c.touches(&f.id)) {
                isolated += 1;
                result.add_suggestion(
                    OptimizationSuggestion::new(
                        SuggestionType::CreateConnection,
                        format!("'{}' is not linked to any other question", f.query),
                        2,
                        0.5,
                    )
                    .with_node(f.id.clone()),
                );
            }
        }
        for c in &contradictions {
            result.add_suggestion(
                OptimizationSuggestion::new(
                    SuggestionType::Restructure,
                    "Answers appear to contradict each other; reconcile them",
                    4,
                    c.strength.get(),
                )
                .with_node(c.source.clone())
                .with_node(c.target.clone()),
            );
        }

        let count = |kind: ConnectionType| counts.get(&kind).copied().unwrap_or(0) as f64;
        result.set_metric("prerequisite_links", count(ConnectionType::Prerequisite));
        result.set_metric("follow_up_links", count(ConnectionType::FollowUp));
        result.set_metric("related_links", count(ConnectionType::Related));
        result.set_metric("contradiction_links", count(ConnectionType::Contradiction));
        result.set_metric("links_removed_by_cap", (before - links.len()) as f64);
        result.set_metric("isolated_nodes", isolated as f64);
        result.connections = links;
        info!(
            nodes = nodes.len(),
            links = result.connections.len(),
            isolated,
            "Relationship linking complete"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(source: &str, target: &str, strength: f64) -> Connection {
        Connection::new(
            NodeId::from_string(source),
            NodeId::from_string(target),
            ConnectionType::Related,
            strength,
            "test",
        )
    }

    fn linker(overrides: AlgorithmConfig) -> RelationshipLinker {
        let mut algorithm = RelationshipLinker::new();
        algorithm.update_configuration(&overrides);
        algorithm
    }

    #[test]
    fn cap_keeps_strongest_per_source() {
        let mut connections: Vec<Connection> = (1..=12)
            .map(|k| edge("hub", &format!("n{}", k), k as f64 / 100.0))
            .collect();
        connections.push(edge("other", "hub", 0.01));

        let capped = cap_links_per_node(connections, 8);
        let from_hub: Vec<f64> = capped
            .iter()
            .filter(|c| c.source.as_str() == "hub")
            .map(|c| c.strength.get())
            .collect();
        assert_eq!(from_hub.len(), 8);
        assert!((from_hub[0] - 0.12).abs() < 1e-9);
        assert!(from_hub.iter().all(|s| *s >= 0.05 - 1e-9));
        assert_eq!(capped.iter().filter(|c| c.source.as_str() == "other").count(), 1);
    }

    #[test]
    fn cap_of_zero_drops_everything() {
        assert!(cap_links_per_node(vec![edge("a", "b", 0.9)], 0).is_empty());
    }

    #[tokio::test]
    async fn complexity_is_written_back() {
        let mut nodes = vec![
            FaqNode::new("Hi?", "Yes."),
            FaqNode::new(
                "How do I configure the proxy server?",
                "Open the config file, set the proxy address and restart the server.",
            ),
        ];
        RelationshipLinker::new()
            .execute(&mut nodes, &ExecutionContext::new())
            .await
            .unwrap();
        assert!(nodes[1].algorithm_props.complexity > nodes[0].algorithm_props.complexity);
    }

    #[tokio::test]
    async fn opposite_answers_to_the_same_question_contradict() {
        let mut nodes = vec![
            FaqNode::new("Is parking free?", "Yes, parking is always free."),
            FaqNode::new("Is parking free?", "No, you never get it for nothing."),
        ];
        let result = RelationshipLinker::new()
            .execute(&mut nodes, &ExecutionContext::new())
            .await
            .unwrap();

        let contradiction = result
            .connections
            .iter()
            .find(|c| c.connection_type == ConnectionType::Contradiction)
            .expect("contradiction link");
        assert!(contradiction.strength.get() >= 0.6);
        assert!(result
            .suggestions
            .iter()
            .any(|s| s.suggestion_type == SuggestionType::Restructure && s.priority == 4));
    }

    #[tokio::test]
    async fn unrelated_nodes_get_isolation_suggestions() {
        let mut nodes = vec![
            FaqNode::new("Where is the office?", "Main street."),
            FaqNode::new("Opening hours?", "Nine to five."),
        ];
        let result = linker(AlgorithmConfig::new().with_param("related_threshold", 0.9))
            .execute(&mut nodes, &ExecutionContext::new())
            .await
            .unwrap();
        assert!(result.connections.is_empty());
        let isolated = result
            .suggestions
            .iter()
            .filter(|s| s.suggestion_type == SuggestionType::CreateConnection)
            .count();
        assert_eq!(isolated, 2);
    }

    #[tokio::test]
    async fn empty_input_succeeds() {
        let result = RelationshipLinker::new()
            .execute(&mut [], &ExecutionContext::new())
            .await
            .unwrap();
        assert!(result.is_successful());
        assert!(result.connections.is_empty());
        assert!(result.suggestions.is_empty());
    }
}
