//! Pairwise connection discovery
//!
//! Four independent passes over every unordered pair: vector similarity,
//! keyword overlap, shared file attachments and near-duplicates. A pair can
//! be connected by several passes; nothing here deduplicates across them.

use super::{check_input, ensure_features};
use crate::analysis::traits::{ExecutionContext, FaqAlgorithm};
use crate::analysis::types::{
    AlgorithmConfig, AlgorithmError, AlgorithmResult, OptimizationSuggestion, SuggestionType,
    ValidationReport,
};
use crate::graph::{Connection, ConnectionType, FaqNode, NodeId, PropertyValue};
use crate::text::{cosine_similarity, HashedBagOfWords, Vectorizer};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

const NAME: &str = "connection_discovery";

#[derive(Debug, Clone, PartialEq)]
struct DiscoveryParams {
    enable_semantic: bool,
    semantic_threshold: f64,
    enable_keyword: bool,
    keyword_overlap_threshold: f64,
    min_shared_keywords: usize,
    enable_file_reference: bool,
    enable_duplicate: bool,
    duplicate_threshold: f64,
}

impl DiscoveryParams {
    fn from_config(config: &AlgorithmConfig) -> Result<Self, AlgorithmError> {
        Ok(Self {
            enable_semantic: config.bool("enable_semantic")?,
            semantic_threshold: config.float("semantic_threshold")?,
            enable_keyword: config.bool("enable_keyword")?,
            keyword_overlap_threshold: config.float("keyword_overlap_threshold")?,
            min_shared_keywords: config.usize("min_shared_keywords")?,
            enable_file_reference: config.bool("enable_file_reference")?,
            enable_duplicate: config.bool("enable_duplicate")?,
            duplicate_threshold: config.float("duplicate_threshold")?,
        })
    }
}

/// What one pass needs from a node, detached from the node itself
struct PairFeatures {
    id: NodeId,
    vector: Vec<f64>,
    keywords: BTreeSet<String>,
    files: BTreeSet<String>,
    hash: String,
}

impl PairFeatures {
    fn of(node: &FaqNode) -> Self {
        Self {
            id: node.id().clone(),
            vector: node.algorithm_props.semantic_vector.clone(),
            keywords: node.algorithm_props.keywords.iter().cloned().collect(),
            files: node.file_paths().into_iter().map(str::to_string).collect(),
            hash: node.metadata.hash.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct PassCounts {
    semantic: usize,
    keyword: usize,
    file: usize,
    duplicate: usize,
}

/// Finds semantic, keyword, file-reference and duplicate connections
pub struct ConnectionDiscovery {
    config: AlgorithmConfig,
    vectorizer: Arc<dyn Vectorizer>,
}

impl Default for ConnectionDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionDiscovery {
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
            .with_param("enable_semantic", true)
            .with_param("semantic_threshold", 0.6)
            .with_param("enable_keyword", true)
            .with_param("keyword_overlap_threshold", 0.3)
            .with_param("min_shared_keywords", 2i64)
            .with_param("enable_file_reference", true)
            .with_param("enable_duplicate", true)
            .with_param("duplicate_threshold", 0.95)
    }

    fn semantic(a: &PairFeatures, b: &PairFeatures, params: &DiscoveryParams) -> Option<Connection> {
        let similarity = cosine_similarity(&a.vector, &b.vector);
        (similarity >= params.semantic_threshold).then(|| {
            Connection::new(a.id.clone(), b.id.clone(), ConnectionType::Semantic, similarity, NAME)
                .with_description(format!("Semantic similarity {:.2}", similarity))
        })
    }

    fn keyword(a: &PairFeatures, b: &PairFeatures, params: &DiscoveryParams) -> Option<Connection> {
        let shared: Vec<&String> = a.keywords.intersection(&b.keywords).collect();
        let union = a.keywords.union(&b.keywords).count();
        if union == 0 || shared.len() < params.min_shared_keywords {
            return None;
        }
        let overlap = shared.len() as f64 / union as f64;
        if overlap < params.keyword_overlap_threshold {
            return None;
        }
        let listed: Vec<PropertyValue> = shared.iter().map(|k| PropertyValue::from(k.as_str())).collect();
        Some(
            Connection::new(a.id.clone(), b.id.clone(), ConnectionType::Related, overlap, NAME)
                .with_description(format!("{} shared keywords", shared.len()))
                .with_metadata("pass", "keyword")
                .with_metadata("shared_keywords", PropertyValue::Array(listed)),
        )
    }

    fn file_reference(a: &PairFeatures, b: &PairFeatures) -> Option<Connection> {
        let shared: Vec<&String> = a.files.intersection(&b.files).collect();
        if shared.is_empty() {
            return None;
        }
        let union = a.files.union(&b.files).count();
        let strength = shared.len() as f64 / union as f64;
        let listed: Vec<PropertyValue> = shared.iter().map(|f| PropertyValue::from(f.as_str())).collect();
        Some(
            Connection::new(a.id.clone(), b.id.clone(), ConnectionType::FileReference, strength, NAME)
                .with_description(format!("{} shared file(s)", shared.len()))
                .with_metadata("shared_files", PropertyValue::Array(listed)),
        )
    }

    fn duplicate(
        a: &PairFeatures,
        b: &PairFeatures,
        params: &DiscoveryParams,
    ) -> Option<(Connection, OptimizationSuggestion)> {
        let identical = !a.hash.is_empty() && a.hash == b.hash;
        let similarity = if identical {
            1.0
        } else {
            cosine_similarity(&a.vector, &b.vector)
        };
        if similarity < params.duplicate_threshold {
            return None;
        }
        let connection =
            Connection::new(a.id.clone(), b.id.clone(), ConnectionType::Duplicate, similarity, NAME)
                .with_description(if identical {
                    "Identical query and response".to_string()
                } else {
                    format!("Near-duplicate, similarity {:.2}", similarity)
                });
        let suggestion = OptimizationSuggestion::new(
            SuggestionType::MergeNodes,
            "Merge near-duplicate FAQ entries",
            4,
            similarity,
        )
        .with_node(a.id.clone())
        .with_node(b.id.clone())
        .with_action("keep", a.id.as_str())
        .with_action("merge", b.id.as_str());
        Some((connection, suggestion))
    }
}

#[async_trait]
impl FaqAlgorithm for ConnectionDiscovery {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Finds semantic, keyword, shared-file and duplicate connections between nodes"
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
        if let Err(e) = DiscoveryParams::from_config(&self.config) {
            report.add_error(e.to_string());
        }
        report
    }

    async fn execute(
        &self,
        nodes: &mut [FaqNode],
        ctx: &ExecutionContext,
    ) -> Result<AlgorithmResult, AlgorithmError> {
        let params = DiscoveryParams::from_config(&self.config)?;
        let mut result = AlgorithmResult::new(NAME);
        result.processed_nodes = nodes.len();
        if nodes.len() < 2 {
            result.add_warning("Fewer than two nodes, nothing to connect");
            return Ok(result);
        }

        ensure_features(nodes, self.vectorizer.as_ref(), ctx)?;
        let features: Vec<PairFeatures> = nodes.iter().map(PairFeatures::of).collect();

        let mut counts = PassCounts::default();
        let mut pairs = 0usize;
        for i in 0..features.len() {
            ctx.checkpoint()?;
            for j in (i + 1)..features.len() {
                ctx.checkpoint()?;
                pairs += 1;
                let (a, b) = (&features[i], &features[j]);

                if params.enable_semantic {
                    if let Some(c) = Self::semantic(a, b, &params) {
                        result.add_connection(c);
                        counts.semantic += 1;
                    }
                }
                if params.enable_keyword {
                    if let Some(c) = Self::keyword(a, b, &params) {
                        result.add_connection(c);
                        counts.keyword += 1;
                    }
                }
                if params.enable_file_reference {
                    if let Some(c) = Self::file_reference(a, b) {
                        result.add_connection(c);
                        counts.file += 1;
                    }
                }
                if params.enable_duplicate {
                    if let Some((c, s)) = Self::duplicate(a, b, &params) {
                        result.add_connection(c);
                        result.add_suggestion(s);
                        counts.duplicate += 1;
                    }
                }
            }
            tokio::task::yield_now().await;
        }

        debug!(?counts, "Connection passes finished");
        result.set_metric("pairs_compared", pairs as f64);
        result.set_metric("semantic_connections", counts.semantic as f64);
        result.set_metric("keyword_connections", counts.keyword as f64);
        result.set_metric("file_reference_connections", counts.file as f64);
        result.set_metric("duplicate_connections", counts.duplicate as f64);
        info!(
            nodes = nodes.len(),
            connections = result.connections.len(),
            "Connection discovery complete"
        );
        Ok(result)
    }
}
