//! Response quality scoring and automatic rewriting
//!
//! Every node is scored. Nodes whose overall score falls below
//! `min_confidence_for_auto_optimize` get their response rewritten, one fix
//! per weak sub-score. Final scores are stored in the node's extended
//! properties under `quality.*`, and deficiencies that remain produce
//! suggestions.

use super::{check_input, ensure_features};
use crate::analysis::traits::{ExecutionContext, FaqAlgorithm};
use crate::analysis::types::{
    AlgorithmConfig, AlgorithmError, AlgorithmResult, OptimizationSuggestion, SuggestionType,
    ValidationReport,
};
use crate::graph::{FaqNode, PropertyValue};
use crate::scoring::{QualityScores, QualityWeights, StructureSignals};
use crate::text::{HashedBagOfWords, Vectorizer};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

const NAME: &str = "response_quality";

/// Sub-scores below this get an automatic fix
const FIX_BOUND: f64 = 0.5;

/// Sentences longer than this are split at their commas
const LONG_SENTENCE_WORDS: usize = 25;

const VARIATIONS_PREFIX: &str = "Also asked as:";
const RESOURCES_HEADER: &str = "Related resources:";

#[derive(Debug, Clone, PartialEq)]
struct QualityParams {
    min_confidence_for_auto_optimize: f64,
    enable_auto_optimize: bool,
    max_suggestions_per_node: usize,
    suggestion_threshold: f64,
    high_priority_threshold: f64,
    weights: QualityWeights,
}

impl QualityParams {
    fn from_config(config: &AlgorithmConfig) -> Result<Self, AlgorithmError> {
        Ok(Self {
            min_confidence_for_auto_optimize: config.float("min_confidence_for_auto_optimize")?,
            enable_auto_optimize: config.bool("enable_auto_optimize")?,
            max_suggestions_per_node: config.usize("max_suggestions_per_node")?,
            suggestion_threshold: config.float("suggestion_threshold")?,
            high_priority_threshold: config.float("high_priority_threshold")?,
            weights: QualityWeights {
                clarity: config.float("clarity_weight")?,
                completeness: config.float("completeness_weight")?,
                structure: config.float("structure_weight")?,
                relevance: config.float("relevance_weight")?,
            },
        })
    }
}

/// Scores responses, rewrites weak ones and suggests improvements
pub struct ResponseQualityOptimizer {
    config: AlgorithmConfig,
    vectorizer: Arc<dyn Vectorizer>,
}

impl Default for ResponseQualityOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseQualityOptimizer {
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
        let weights = QualityWeights::default();
        AlgorithmConfig::new()
            .with_param("min_confidence_for_auto_optimize", 0.6)
            .with_param("enable_auto_optimize", true)
            .with_param("max_suggestions_per_node", 3i64)
            .with_param("suggestion_threshold", 0.6)
            .with_param("high_priority_threshold", 0.4)
            .with_param("clarity_weight", weights.clarity)
            .with_param("completeness_weight", weights.completeness)
            .with_param("structure_weight", weights.structure)
            .with_param("relevance_weight", weights.relevance)
    }

    /// Rewrite the response of a low-scoring node; returns the fixes applied
    fn rewrite(node: &FaqNode, scores: &QualityScores) -> (String, Vec<&'static str>) {
        let mut response = node.response.clone();
        let mut applied = Vec::new();

        if scores.clarity.get() < FIX_BOUND {
            let clearer = improve_clarity(&response);
            if clearer != response {
                response = clearer;
                applied.push("clarity");
            }
        }
        if scores.completeness.get() < FIX_BOUND {
            let fuller = improve_completeness(node, &response);
            if fuller != response {
                response = fuller;
                applied.push("completeness");
            }
        }
        let unstructured = !StructureSignals::detect(&node.response).any();
        if scores.structure.get() < FIX_BOUND && unstructured && !response.trim().is_empty() {
            response = format!("## {}\n\n{}", node.query.trim(), response);
            applied.push("structure");
        }
        (response, applied)
    }

    fn suggestions(node: &FaqNode, scores: &QualityScores, params: &QualityParams) -> Vec<OptimizationSuggestion> {
        let mut weak: Vec<(f64, SuggestionType, &str)> = [
            (scores.clarity.get(), SuggestionType::ImproveResponse, "Simplify the answer: shorter sentences, less jargon, fewer hedges"),
            (scores.completeness.get(), SuggestionType::AddResources, "Add detail, alternate phrasings or attached resources"),
            (scores.structure.get(), SuggestionType::Restructure, "Break the answer into paragraphs, steps or a list"),
        ]
        .into_iter()
        .filter(|(score, _, _)| *score < params.suggestion_threshold)
        .collect();
        weak.sort_by(|a, b| a.0.total_cmp(&b.0));

        weak.into_iter()
            .take(params.max_suggestions_per_node)
            .map(|(score, kind, advice)| {
                let priority = if score < params.high_priority_threshold { 4 } else { 3 };
                OptimizationSuggestion::new(kind, format!("'{}': {}", node.query, advice), priority, 1.0 - score)
                    .with_node(node.id().clone())
                    .with_action("current_score", score)
            })
            .collect()
    }
}

fn store_scores(node: &mut FaqNode, scores: &QualityScores, fixes: &[&str]) {
    let properties = &mut node.metadata.properties;
    properties.insert("quality.clarity".into(), scores.clarity.get().into());
    properties.insert("quality.completeness".into(), scores.completeness.get().into());
    properties.insert("quality.structure".into(), scores.structure.get().into());
    properties.insert("quality.relevance".into(), scores.relevance.get().into());
    properties.insert("quality.overall".into(), scores.overall.get().into());
    properties.insert("quality.optimized".into(), (!fixes.is_empty()).into());
    if !fixes.is_empty() {
        let listed = fixes.iter().map(|f| PropertyValue::from(*f)).collect();
        properties.insert("quality.fixes".into(), PropertyValue::Array(listed));
    }
}

/// Drop parenthetical asides and split overlong sentences at their commas
fn improve_clarity(response: &str) -> String {
    strip_parentheticals(response)
        .lines()
        .map(shorten_sentences)
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_parentheticals(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    // unbalanced: leave the text alone
    if depth > 0 {
        return text.to_string();
    }
    out.lines()
        .map(|line| {
            line.split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .replace(" .", ".")
                .replace(" ,", ",")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn shorten_sentences(line: &str) -> String {
    line.split(". ")
        .map(|sentence| {
            if sentence.split_whitespace().count() <= LONG_SENTENCE_WORDS || !sentence.contains(", ") {
                return sentence.to_string();
            }
            sentence
                .split(", ")
                .map(capitalize)
                .collect::<Vec<_>>()
                .join(". ")
        })
        .collect::<Vec<_>>()
        .join(". ")
}

fn capitalize(clause: &str) -> String {
    let mut chars = clause.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Prepend the alternate phrasings and append the attached resources
fn improve_completeness(node: &FaqNode, response: &str) -> String {
    let mut out = response.to_string();

    if !node.variations.is_empty() && !out.starts_with(VARIATIONS_PREFIX) {
        let variations: Vec<&str> = node
            .variations
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .collect();
        if !variations.is_empty() {
            let prefix = format!("{} {}", VARIATIONS_PREFIX, variations.join("; "));
            out = if out.trim().is_empty() {
                prefix
            } else {
                format!("{}\n\n{}", prefix, out)
            };
        }
    }

    if !node.resources.is_empty() && !out.contains(RESOURCES_HEADER) {
        let lines: Vec<String> = node
            .resources
            .iter()
            .map(|r| {
                let location = r
                    .link
                    .clone()
                    .or_else(|| r.file_paths.first().cloned())
                    .unwrap_or_default();
                if location.is_empty() {
                    format!("- {}", r.title)
                } else {
                    format!("- {} ({})", r.title, location)
                }
            })
            .collect();
        out = format!("{}\n\n{}\n{}", out.trim_end(), RESOURCES_HEADER, lines.join("\n"));
    }
    out
}

#[async_trait]
impl FaqAlgorithm for ResponseQualityOptimizer {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Scores response quality, rewrites weak answers and suggests improvements"
    }

    fn configuration(&self) -> &AlgorithmConfig {
        &self.config
    }

    fn update_configuration(&mut self, overrides: &AlgorithmConfig) {
        self.config = self.config.merged(overrides);
    }

    fn validate(&self, nodes: &[FaqNode]) -> ValidationReport {
        let mut report = ValidationReport::new();
        check_input(nodes, 1, &mut report);
        match QualityParams::from_config(&self.config) {
            Ok(p) => {
                let w = p.weights;
                let sum = w.clarity + w.completeness + w.structure + w.relevance;
                if (sum - 1.0).abs() > 1e-6 {
                    report.add_warning(format!("Quality weights sum to {:.2}, scores are not renormalized", sum));
                }
            }
            Err(e) => report.add_error(e.to_string()),
        }
        report
    }

    async fn execute(
        &self,
        nodes: &mut [FaqNode],
        ctx: &ExecutionContext,
    ) -> Result<AlgorithmResult, AlgorithmError> {
        let params = QualityParams::from_config(&self.config)?;
        let mut result = AlgorithmResult::new(NAME);
        result.processed_nodes = nodes.len();
        if nodes.is_empty() {
            return Ok(result);
        }

        ensure_features(nodes, self.vectorizer.as_ref(), ctx)?;

        let mut optimized = 0usize;
        let mut below_gate = 0usize;
        let mut total_quality = 0.0;
        for node in nodes.iter_mut() {
            ctx.checkpoint()?;
            let mut scores = QualityScores::evaluate(node, &params.weights);
            let mut fixes = Vec::new();

            if scores.overall.get() < params.min_confidence_for_auto_optimize {
                below_gate += 1;
                if params.enable_auto_optimize {
                    let (response, applied) = Self::rewrite(node, &scores);
                    if response != node.response {
                        debug!(node = %node.id(), fixes = ?applied, "Rewrote response");
                        node.set_response(response);
                        node.refresh_features(self.vectorizer.as_ref())?;
                        scores = QualityScores::evaluate(node, &params.weights);
                        fixes = applied;
                        optimized += 1;
                    }
                }
            }

            store_scores(node, &scores, &fixes);
            total_quality += scores.overall.get();
            for suggestion in Self::suggestions(node, &scores, &params) {
                result.add_suggestion(suggestion);
            }
            tokio::task::yield_now().await;
        }

        result.set_metric("average_quality", total_quality / nodes.len() as f64);
        result.set_metric("low_quality_nodes", below_gate as f64);
        result.set_metric("nodes_optimized", optimized as f64);
        info!(
            nodes = nodes.len(),
            optimized,
            suggestions = result.suggestions.len(),
            "Response quality pass complete"
        );
        Ok(result)
    }
}
