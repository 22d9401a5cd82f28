//! Per-node quality and difficulty heuristics
//!
//! All scores land in [0, 1]. Complexity feeds the relationship linker's
//! prerequisite ordering; the quality sub-scores feed the response optimizer.

use crate::graph::{FaqNode, Score};
use crate::text;
use serde::{Deserialize, Serialize};

const COMPLEXITY_LENGTH_CAP: f64 = 1000.0;
const COMPLEXITY_TERM_CAP: f64 = 10.0;
const COMPLEXITY_VARIATION_CAP: f64 = 5.0;
const COMPLEXITY_LENGTH_WEIGHT: f64 = 0.4;
const COMPLEXITY_TERM_WEIGHT: f64 = 0.4;
const COMPLEXITY_VARIATION_WEIGHT: f64 = 0.2;

/// Words per sentence at which a sentence counts as fully complex
const SENTENCE_WORDS_CAP: f64 = 25.0;
/// Commas per sentence at which a sentence counts as fully complex
const SENTENCE_COMMAS_CAP: f64 = 3.0;
const JARGON_CAP: f64 = 10.0;
const AMBIGUITY_CAP: f64 = 5.0;
const SENTENCE_PENALTY_WEIGHT: f64 = 0.3;
const JARGON_PENALTY_WEIGHT: f64 = 0.4;
const AMBIGUITY_PENALTY_WEIGHT: f64 = 0.3;

/// Responses longer than this count as substantive
const SUBSTANTIVE_RESPONSE_CHARS: usize = 50;

const ACCESS_COUNT_CAP: f64 = 100.0;

/// Weights for combining the quality sub-scores.
///
/// Not renormalized: weights that do not sum to 1.0 scale the result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityWeights {
    pub clarity: f64,
    pub completeness: f64,
    pub structure: f64,
    pub relevance: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            clarity: 0.4,
            completeness: 0.3,
            structure: 0.2,
            relevance: 0.1,
        }
    }
}

/// The four quality sub-scores and their weighted combination
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScores {
    pub clarity: Score,
    pub completeness: Score,
    pub structure: Score,
    pub relevance: Score,
    pub overall: Score,
}

impl QualityScores {
    /// Score `node` with the given weights
    pub fn evaluate(node: &FaqNode, weights: &QualityWeights) -> Self {
        let clarity = clarity(node);
        let completeness = completeness(node);
        let structure = structure(node);
        let relevance = relevance(node);
        let overall = clarity * weights.clarity
            + completeness * weights.completeness
            + structure * weights.structure
            + relevance * weights.relevance;
        Self {
            clarity: Score::new(clarity),
            completeness: Score::new(completeness),
            structure: Score::new(structure),
            relevance: Score::new(relevance),
            overall: Score::new(overall),
        }
    }
}

/// Difficulty estimate from length, technical vocabulary and phrasing count
pub fn complexity(node: &FaqNode) -> f64 {
    let text = node.combined_text();
    let length = (text.chars().count() as f64 / COMPLEXITY_LENGTH_CAP).min(1.0);
    let terms = (text::technical_term_count(&text) as f64 / COMPLEXITY_TERM_CAP).min(1.0);
    let variations = (node.variations.len() as f64 / COMPLEXITY_VARIATION_CAP).min(1.0);
    let score = length * COMPLEXITY_LENGTH_WEIGHT
        + terms * COMPLEXITY_TERM_WEIGHT
        + variations * COMPLEXITY_VARIATION_WEIGHT;
    score.clamp(0.0, 1.0)
}

/// Compute and store complexity on every node
pub fn assign_complexity(nodes: &mut [FaqNode]) {
    for node in nodes.iter_mut() {
        node.algorithm_props.complexity = Score::new(complexity(node));
    }
}

/// Readability of the response; empty responses score 0
pub fn clarity(node: &FaqNode) -> f64 {
    let response = node.response.trim();
    if response.is_empty() {
        return 0.0;
    }

    let jargon = (text::technical_term_count(response) as f64 / JARGON_CAP).min(1.0);
    let ambiguity = (text::ambiguity_count(response) as f64 / AMBIGUITY_CAP).min(1.0);

    let score = 1.0
        - sentence_complexity(response) * SENTENCE_PENALTY_WEIGHT
        - jargon * JARGON_PENALTY_WEIGHT
        - ambiguity * AMBIGUITY_PENALTY_WEIGHT;
    score.clamp(0.0, 1.0)
}

/// 0 for short plain sentences, 1 for long comma-heavy ones
fn sentence_complexity(text: &str) -> f64 {
    let sentences = text::sentences(text);
    if sentences.is_empty() {
        return 0.0;
    }
    let count = sentences.len() as f64;
    let words: usize = sentences.iter().map(|s| s.split_whitespace().count()).sum();
    let commas = text.matches(',').count();

    let words_factor = (words as f64 / count / SENTENCE_WORDS_CAP).min(1.0);
    let commas_factor = (commas as f64 / count / SENTENCE_COMMAS_CAP).min(1.0);
    (words_factor * 0.7 + commas_factor * 0.3).min(1.0)
}

/// How much of what a good answer carries is present
pub fn completeness(node: &FaqNode) -> f64 {
    let response = node.response.trim();
    let mut score: f64 = 0.0;
    if !response.is_empty() {
        score += 0.3;
    }
    if !node.resources.is_empty() {
        score += 0.2;
    }
    if !node.variations.is_empty() {
        score += 0.1;
    }
    if response.chars().count() > SUBSTANTIVE_RESPONSE_CHARS {
        score += 0.2;
    }
    let signals = StructureSignals::detect(response);
    if signals.bullets || signals.numbered || signals.heading {
        score += 0.2;
    }
    score.min(1.0)
}

/// Layout quality of the response
pub fn structure(node: &FaqNode) -> f64 {
    let signals = StructureSignals::detect(&node.response);
    let mut score = (signals.paragraphs as f64 * 0.1).min(0.3);
    if signals.bullets {
        score += 0.2;
    }
    if signals.heading {
        score += 0.2;
    }
    if signals.numbered {
        score += 0.15;
    }
    if !node.resources.is_empty() {
        score += 0.15;
    }
    score.min(1.0)
}

/// Usage-based relevance
pub fn relevance(node: &FaqNode) -> f64 {
    let score = popularity(node.metadata.access_count) * 0.7 + node.metadata.usefulness.get() * 0.3;
    score.clamp(0.0, 1.0)
}

/// Access count normalized against the cap
pub fn popularity(access_count: u64) -> f64 {
    (access_count as f64 / ACCESS_COUNT_CAP).min(1.0)
}

/// Layout features found in a response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StructureSignals {
    pub paragraphs: usize,
    pub bullets: bool,
    pub heading: bool,
    pub numbered: bool,
}

impl StructureSignals {
    pub fn detect(text: &str) -> Self {
        let paragraphs = text
            .split("\n\n")
            .filter(|p| !p.trim().is_empty())
            .count();
        let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

        Self {
            paragraphs,
            bullets: lines.iter().any(|l| is_bullet(l)),
            heading: lines.iter().any(|l| is_heading(l)),
            numbered: lines.iter().any(|l| is_numbered(l)),
        }
    }

    /// Whether any layout signal beyond a single paragraph is present
    pub fn any(&self) -> bool {
        self.paragraphs > 1 || self.bullets || self.heading || self.numbered
    }
}

fn is_bullet(line: &str) -> bool {
    ["- ", "* ", "• ", "– "].iter().any(|m| line.starts_with(m))
}

fn is_heading(line: &str) -> bool {
    if line.starts_with('#') {
        return true;
    }
    let short = line.chars().count() <= 60;
    let has_letters = line.chars().any(char::is_alphabetic);
    let shouting = has_letters && line.chars().filter(|c| c.is_alphabetic()).all(char::is_uppercase);
    short && (line.ends_with(':') || (shouting && line.chars().count() >= 3))
}

fn is_numbered(line: &str) -> bool {
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return false;
    }
    let rest = &line[digits..];
    (rest.starts_with(". ") || rest.starts_with(") ")) && rest.len() > 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Resource;

    #[test]
    fn complexity_grows_with_length_terms_and_variations() {
        let simple = FaqNode::new("Hi?", "Yes.");
        let rich = FaqNode::new(
            "How do I configure the proxy server and database login?",
            "Open the config, set the proxy port, restart the server and check the database password.",
        )
        .with_variation("Proxy setup")
        .with_variation("Database login");
        assert!(complexity(&rich) > complexity(&simple));
    }

    #[test]
    fn complexity_is_bounded() {
        let long = "server ".repeat(500);
        let mut node = FaqNode::new(long.clone(), long);
        for i in 0..10 {
            node = node.with_variation(format!("v{}", i));
        }
        assert!((complexity(&node) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_response_has_zero_clarity() {
        assert_eq!(clarity(&FaqNode::new("q", "   ")), 0.0);
    }

    #[test]
    fn short_plain_answer_is_clear() {
        let node = FaqNode::new("q", "Press the red button.");
        assert!(clarity(&node) > 0.85);
    }

    #[test]
    fn hedging_lowers_clarity() {
        let plain = FaqNode::new("q", "Press the red button.");
        let hedged = FaqNode::new("q", "Maybe press the red button, perhaps twice, it depends.");
        assert!(clarity(&hedged) < clarity(&plain));
    }

    #[test]
    fn completeness_adds_components() {
        assert_eq!(completeness(&FaqNode::new("q", "")), 0.0);
        assert!((completeness(&FaqNode::new("q", "short")) - 0.3).abs() < 1e-9);

        let full = FaqNode::new(
            "q",
            "Steps to follow:\n- open the settings page\n- choose the network tab and save",
        )
        .with_variation("v")
        .with_resource(Resource::file("Guide", "guide.pdf"));
        assert!((completeness(&full) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn structure_counts_signals() {
        let plain = FaqNode::new("q", "One line answer.");
        assert!((structure(&plain) - 0.1).abs() < 1e-9);

        let laid_out = FaqNode::new(
            "q",
            "## Setup\n\n1. Download\n2. Install\n\n- note one\n- note two",
        );
        let score = structure(&laid_out);
        // three paragraphs, bullets, heading, numbered list
        assert!((score - 0.85).abs() < 1e-9);
    }

    #[test]
    fn relevance_mixes_usage_and_usefulness() {
        let node = FaqNode::new("q", "r").with_usage(50, 1.0);
        assert!((relevance(&node) - (0.35 + 0.3)).abs() < 1e-9);
        let heavy = FaqNode::new("q", "r").with_usage(10_000, 0.0);
        assert!((relevance(&heavy) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn overall_uses_weights_without_renormalizing() {
        let node = FaqNode::new("q", "Press the red button.").with_usage(100, 1.0);
        let half = QualityWeights {
            clarity: 0.0,
            completeness: 0.0,
            structure: 0.0,
            relevance: 0.5,
        };
        let scores = QualityScores::evaluate(&node, &half);
        assert!((scores.overall.get() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn signals_detect_headings() {
        assert!(StructureSignals::detect("Requirements:\nnone").heading);
        assert!(StructureSignals::detect("# Title").heading);
        assert!(!StructureSignals::detect("just text").heading);
        assert!(StructureSignals::detect("1) first\n2) second").numbered);
    }
}
