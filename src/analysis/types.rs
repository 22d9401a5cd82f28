//! Core types for the FAQ analysis pipeline

use crate::graph::{Connection, FaqGroup, NodeId, PropertyValue, Score};
use crate::text::EmbeddingError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Per-algorithm configuration: an enabled flag plus named parameters
///
/// An unset flag means enabled, and leaves the current flag alone when the
/// configuration is merged as overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub parameters: BTreeMap<String, PropertyValue>,
}

impl Default for AlgorithmConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AlgorithmConfig {
    /// Flag unset, no parameters
    pub fn new() -> Self {
        Self {
            enabled: None,
            parameters: BTreeMap::new(),
        }
    }

    /// Disabled, no parameters
    pub fn disabled() -> Self {
        Self::new().with_enabled(false)
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.parameters.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.parameters.get(key)
    }

    /// Overlay `overrides` on this configuration.
    ///
    /// The enabled flag comes from `overrides` only when it is set there;
    /// parameters present there replace ours, the rest keep their current
    /// values.
    pub fn merged(&self, overrides: &AlgorithmConfig) -> AlgorithmConfig {
        let mut parameters = self.parameters.clone();
        for (key, value) in &overrides.parameters {
            parameters.insert(key.clone(), value.clone());
        }
        AlgorithmConfig {
            enabled: overrides.enabled.or(self.enabled),
            parameters,
        }
    }

    /// Numeric parameter; integers are accepted
    pub fn float(&self, key: &str) -> Result<f64, AlgorithmError> {
        let value = self.require(key)?;
        value
            .as_f64()
            .ok_or_else(|| AlgorithmError::config(key, format!("expected a number, found {}", value.kind())))
    }

    /// Non-negative integer parameter
    pub fn usize(&self, key: &str) -> Result<usize, AlgorithmError> {
        match self.require(key)? {
            PropertyValue::Int(i) if *i >= 0 => Ok(*i as usize),
            PropertyValue::Int(i) => Err(AlgorithmError::config(key, format!("must not be negative, got {}", i))),
            other => Err(AlgorithmError::config(key, format!("expected an integer, found {}", other.kind()))),
        }
    }

    pub fn bool(&self, key: &str) -> Result<bool, AlgorithmError> {
        let value = self.require(key)?;
        value
            .as_bool()
            .ok_or_else(|| AlgorithmError::config(key, format!("expected a bool, found {}", value.kind())))
    }

    fn require(&self, key: &str) -> Result<&PropertyValue, AlgorithmError> {
        self.parameters
            .get(key)
            .ok_or_else(|| AlgorithmError::config(key, "missing required parameter"))
    }
}

/// Outcome of validating input and configuration before a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// True when there are no errors; warnings do not count
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// How an algorithm run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    Failed,
    /// Stopped by the cancellation token, not by an error
    Cancelled,
}

/// Kind of improvement an algorithm proposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SuggestionType {
    ImproveResponse,
    RephraseQuestion,
    AddResources,
    CreateConnection,
    RemoveDuplicate,
    Restructure,
    MergeNodes,
}

/// A proposed change, produced per run and not persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationSuggestion {
    pub suggestion_type: SuggestionType,
    pub description: String,
    /// 1 (low) to 5 (urgent)
    pub priority: u8,
    pub confidence: Score,
    pub affected_nodes: Vec<NodeId>,
    #[serde(default)]
    pub suggested_action: BTreeMap<String, PropertyValue>,
    pub created_at: DateTime<Utc>,
}

impl OptimizationSuggestion {
    /// Create a suggestion; priority is clamped to 1..=5
    pub fn new(
        suggestion_type: SuggestionType,
        description: impl Into<String>,
        priority: u8,
        confidence: f64,
    ) -> Self {
        Self {
            suggestion_type,
            description: description.into(),
            priority: priority.clamp(1, 5),
            confidence: Score::new(confidence),
            affected_nodes: Vec::new(),
            suggested_action: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_node(mut self, node: NodeId) -> Self {
        self.affected_nodes.push(node);
        self
    }

    pub fn with_action(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.suggested_action.insert(key.into(), value.into());
        self
    }
}

/// Output of one algorithm run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmResult {
    pub algorithm: String,
    pub status: RunStatus,
    /// Number of nodes the algorithm looked at (mutations happen in place)
    pub processed_nodes: usize,
    pub connections: Vec<Connection>,
    pub groups: Vec<FaqGroup>,
    pub suggestions: Vec<OptimizationSuggestion>,
    pub metrics: BTreeMap<String, f64>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub elapsed: Duration,
}

impl AlgorithmResult {
    /// An empty successful result
    pub fn new(algorithm: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            status: RunStatus::Succeeded,
            processed_nodes: 0,
            connections: Vec::new(),
            groups: Vec::new(),
            suggestions: Vec::new(),
            metrics: BTreeMap::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// A failed result carrying the error message
    pub fn failed(algorithm: impl Into<String>, error: impl Into<String>) -> Self {
        let mut result = Self::new(algorithm);
        result.status = RunStatus::Failed;
        result.errors.push(error.into());
        result
    }

    /// A cancelled result
    pub fn cancelled(algorithm: impl Into<String>) -> Self {
        let mut result = Self::new(algorithm);
        result.status = RunStatus::Cancelled;
        result
    }

    pub fn is_successful(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    pub fn add_connection(&mut self, connection: Connection) {
        self.connections.push(connection);
    }

    pub fn add_suggestion(&mut self, suggestion: OptimizationSuggestion) {
        self.suggestions.push(suggestion);
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn set_metric(&mut self, key: impl Into<String>, value: f64) {
        self.metrics.insert(key.into(), value);
    }
}

/// Merged output of an orchestrated run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Sub-results in execution order, including failed and cancelled ones
    pub results: Vec<AlgorithmResult>,
    /// Connections from successful stages, in stage order
    pub connections: Vec<Connection>,
    pub groups: Vec<FaqGroup>,
    pub suggestions: Vec<OptimizationSuggestion>,
    /// Metrics from successful stages, summed on key collision
    pub metrics: BTreeMap<String, f64>,
    /// True only when every stage that ran succeeded
    pub overall_success: bool,
    /// True when a stage was stopped by the cancellation token
    pub cancelled: bool,
    /// Sum of stage durations
    pub total_elapsed: Duration,
    /// Duration of the slowest stage
    pub longest_stage: Duration,
}

impl ExecutionReport {
    /// Aggregate stage results
    pub fn from_results(results: Vec<AlgorithmResult>) -> Self {
        let mut connections = Vec::new();
        let mut groups = Vec::new();
        let mut suggestions = Vec::new();
        let mut metrics: BTreeMap<String, f64> = BTreeMap::new();

        for result in results.iter().filter(|r| r.is_successful()) {
            connections.extend(result.connections.iter().cloned());
            groups.extend(result.groups.iter().cloned());
            suggestions.extend(result.suggestions.iter().cloned());
            for (key, value) in &result.metrics {
                *metrics.entry(key.clone()).or_insert(0.0) += value;
            }
        }

        let overall_success = results.iter().all(|r| r.is_successful());
        let cancelled = results.iter().any(|r| r.status == RunStatus::Cancelled);
        let total_elapsed = results.iter().map(|r| r.elapsed).sum();
        let longest_stage = results.iter().map(|r| r.elapsed).max().unwrap_or_default();

        Self {
            results,
            connections,
            groups,
            suggestions,
            metrics,
            overall_success,
            cancelled,
            total_elapsed,
            longest_stage,
        }
    }

    /// Sub-result for a named algorithm
    pub fn result_for(&self, algorithm: &str) -> Option<&AlgorithmResult> {
        self.results.iter().find(|r| r.algorithm == algorithm)
    }
}

/// Error types for the analysis pipeline
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AlgorithmError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Configuration error for '{key}': {reason}")]
    Config { key: String, reason: String },

    #[error("Cancelled")]
    Cancelled,

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("Algorithm disabled: {0}")]
    Disabled(String),
}

impl AlgorithmError {
    pub fn config(key: &str, reason: impl Into<String>) -> Self {
        AlgorithmError::Config {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ConnectionType;

    fn connection() -> Connection {
        Connection::new(
            NodeId::from_string("a"),
            NodeId::from_string("b"),
            ConnectionType::Related,
            0.5,
            "test",
        )
    }

    #[test]
    fn typed_parameter_access() {
        let config = AlgorithmConfig::new()
            .with_param("threshold", 0.5)
            .with_param("limit", 8i64)
            .with_param("flag", true);
        assert_eq!(config.float("threshold").unwrap(), 0.5);
        assert_eq!(config.float("limit").unwrap(), 8.0);
        assert_eq!(config.usize("limit").unwrap(), 8);
        assert!(config.bool("flag").unwrap());
    }

    #[test]
    fn missing_and_mistyped_parameters_are_config_errors() {
        let config = AlgorithmConfig::new().with_param("limit", "eight").with_param("neg", -1i64);
        assert!(matches!(config.float("absent"), Err(AlgorithmError::Config { .. })));
        assert!(matches!(config.usize("limit"), Err(AlgorithmError::Config { .. })));
        assert!(matches!(config.usize("neg"), Err(AlgorithmError::Config { .. })));
        assert!(matches!(config.bool("limit"), Err(AlgorithmError::Config { .. })));
    }

    #[test]
    fn merge_overlays_parameters() {
        let base = AlgorithmConfig::new().with_param("a", 1.0).with_param("b", 2.0);
        let overrides = AlgorithmConfig::disabled().with_param("b", 5.0);
        let merged = base.merged(&overrides);
        assert!(!merged.is_enabled());
        assert_eq!(merged.float("a").unwrap(), 1.0);
        assert_eq!(merged.float("b").unwrap(), 5.0);
    }

    #[test]
    fn parameter_only_overrides_keep_the_enabled_flag() {
        let base = AlgorithmConfig::disabled().with_param("a", 1.0);
        let merged = base.merged(&AlgorithmConfig::new().with_param("a", 2.0));
        assert!(!merged.is_enabled());
        assert_eq!(merged.float("a").unwrap(), 2.0);

        let enabled = merged.merged(&AlgorithmConfig::new().with_enabled(true));
        assert!(enabled.is_enabled());
        assert_eq!(enabled.float("a").unwrap(), 2.0);
    }

    #[test]
    fn suggestion_priority_is_clamped() {
        assert_eq!(OptimizationSuggestion::new(SuggestionType::Restructure, "x", 0, 0.5).priority, 1);
        assert_eq!(OptimizationSuggestion::new(SuggestionType::Restructure, "x", 9, 0.5).priority, 5);
    }

    #[test]
    fn report_aggregates_successful_results_only() {
        let mut first = AlgorithmResult::new("first");
        first.add_connection(connection());
        first.set_metric("pairs", 2.0);
        first.elapsed = Duration::from_millis(30);

        let mut broken = AlgorithmResult::failed("broken", "boom");
        broken.add_connection(connection());
        broken.elapsed = Duration::from_millis(5);

        let mut third = AlgorithmResult::new("third");
        third.add_connection(connection());
        third.set_metric("pairs", 3.0);
        third.elapsed = Duration::from_millis(10);

        let report = ExecutionReport::from_results(vec![first, broken, third]);

        assert_eq!(report.connections.len(), 2);
        assert_eq!(report.metrics.get("pairs"), Some(&5.0));
        assert!(!report.overall_success);
        assert!(!report.cancelled);
        assert_eq!(report.total_elapsed, Duration::from_millis(45));
        assert_eq!(report.longest_stage, Duration::from_millis(30));
        assert_eq!(report.result_for("broken").unwrap().errors, vec!["boom"]);
    }

    #[test]
    fn empty_report_is_successful() {
        let report = ExecutionReport::from_results(Vec::new());
        assert!(report.overall_success);
        assert!(report.connections.is_empty());
    }
}
