//! Sequential pipeline runner
//!
//! Stages run one after another over the same node slice, because later
//! stages read what earlier ones wrote (vectors, complexity, group fields).
//! A failing stage becomes a failed sub-result and the pipeline moves on; a
//! cancelled stage stops the pipeline.

use super::algorithms::{
    ConnectionDiscovery, RelationshipLinker, ResponseQualityOptimizer, SemanticClusterer,
};
use super::progress::percent;
use super::traits::{AlgorithmRegistry, ExecutionContext, FaqAlgorithm};
use super::types::{
    AlgorithmConfig, AlgorithmError, AlgorithmResult, ExecutionReport, RunStatus, ValidationReport,
};
use crate::graph::FaqNode;
use crate::text::{HashedBagOfWords, Vectorizer};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Runs registered algorithms in registration order
pub struct AlgorithmOrchestrator {
    registry: AlgorithmRegistry,
}

impl Default for AlgorithmOrchestrator {
    fn default() -> Self {
        Self::with_default_algorithms()
    }
}

impl AlgorithmOrchestrator {
    /// Create an orchestrator with no algorithms
    pub fn new() -> Self {
        Self {
            registry: AlgorithmRegistry::new(),
        }
    }

    /// The standard four-stage pipeline on hashed bag-of-words vectors
    pub fn with_default_algorithms() -> Self {
        Self::with_vectorizer(Arc::new(HashedBagOfWords))
    }

    /// The standard four-stage pipeline on the given vectorizer
    pub fn with_vectorizer(vectorizer: Arc<dyn Vectorizer>) -> Self {
        let mut orchestrator = Self::new();
        orchestrator.register(ConnectionDiscovery::new().with_vectorizer(vectorizer.clone()));
        orchestrator.register(SemanticClusterer::new().with_vectorizer(vectorizer.clone()));
        orchestrator.register(RelationshipLinker::new().with_vectorizer(vectorizer.clone()));
        orchestrator.register(ResponseQualityOptimizer::new().with_vectorizer(vectorizer));
        orchestrator
    }

    /// Append an algorithm to the pipeline
    pub fn register<A: FaqAlgorithm + 'static>(&mut self, algorithm: A) {
        self.registry.register(algorithm);
    }

    /// Get the algorithm registry
    pub fn registry(&self) -> &AlgorithmRegistry {
        &self.registry
    }

    pub fn algorithm_names(&self) -> Vec<&str> {
        self.registry.names()
    }

    pub fn configuration(&self, name: &str) -> Option<&AlgorithmConfig> {
        self.registry.get(name).map(|a| a.configuration())
    }

    /// Merge `overrides` onto the named algorithm's configuration
    pub fn configure(&mut self, name: &str, overrides: &AlgorithmConfig) -> Result<(), AlgorithmError> {
        let algorithm = self
            .registry
            .get_mut(name)
            .ok_or_else(|| AlgorithmError::UnknownAlgorithm(name.to_string()))?;
        algorithm.update_configuration(overrides);
        Ok(())
    }

    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<(), AlgorithmError> {
        self.configure(name, &AlgorithmConfig::new().with_enabled(enabled))
    }

    /// Validation reports for every enabled algorithm, in pipeline order
    pub fn validate(&self, nodes: &[FaqNode]) -> Vec<(String, ValidationReport)> {
        self.registry
            .enabled()
            .into_iter()
            .map(|a| (a.name().to_string(), a.validate(nodes)))
            .collect()
    }

    /// Run every enabled algorithm over `nodes`.
    ///
    /// Never fails: stage errors are folded into the report.
    pub async fn run_all(&self, nodes: &mut [FaqNode], ctx: &ExecutionContext) -> ExecutionReport {
        let stages = self.registry.enabled();
        let total = stages.len();
        info!(stages = total, nodes = nodes.len(), "Starting analysis pipeline");

        let mut results = Vec::with_capacity(total);
        for (done, algorithm) in stages.iter().enumerate() {
            ctx.report(
                percent(done, total),
                format!("Running {}", algorithm.name()),
                done,
                total,
            );
            let result = Self::run_stage(*algorithm, nodes, ctx).await;
            let stop = result.status == RunStatus::Cancelled;
            results.push(result);
            if stop {
                warn!(stage = algorithm.name(), "Pipeline cancelled");
                break;
            }
        }

        let report = ExecutionReport::from_results(results);
        ctx.report(100, "Analysis complete", total, total);
        info!(
            success = report.overall_success,
            cancelled = report.cancelled,
            connections = report.connections.len(),
            groups = report.groups.len(),
            suggestions = report.suggestions.len(),
            elapsed_ms = report.total_elapsed.as_millis() as u64,
            "Analysis pipeline finished"
        );
        report
    }

    /// Run a single named algorithm
    pub async fn run_one(
        &self,
        name: &str,
        nodes: &mut [FaqNode],
        ctx: &ExecutionContext,
    ) -> Result<AlgorithmResult, AlgorithmError> {
        let algorithm = self
            .registry
            .get(name)
            .ok_or_else(|| AlgorithmError::UnknownAlgorithm(name.to_string()))?;
        if !algorithm.is_enabled() {
            return Err(AlgorithmError::Disabled(name.to_string()));
        }
        ctx.report(0, format!("Running {}", name), 0, 1);
        let result = Self::run_stage(algorithm, nodes, ctx).await;
        ctx.report(100, format!("{} complete", name), 1, 1);
        Ok(result)
    }

    /// Execute one stage, converting errors and panics into a sub-result.
    ///
    /// Validation errors are appended to a failed stage's errors unless the
    /// stage already reported the same message. A stage that succeeds despite
    /// validation errors carries them as warnings.
    async fn run_stage(
        algorithm: &dyn FaqAlgorithm,
        nodes: &mut [FaqNode],
        ctx: &ExecutionContext,
    ) -> AlgorithmResult {
        let name = algorithm.name();
        let validation = algorithm.validate(nodes);
        let started = Instant::now();

        let outcome = AssertUnwindSafe(algorithm.execute(nodes, ctx))
            .catch_unwind()
            .await;
        let mut result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(AlgorithmError::Cancelled)) => {
                warn!(stage = name, "Stage cancelled");
                AlgorithmResult::cancelled(name)
            }
            Ok(Err(e)) => {
                warn!(stage = name, error = %e, "Stage failed");
                AlgorithmResult::failed(name, e.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(stage = name, panic = %message, "Stage panicked");
                AlgorithmResult::failed(name, format!("panicked: {}", message))
            }
        };
        result.elapsed = started.elapsed();

        if result.status == RunStatus::Failed {
            for e in validation.errors {
                if !result.errors.contains(&e) {
                    result.errors.push(e);
                }
            }
        } else if result.status == RunStatus::Succeeded {
            result.warnings.extend(validation.errors);
        }
        result.warnings.extend(validation.warnings);
        result
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::progress::ProgressEvent;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Clone, Copy, PartialEq)]
    enum Behaviour {
        Succeed,
        Fail,
        Panic,
        RejectInput,
    }

    /// Emits one connection-free result with a metric, or misbehaves
    struct Stub {
        name: &'static str,
        behaviour: Behaviour,
        config: AlgorithmConfig,
    }

    impl Stub {
        fn new(name: &'static str, fail: bool) -> Self {
            let behaviour = if fail { Behaviour::Fail } else { Behaviour::Succeed };
            Self::behaving(name, behaviour)
        }

        fn behaving(name: &'static str, behaviour: Behaviour) -> Self {
            Self {
                name,
                behaviour,
                config: AlgorithmConfig::new(),
            }
        }
    }

    #[async_trait]
    impl FaqAlgorithm for Stub {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "stub"
        }

        fn configuration(&self) -> &AlgorithmConfig {
            &self.config
        }

        fn update_configuration(&mut self, overrides: &AlgorithmConfig) {
            self.config = self.config.merged(overrides);
        }

        fn validate(&self, _nodes: &[FaqNode]) -> ValidationReport {
            let mut report = ValidationReport::new();
            if self.behaviour == Behaviour::RejectInput {
                report.add_error("threshold must be between 0 and 1");
            }
            report
        }

        async fn execute(
            &self,
            _nodes: &mut [FaqNode],
            ctx: &ExecutionContext,
        ) -> Result<AlgorithmResult, AlgorithmError> {
            ctx.checkpoint()?;
            match self.behaviour {
                Behaviour::Fail => {
                    return Err(AlgorithmError::Execution(format!("{} broke", self.name)))
                }
                Behaviour::Panic => panic!("{} divided by zero", self.name),
                Behaviour::RejectInput => {
                    return Err(AlgorithmError::Execution("bad parameters".to_string()))
                }
                Behaviour::Succeed => {}
            }
            let mut result = AlgorithmResult::new(self.name);
            result.set_metric("runs", 1.0);
            Ok(result)
        }
    }

    #[tokio::test]
    async fn progress_is_reported_before_each_stage_and_at_the_end() {
        let mut orchestrator = AlgorithmOrchestrator::new();
        orchestrator.register(Stub::new("a", false));
        orchestrator.register(Stub::new("b", false));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = seen.clone();
        let sink = move |event: ProgressEvent| captured.lock().unwrap().push(event.percentage);
        let ctx = ExecutionContext::new().with_progress(Arc::new(sink));

        let report = orchestrator.run_all(&mut [], &ctx).await;
        assert!(report.overall_success);
        assert_eq!(report.metrics["runs"], 2.0);
        assert_eq!(*seen.lock().unwrap(), vec![0, 50, 100]);
    }

    #[tokio::test]
    async fn disabled_stages_are_skipped() {
        let mut orchestrator = AlgorithmOrchestrator::new();
        orchestrator.register(Stub::new("a", false));
        orchestrator.register(Stub::new("b", true));
        orchestrator.set_enabled("b", false).unwrap();

        let report = orchestrator.run_all(&mut [], &ExecutionContext::new()).await;
        assert!(report.overall_success);
        assert_eq!(report.results.len(), 1);
    }

    #[tokio::test]
    async fn cancellation_stops_the_pipeline() {
        let mut orchestrator = AlgorithmOrchestrator::new();
        orchestrator.register(Stub::new("a", false));
        orchestrator.register(Stub::new("b", false));
        let ctx = ExecutionContext::new();
        ctx.cancel.cancel();

        let report = orchestrator.run_all(&mut [], &ctx).await;
        assert!(report.cancelled);
        assert!(!report.overall_success);
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].status, RunStatus::Cancelled);
    }

    #[tokio::test]
    async fn run_one_distinguishes_unknown_and_disabled() {
        let mut orchestrator = AlgorithmOrchestrator::new();
        orchestrator.register(Stub::new("a", false));
        orchestrator.register(Stub::new("off", false));
        orchestrator.set_enabled("off", false).unwrap();
        let ctx = ExecutionContext::new();

        assert_eq!(
            orchestrator.run_one("nope", &mut [], &ctx).await,
            Err(AlgorithmError::UnknownAlgorithm("nope".into()))
        );
        assert_eq!(
            orchestrator.run_one("off", &mut [], &ctx).await,
            Err(AlgorithmError::Disabled("off".into()))
        );
        let result = orchestrator.run_one("a", &mut [], &ctx).await.unwrap();
        assert!(result.is_successful());
    }

    #[tokio::test]
    async fn failed_stage_carries_its_message() {
        let mut orchestrator = AlgorithmOrchestrator::new();
        orchestrator.register(Stub::new("bad", true));
        let report = orchestrator.run_all(&mut [], &ExecutionContext::new()).await;
        let failed = report.result_for("bad").unwrap();
        assert_eq!(failed.status, RunStatus::Failed);
        assert!(failed.errors[0].contains("bad broke"));
    }

    #[tokio::test]
    async fn panicking_stage_is_recorded_and_the_pipeline_continues() {
        let mut orchestrator = AlgorithmOrchestrator::new();
        orchestrator.register(Stub::new("a", false));
        orchestrator.register(Stub::behaving("boom", Behaviour::Panic));
        orchestrator.register(Stub::new("c", false));

        let report = orchestrator.run_all(&mut [], &ExecutionContext::new()).await;
        assert!(!report.overall_success);
        assert!(!report.cancelled);
        assert_eq!(report.results.len(), 3);
        let panicked = report.result_for("boom").unwrap();
        assert_eq!(panicked.status, RunStatus::Failed);
        assert!(panicked.errors[0].contains("boom divided by zero"));
        assert!(report.result_for("c").unwrap().is_successful());
        assert_eq!(report.metrics["runs"], 2.0);
    }

    #[tokio::test]
    async fn validation_errors_are_attached_to_a_failed_stage() {
        let mut orchestrator = AlgorithmOrchestrator::new();
        orchestrator.register(Stub::behaving("strict", Behaviour::RejectInput));
        let report = orchestrator.run_all(&mut [], &ExecutionContext::new()).await;

        let failed = report.result_for("strict").unwrap();
        assert_eq!(failed.status, RunStatus::Failed);
        assert_eq!(
            failed.errors,
            vec![
                "Execution failed: bad parameters".to_string(),
                "threshold must be between 0 and 1".to_string()
            ]
        );
    }

    #[test]
    fn default_pipeline_order() {
        let orchestrator = AlgorithmOrchestrator::with_default_algorithms();
        assert_eq!(
            orchestrator.algorithm_names(),
            vec![
                "connection_discovery",
                "semantic_clustering",
                "relationship_linking",
                "response_quality"
            ]
        );
    }

    #[test]
    fn parameter_only_configure_keeps_a_disabled_algorithm_off() {
        let mut orchestrator = AlgorithmOrchestrator::with_default_algorithms();
        orchestrator.set_enabled("response_quality", false).unwrap();
        orchestrator
            .configure(
                "response_quality",
                &AlgorithmConfig::new().with_param("clarity_weight", 0.5),
            )
            .unwrap();
        let config = orchestrator.configuration("response_quality").unwrap();
        assert!(!config.is_enabled());
        assert_eq!(config.float("clarity_weight").unwrap(), 0.5);
        assert_eq!(orchestrator.registry().enabled().len(), 3);
    }

    #[test]
    fn configure_unknown_algorithm_fails() {
        let mut orchestrator = AlgorithmOrchestrator::with_default_algorithms();
        assert!(matches!(
            orchestrator.configure("missing", &AlgorithmConfig::new()),
            Err(AlgorithmError::UnknownAlgorithm(_))
        ));
        orchestrator
            .configure(
                "semantic_clustering",
                &AlgorithmConfig::new().with_param("min_group_size", 3i64),
            )
            .unwrap();
        let config = orchestrator.configuration("semantic_clustering").unwrap();
        assert_eq!(config.usize("min_group_size").unwrap(), 3);
        assert_eq!(config.usize("max_group_size").unwrap(), 10);
    }
}
