//! FAQ analysis pipeline
//!
//! Four heuristic passes run in sequence over one shared node collection.
//! Each pass mutates nodes in place (features, complexity, group fields,
//! rewritten responses) and returns connections, groups, suggestions and
//! metrics for the caller to keep or discard.
//!
//! # Architecture
//!
//! - **FaqAlgorithm trait**: validate, execute, read and update configuration
//! - **AlgorithmOrchestrator**: runs enabled algorithms in registration order,
//!   isolates failures and merges results into an [`ExecutionReport`]
//! - **ExecutionContext**: cancellation token plus progress sink, shared by
//!   every stage of a run
//!
//! # Built-in Algorithms
//!
//! - **ConnectionDiscovery** (`connection_discovery`)
//! - **SemanticClusterer** (`semantic_clustering`)
//! - **RelationshipLinker** (`relationship_linking`)
//! - **ResponseQualityOptimizer** (`response_quality`)
//!
//! # Example
//!
//! ```ignore
//! use faqweave::analysis::{AlgorithmOrchestrator, ExecutionContext, TracingProgress};
//! use std::sync::Arc;
//!
//! let orchestrator = AlgorithmOrchestrator::with_default_algorithms();
//! let ctx = ExecutionContext::new().with_progress(Arc::new(TracingProgress));
//!
//! let report = orchestrator.run_all(&mut nodes, &ctx).await;
//! if !report.overall_success {
//!     for failed in report.results.iter().filter(|r| !r.is_successful()) {
//!         eprintln!("{}: {:?}", failed.algorithm, failed.errors);
//!     }
//! }
//! ```

pub mod algorithms;
mod cancel;
mod orchestrator;
mod progress;
mod traits;
mod types;

pub use cancel::CancellationToken;
pub use orchestrator::AlgorithmOrchestrator;
pub use progress::{percent, ChannelProgress, NullProgress, ProgressEvent, ProgressSink, TracingProgress};
pub use traits::{AlgorithmRegistry, ExecutionContext, FaqAlgorithm};
pub use types::{
    AlgorithmConfig, AlgorithmError, AlgorithmResult, ExecutionReport, OptimizationSuggestion,
    RunStatus, SuggestionType, ValidationReport,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ConnectionType, FaqNode};

    fn sample_nodes() -> Vec<FaqNode> {
        vec![
            FaqNode::new(
                "How do I reset the router password?",
                "Hold the reset button on the router for ten seconds.",
            ),
            FaqNode::new(
                "How do I reset the router password quickly?",
                "Hold the reset button on the router for ten seconds.",
            ),
            FaqNode::new("Where is the office?", "Main street 5, second floor."),
        ]
    }

    #[tokio::test]
    async fn full_pipeline_runs_every_stage() {
        let orchestrator = AlgorithmOrchestrator::with_default_algorithms();
        let mut nodes = sample_nodes();
        let (sink, mut events) = ChannelProgress::new();
        let ctx = ExecutionContext::new().with_progress(std::sync::Arc::new(sink));

        let report = orchestrator.run_all(&mut nodes, &ctx).await;

        assert!(report.overall_success);
        assert_eq!(report.results.len(), 4);
        assert!(report
            .connections
            .iter()
            .any(|c| c.connection_type == ConnectionType::Semantic));
        assert_eq!(report.groups.len(), 1);
        assert!(nodes.iter().all(|n| n.has_features()));
        assert!(nodes
            .iter()
            .all(|n| n.metadata.properties.contains_key("quality.overall")));

        let mut last = 0;
        while let Ok(event) = events.try_recv() {
            assert!(event.percentage >= last);
            last = event.percentage;
        }
        assert_eq!(last, 100);
    }

    #[tokio::test]
    async fn bad_configuration_fails_one_stage_only() {
        let mut orchestrator = AlgorithmOrchestrator::with_default_algorithms();
        orchestrator
            .configure(
                "semantic_clustering",
                &AlgorithmConfig::new().with_param("group_similarity_threshold", "high"),
            )
            .unwrap();
        let mut nodes = sample_nodes();

        let report = orchestrator.run_all(&mut nodes, &ExecutionContext::new()).await;

        assert!(!report.overall_success);
        assert!(report.groups.is_empty());
        let failed = report.result_for("semantic_clustering").unwrap();
        assert_eq!(failed.status, RunStatus::Failed);
        assert!(report.result_for("relationship_linking").unwrap().is_successful());
        assert!(report.result_for("response_quality").unwrap().is_successful());
    }
}
