//! Orchestrated runs over whole collections

mod common;

use async_trait::async_trait;
use common::{between, support_corpus};
use faqweave::analysis::algorithms::{
    ConnectionDiscovery, RelationshipLinker, ResponseQualityOptimizer, SemanticClusterer,
};
use faqweave::analysis::ValidationReport;
use faqweave::{
    AlgorithmConfig, AlgorithmError, AlgorithmOrchestrator, AlgorithmResult, CancellationToken,
    Connection, ConnectionType, ExecutionContext, FaqAlgorithm, FaqNode, RunStatus,
};

/// Links the first node to the last, or fails on demand
struct FixedLink {
    name: &'static str,
    fail: bool,
    config: AlgorithmConfig,
}

impl FixedLink {
    fn new(name: &'static str, fail: bool) -> Self {
        Self {
            name,
            fail,
            config: AlgorithmConfig::new(),
        }
    }
}

#[async_trait]
impl FaqAlgorithm for FixedLink {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "links the first node to the last"
    }

    fn configuration(&self) -> &AlgorithmConfig {
        &self.config
    }

    fn update_configuration(&mut self, overrides: &AlgorithmConfig) {
        self.config = self.config.merged(overrides);
    }

    fn validate(&self, _nodes: &[FaqNode]) -> ValidationReport {
        ValidationReport::new()
    }

    async fn execute(
        &self,
        nodes: &mut [FaqNode],
        _ctx: &ExecutionContext,
    ) -> Result<AlgorithmResult, AlgorithmError> {
        if self.fail {
            return Err(AlgorithmError::Execution("index out of range".to_string()));
        }
        let mut result = AlgorithmResult::new(self.name);
        if let (Some(first), Some(last)) = (nodes.first(), nodes.last()) {
            result.add_connection(Connection::new(
                first.id().clone(),
                last.id().clone(),
                ConnectionType::Related,
                0.5,
                self.name,
            ));
        }
        Ok(result)
    }
}

#[tokio::test]
async fn failing_stage_is_isolated() {
    let mut orchestrator = AlgorithmOrchestrator::new();
    orchestrator.register(FixedLink::new("first", false));
    orchestrator.register(FixedLink::new("second", true));
    orchestrator.register(FixedLink::new("third", false));
    let mut nodes = support_corpus();

    let report = orchestrator.run_all(&mut nodes, &ExecutionContext::new()).await;

    assert!(!report.overall_success);
    assert!(!report.cancelled);
    assert_eq!(report.results.len(), 3);
    assert_eq!(report.result_for("second").unwrap().status, RunStatus::Failed);

    let algorithms: Vec<&str> = report.connections.iter().map(|c| c.algorithm.as_str()).collect();
    assert_eq!(algorithms, vec!["first", "third"]);
}

#[tokio::test]
async fn every_algorithm_accepts_empty_input() {
    let algorithms: Vec<Box<dyn FaqAlgorithm>> = vec![
        Box::new(ConnectionDiscovery::new()),
        Box::new(SemanticClusterer::new()),
        Box::new(RelationshipLinker::new()),
        Box::new(ResponseQualityOptimizer::new()),
    ];
    let ctx = ExecutionContext::new();
    for algorithm in &algorithms {
        let validation = algorithm.validate(&[]);
        assert!(validation.is_valid(), "{} rejected empty input", algorithm.name());
        assert!(!validation.warnings.is_empty());

        let result = algorithm.execute(&mut [], &ctx).await.unwrap();
        assert!(result.is_successful(), "{} failed on empty input", algorithm.name());
        assert!(result.connections.is_empty());
        assert!(result.suggestions.is_empty());
        assert!(result.groups.is_empty());
    }
}

#[tokio::test]
async fn single_node_produces_no_pairs() {
    let orchestrator = AlgorithmOrchestrator::with_default_algorithms();
    let mut nodes = vec![FaqNode::new("What are the office hours?", "Nine to five.")];
    let report = orchestrator.run_all(&mut nodes, &ExecutionContext::new()).await;
    assert!(report.overall_success);
    assert!(report.connections.is_empty());
    assert!(report.groups.is_empty());
}

#[tokio::test]
async fn support_corpus_end_to_end() {
    let orchestrator = AlgorithmOrchestrator::with_default_algorithms();
    let mut nodes = support_corpus();
    let report = orchestrator.run_all(&mut nodes, &ExecutionContext::new()).await;

    assert!(report.overall_success);
    let reset = nodes[0].id().clone();
    let reset_quickly = nodes[1].id().clone();
    assert!(!between(&report.connections, &reset, &reset_quickly, ConnectionType::Semantic).is_empty());

    // the password pair clusters; the loner stays out of every group
    let loner = nodes[4].id();
    assert!(report.groups.iter().any(|g| g.members.contains(&reset) && g.members.contains(&reset_quickly)));
    assert!(report.groups.iter().all(|g| !g.members.contains(loner)));
    assert!(nodes[4].algorithm_props.cluster_id.is_none());

    for connection in &report.connections {
        let strength = connection.strength.get();
        assert!((0.0..=1.0).contains(&strength));
        assert_ne!(connection.source, connection.target);
    }
    assert!(report.metrics.contains_key("pairs_compared"));
    assert!(report.total_elapsed >= report.longest_stage);
}

#[tokio::test]
async fn pre_cancelled_run_stops_at_the_first_stage() {
    let orchestrator = AlgorithmOrchestrator::with_default_algorithms();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let ctx = ExecutionContext::new().with_cancel(cancel);
    let mut nodes = support_corpus();

    let report = orchestrator.run_all(&mut nodes, &ctx).await;

    assert!(report.cancelled);
    assert!(!report.overall_success);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].status, RunStatus::Cancelled);
    assert!(report.connections.is_empty());
}

#[tokio::test]
async fn disabled_algorithm_is_not_run() {
    let mut orchestrator = AlgorithmOrchestrator::with_default_algorithms();
    orchestrator.set_enabled("response_quality", false).unwrap();
    let mut nodes = support_corpus();
    let report = orchestrator.run_all(&mut nodes, &ExecutionContext::new()).await;

    assert_eq!(report.results.len(), 3);
    assert!(report.result_for("response_quality").is_none());
    assert!(nodes
        .iter()
        .all(|n| !n.metadata.properties.contains_key("quality.overall")));
}
