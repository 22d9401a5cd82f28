//! Relationship linking on small hand-built collections

mod common;

use common::{between, identical_nodes, out_degree, server_setup_pair};
use faqweave::analysis::algorithms::RelationshipLinker;
use faqweave::{
    AlgorithmConfig, ConnectionType, ExecutionContext, FaqAlgorithm, FaqNode, SuggestionType,
};

#[tokio::test]
async fn server_setup_pair_is_related() {
    let mut nodes = server_setup_pair();
    let linker = RelationshipLinker::new();
    let related_threshold = linker.configuration().float("related_threshold").unwrap();

    let result = linker.execute(&mut nodes, &ExecutionContext::new()).await.unwrap();

    let (a, b) = (nodes[0].id().clone(), nodes[1].id().clone());
    let related = between(&result.connections, &a, &b, ConnectionType::Related);
    assert_eq!(related.len(), 1);
    assert!(related[0].strength.get() >= related_threshold);
}

#[tokio::test]
async fn package_install_comes_before_server_setup() {
    let mut nodes = server_setup_pair();
    let result = RelationshipLinker::new()
        .execute(&mut nodes, &ExecutionContext::new())
        .await
        .unwrap();

    // installing the package is the simpler question
    assert!(nodes[1].algorithm_props.complexity < nodes[0].algorithm_props.complexity);
    let prerequisite = result
        .connections
        .iter()
        .find(|c| c.connection_type == ConnectionType::Prerequisite)
        .expect("prerequisite link");
    assert_eq!(&prerequisite.source, nodes[1].id());
    assert_eq!(&prerequisite.target, nodes[0].id());
}

#[tokio::test]
async fn links_are_capped_per_source() {
    let mut nodes = identical_nodes(13);
    let result = RelationshipLinker::new()
        .execute(&mut nodes, &ExecutionContext::new())
        .await
        .unwrap();

    let degree = out_degree(&result.connections);
    assert_eq!(degree[nodes[0].id()], 8);
    assert!(degree.values().all(|d| *d <= 8));
    assert_eq!(result.metrics["links_removed_by_cap"], 4.0 + 3.0 + 2.0 + 1.0);
}

#[tokio::test]
async fn cap_is_configurable() {
    let mut linker = RelationshipLinker::new();
    linker.update_configuration(&AlgorithmConfig::new().with_param("max_links_per_node", 3i64));
    let mut nodes = identical_nodes(6);

    let result = linker.execute(&mut nodes, &ExecutionContext::new()).await.unwrap();

    assert_eq!(out_degree(&result.connections)[nodes[0].id()], 3);
    assert!(result.connections.iter().all(|c| c.connection_type == ConnectionType::Related));
}

#[tokio::test]
async fn opposite_answers_are_flagged_for_reconciling() {
    let mut nodes = vec![
        FaqNode::new("Can I bring my dog to the office?", "Yes, dogs are always allowed."),
        FaqNode::new(
            "Can I bring my dog to the office?",
            "No, dogs are never allowed, they are forbidden.",
        ),
    ];
    let linker = RelationshipLinker::new();
    let threshold = linker.configuration().float("contradiction_threshold").unwrap();

    let result = linker.execute(&mut nodes, &ExecutionContext::new()).await.unwrap();

    let contradictions: Vec<_> = result
        .connections
        .iter()
        .filter(|c| c.connection_type == ConnectionType::Contradiction)
        .collect();
    assert_eq!(contradictions.len(), 1);
    assert_eq!(&contradictions[0].source, nodes[0].id());
    assert_eq!(&contradictions[0].target, nodes[1].id());
    assert!(contradictions[0].strength.get() >= threshold);

    let restructure: Vec<_> = result
        .suggestions
        .iter()
        .filter(|s| s.suggestion_type == SuggestionType::Restructure)
        .collect();
    assert_eq!(restructure.len(), 1);
    assert_eq!(restructure[0].priority, 4);
    assert_eq!(
        restructure[0].affected_nodes,
        vec![nodes[0].id().clone(), nodes[1].id().clone()]
    );
    assert_eq!(result.metrics["contradiction_links"], 1.0);
}

#[tokio::test]
async fn next_step_question_follows_the_simpler_one() {
    let mut nodes = vec![
        FaqNode::new("How do I install the VPN client?", "Download the installer from the portal."),
        FaqNode::new(
            "What comes after the VPN client install?",
            "Next, import the proxy config file, set the firewall certificate and the server token, \
             then check the network in your browser.",
        ),
    ];
    let linker = RelationshipLinker::new();
    let threshold = linker.configuration().float("follow_up_threshold").unwrap();

    let result = linker.execute(&mut nodes, &ExecutionContext::new()).await.unwrap();

    assert!(nodes[1].algorithm_props.complexity > nodes[0].algorithm_props.complexity);
    let follow_ups: Vec<_> = result
        .connections
        .iter()
        .filter(|c| c.connection_type == ConnectionType::FollowUp)
        .collect();
    assert_eq!(follow_ups.len(), 1);
    assert_eq!(&follow_ups[0].source, nodes[0].id());
    assert_eq!(&follow_ups[0].target, nodes[1].id());
    assert!(follow_ups[0].strength.get() >= threshold);
    assert!(result
        .suggestions
        .iter()
        .all(|s| s.suggestion_type != SuggestionType::Restructure));
}
