//! Shared fixtures for integration tests
//!
//! Small hand-written corpora plus helpers for inspecting connection sets.

#![allow(dead_code)]

use faqweave::{Connection, ConnectionType, FaqNode, NodeId};
use std::collections::HashMap;

/// The two-node Russian installation scenario
pub fn server_setup_pair() -> Vec<FaqNode> {
    vec![
        FaqNode::new("Как настроить сервер?", "Сначала установите пакет X."),
        FaqNode::new(
            "Как установить пакет X?",
            "Скачайте X с сайта и запустите установщик.",
        ),
    ]
}

/// `n` nodes with identical text
pub fn identical_nodes(n: usize) -> Vec<FaqNode> {
    (0..n)
        .map(|_| {
            FaqNode::new(
                "How do I reset the router password?",
                "Hold the reset button on the router for ten seconds.",
            )
        })
        .collect()
}

/// A small mixed corpus: near-duplicates, a topic pair and a loner
pub fn support_corpus() -> Vec<FaqNode> {
    vec![
        FaqNode::new(
            "How do I reset my password?",
            "Open the login page and click the reset link. A new password is sent by email.",
        )
        .with_variation("forgot password"),
        FaqNode::new(
            "How do I reset my password quickly?",
            "Open the login page and click the reset link. A new password is sent by email.",
        ),
        FaqNode::new(
            "How do I configure the VPN client?",
            "Install the VPN client first, then import the profile from the portal.",
        ),
        FaqNode::new(
            "Where can I download the VPN client?",
            "The VPN client is on the downloads page of the portal.",
        ),
        FaqNode::new("What are the office hours?", "Nine to five, Monday to Friday."),
    ]
}

/// Outgoing connection count per source
pub fn out_degree(connections: &[Connection]) -> HashMap<NodeId, usize> {
    let mut degree = HashMap::new();
    for c in connections {
        *degree.entry(c.source.clone()).or_insert(0) += 1;
    }
    degree
}

/// Connections of one type between two nodes, in either direction
pub fn between<'a>(
    connections: &'a [Connection],
    a: &NodeId,
    b: &NodeId,
    kind: ConnectionType,
) -> Vec<&'a Connection> {
    connections
        .iter()
        .filter(|c| c.connection_type == kind && c.touches(a) && c.touches(b))
        .collect()
}

/// Comparable view of a connection without its random id and timestamp
pub fn shape(c: &Connection) -> (String, String, ConnectionType, u64) {
    (
        c.source.as_str().to_string(),
        c.target.as_str().to_string(),
        c.connection_type,
        c.strength.get().to_bits(),
    )
}
