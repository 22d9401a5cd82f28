//! Greedy single-pass semantic clustering
//!
//! Nodes are visited in input order. Each unvisited node seeds a cluster that
//! takes every later unvisited node at least `group_similarity_threshold`
//! similar to the seed. Everything the seed pulls in is marked visited,
//! whether or not the cluster survives the size filter, so nodes from a
//! dropped cluster are never retried. Output depends only on input order
//! and vectors.

use super::{check_input, ensure_features};
use crate::analysis::traits::{ExecutionContext, FaqAlgorithm};
use crate::analysis::types::{AlgorithmConfig, AlgorithmError, AlgorithmResult, ValidationReport};
use crate::graph::{Connection, ConnectionType, FaqGroup, FaqNode, GroupId, Score};
use crate::text::{self, cosine_similarity, HashedBagOfWords, Vectorizer};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

const NAME: &str = "semantic_clustering";

/// Keywords named in a group title
const NAME_KEYWORDS: usize = 2;

#[derive(Debug, Clone, PartialEq)]
struct ClusterParams {
    group_similarity_threshold: f64,
    min_group_size: usize,
    max_group_size: usize,
    create_group_connections: bool,
}

impl ClusterParams {
    fn from_config(config: &AlgorithmConfig) -> Result<Self, AlgorithmError> {
        let params = Self {
            group_similarity_threshold: config.float("group_similarity_threshold")?,
            min_group_size: config.usize("min_group_size")?,
            max_group_size: config.usize("max_group_size")?,
            create_group_connections: config.bool("create_group_connections")?,
        };
        if params.min_group_size > params.max_group_size {
            return Err(AlgorithmError::config(
                "min_group_size",
                format!(
                    "{} exceeds max_group_size {}",
                    params.min_group_size, params.max_group_size
                ),
            ));
        }
        Ok(params)
    }

    fn accepts(&self, size: usize) -> bool {
        (self.min_group_size..=self.max_group_size).contains(&size)
    }
}

/// Groups mutually similar nodes and names each group
pub struct SemanticClusterer {
    config: AlgorithmConfig,
    vectorizer: Arc<dyn Vectorizer>,
}

impl Default for SemanticClusterer {
    fn default() -> Self {
        Self::new()
    }
}

impl SemanticClusterer {
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
            .with_param("group_similarity_threshold", 0.7)
            .with_param("min_group_size", 2i64)
            .with_param("max_group_size", 10i64)
            .with_param("create_group_connections", true)
    }

    /// Member index lists of the clusters that pass the size filter, plus
    /// the number of dropped clusters
    async fn form_clusters(
        vectors: &[&[f64]],
        params: &ClusterParams,
        ctx: &ExecutionContext,
    ) -> Result<(Vec<Vec<usize>>, usize), AlgorithmError> {
        let mut visited = vec![false; vectors.len()];
        let mut kept = Vec::new();
        let mut dropped = 0;

        for seed in 0..vectors.len() {
            ctx.checkpoint()?;
            if visited[seed] {
                continue;
            }
            visited[seed] = true;
            let mut members = vec![seed];
            for other in (seed + 1)..vectors.len() {
                if visited[other] {
                    continue;
                }
                if cosine_similarity(vectors[seed], vectors[other]) >= params.group_similarity_threshold {
                    visited[other] = true;
                    members.push(other);
                }
            }

            if params.accepts(members.len()) {
                kept.push(members);
            } else {
                debug!(seed, size = members.len(), "Dropping cluster outside size bounds");
                dropped += 1;
            }
            tokio::task::yield_now().await;
        }
        Ok((kept, dropped))
    }
}

/// Mean similarity over all member pairs; 1.0 for a single member
fn average_similarity(vectors: &[&[f64]], members: &[usize]) -> f64 {
    let mut total = 0.0;
    let mut pairs = 0usize;
    for (k, &a) in members.iter().enumerate() {
        for &b in &members[k + 1..] {
            total += cosine_similarity(vectors[a], vectors[b]);
            pairs += 1;
        }
    }
    if pairs == 0 {
        1.0
    } else {
        total / pairs as f64
    }
}

/// Member with the highest summed similarity to the others; earliest wins ties
fn medoid(vectors: &[&[f64]], members: &[usize]) -> usize {
    let mut best = members[0];
    let mut best_total = f64::NEG_INFINITY;
    for &candidate in members {
        let total: f64 = members
            .iter()
            .filter(|&&m| m != candidate)
            .map(|&m| cosine_similarity(vectors[candidate], vectors[m]))
            .sum();
        if total > best_total {
            best = candidate;
            best_total = total;
        }
    }
    best
}

/// Title from the query keywords shared by at least half of the members
fn group_name(queries: &[&str], ordinal: usize) -> String {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut first_seen: Vec<String> = Vec::new();
    for query in queries {
        for keyword in text::keywords(query) {
            let count = counts.entry(keyword.clone()).or_insert(0);
            if *count == 0 {
                first_seen.push(keyword);
            }
            *count += 1;
        }
    }

    let mut common: Vec<(usize, usize, &String)> = first_seen
        .iter()
        .enumerate()
        .map(|(order, k)| (counts[k], order, k))
        .filter(|(count, _, _)| count * 2 >= queries.len())
        .collect();
    common.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    let picked: Vec<String> = common
        .iter()
        .take(NAME_KEYWORDS)
        .map(|(_, _, k)| k.to_uppercase())
        .collect();
    if picked.is_empty() {
        format!("Group {}", ordinal)
    } else {
        picked.join(" ")
    }
}

#[async_trait]
impl FaqAlgorithm for SemanticClusterer {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Groups similar questions with greedy single-pass clustering"
    }

    fn configuration(&self) -> &AlgorithmConfig {
        &self.config
    }

    fn update_configuration(&mut self, overrides: &AlgorithmConfig) {
        self.config = self.config.merged(overrides);
    }

    fn validate(&self, nodes: &[FaqNode]) -> ValidationReport {
        let mut report = ValidationReport::new();
        match ClusterParams::from_config(&self.config) {
            Ok(params) => check_input(nodes, params.min_group_size.max(2), &mut report),
            Err(e) => {
                check_input(nodes, 2, &mut report);
                report.add_error(e.to_string());
            }
        }
        report
    }

    async fn execute(
        &self,
        nodes: &mut [FaqNode],
        ctx: &ExecutionContext,
    ) -> Result<AlgorithmResult, AlgorithmError> {
        let params = ClusterParams::from_config(&self.config)?;
        let mut result = AlgorithmResult::new(NAME);
        result.processed_nodes = nodes.len();
        if nodes.is_empty() {
            return Ok(result);
        }

        ensure_features(nodes, self.vectorizer.as_ref(), ctx)?;

        let owned: Vec<Vec<f64>> = nodes
            .iter()
            .map(|n| n.algorithm_props.semantic_vector.clone())
            .collect();
        let vectors: Vec<&[f64]> = owned.iter().map(Vec::as_slice).collect();
        let (clusters, dropped) = Self::form_clusters(&vectors, &params, ctx).await?;

        let mut groups = Vec::with_capacity(clusters.len());
        for (ordinal, members) in clusters.iter().enumerate() {
            ctx.checkpoint()?;
            let seed = nodes[members[0]].id().clone();
            let id = GroupId::for_seed(&seed);
            let queries: Vec<&str> = members.iter().map(|&m| nodes[m].query.as_str()).collect();
            let name = group_name(&queries, ordinal + 1);
            let average = average_similarity(&vectors, members);
            let parent = nodes[medoid(&vectors, members)].query.clone();

            groups.push(FaqGroup {
                id,
                name,
                description: format!("{} similar questions", members.len()),
                members: members.iter().map(|&m| nodes[m].id().clone()).collect(),
                average_similarity: Score::new(average),
                suggested_parent_query: Some(parent),
                created_at: Utc::now(),
                algorithm: NAME.to_string(),
                user_confirmed: false,
            });
        }

        // clear the previous run's assignment
        for node in nodes.iter_mut() {
            if let Some(previous) = node.metadata.group_name.take() {
                node.metadata.tags.remove(&previous);
            }
            node.algorithm_props.cluster_id = None;
        }

        for (group, members) in groups.iter().zip(&clusters) {
            for &m in members {
                let node = &mut nodes[m];
                node.metadata.group_name = Some(group.name.clone());
                node.metadata.tags.insert(group.name.clone());
                node.algorithm_props.cluster_id = Some(group.id.clone());
            }

            if params.create_group_connections {
                for (k, a) in group.members.iter().enumerate() {
                    for b in &group.members[k + 1..] {
                        result.add_connection(
                            Connection::new(
                                a.clone(),
                                b.clone(),
                                ConnectionType::GroupMember,
                                group.average_similarity.get(),
                                NAME,
                            )
                            .with_description(format!("Both in group '{}'", group.name)),
                        );
                    }
                }
            }
        }

        let grouped: usize = groups.iter().map(FaqGroup::len).sum();
        result.set_metric("groups_formed", groups.len() as f64);
        result.set_metric("clusters_dropped", dropped as f64);
        result.set_metric("grouped_nodes", grouped as f64);
        info!(
            groups = groups.len(),
            grouped,
            dropped,
            "Semantic clustering complete"
        );
        result.groups = groups;
        Ok(result)
    }
}
