//! The four analysis passes, in pipeline order
//!
//! 1. [`ConnectionDiscovery`]: semantic, keyword, file and duplicate edges
//! 2. [`SemanticClusterer`]: greedy similarity groups
//! 3. [`RelationshipLinker`]: prerequisite, follow-up, related and
//!    contradiction edges, capped per source node
//! 4. [`ResponseQualityOptimizer`]: quality scores, rewrites, suggestions
//!
//! Every pass fills in missing text features itself, so any of them can run
//! alone through `run_one`.

mod clustering;
mod connections;
mod linker;
mod quality;

pub use clustering::SemanticClusterer;
pub use connections::ConnectionDiscovery;
pub use linker::{cap_links_per_node, RelationshipLinker};
pub use quality::ResponseQualityOptimizer;

use super::traits::ExecutionContext;
use super::types::{AlgorithmError, ValidationReport};
use crate::graph::{content_hash, FaqNode};
use crate::text::Vectorizer;
use tracing::debug;

/// Whether a node's stored features are missing or out of date for `vectorizer`
fn needs_features(node: &FaqNode, vectorizer: &dyn Vectorizer) -> bool {
    !node.has_features()
        || node.algorithm_props.semantic_vector.len() != vectorizer.dimensions()
        || node.metadata.hash != content_hash(&node.query, &node.response)
}

/// Compute text features for nodes that have none, were vectorized at another
/// width, or whose text changed since; returns how many were filled
pub(crate) fn ensure_features(
    nodes: &mut [FaqNode],
    vectorizer: &dyn Vectorizer,
    ctx: &ExecutionContext,
) -> Result<usize, AlgorithmError> {
    let mut filled = 0;
    for node in nodes.iter_mut().filter(|n| needs_features(n, vectorizer)) {
        ctx.checkpoint()?;
        node.refresh_features(vectorizer)?;
        filled += 1;
    }
    if filled > 0 {
        debug!(filled, vectorizer = vectorizer.name(), "Computed missing or stale text features");
    }
    Ok(filled)
}

/// Input-size checks shared by the passes
pub(crate) fn check_input(nodes: &[FaqNode], min_nodes: usize, report: &mut ValidationReport) {
    if nodes.is_empty() {
        report.add_warning("No nodes to analyze");
    } else if nodes.len() < min_nodes {
        report.add_warning(format!(
            "At least {} nodes are needed for meaningful output, got {}",
            min_nodes,
            nodes.len()
        ));
    }
    let blank = nodes.iter().filter(|n| n.query.trim().is_empty()).count();
    if blank > 0 {
        report.add_warning(format!("{} node(s) have an empty query", blank));
    }
}
