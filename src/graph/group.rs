//! Clusters of mutually similar nodes

use super::node::NodeId;
use super::score::Score;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a group
///
/// Derived from the seed node so re-running clustering over the same input
/// yields the same ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id of the group seeded by `node`
    pub fn for_seed(node: &NodeId) -> Self {
        Self(format!("group:{}", node))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named cluster produced by semantic clustering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqGroup {
    pub id: GroupId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Members in input order, seed first
    pub members: Vec<NodeId>,
    /// Mean pairwise similarity between members
    pub average_similarity: Score,
    /// Query of the most central member
    #[serde(default)]
    pub suggested_parent_query: Option<String>,
    pub created_at: DateTime<Utc>,
    pub algorithm: String,
    #[serde(default)]
    pub user_confirmed: bool,
}

impl FaqGroup {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, node: &NodeId) -> bool {
        self.members.contains(node)
    }
}
