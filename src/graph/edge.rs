//! Connections between FAQ nodes

use super::node::{NodeId, Properties, PropertyValue};
use super::score::Score;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Unique identifier for a connection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Create a new random ConnectionId
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of relationship a connection expresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionType {
    /// Vector similarity above threshold
    Semantic,
    /// Source should be understood before target
    Prerequisite,
    /// Target is a natural next question after source
    FollowUp,
    /// Topically related
    Related,
    /// Answers disagree
    Contradiction,
    /// Both nodes belong to the same cluster
    GroupMember,
    /// Near-identical records
    Duplicate,
    /// Records share attached files
    FileReference,
    /// Anything user-defined
    Custom,
}

impl ConnectionType {
    pub const ALL: [ConnectionType; 9] = [
        ConnectionType::Semantic,
        ConnectionType::Prerequisite,
        ConnectionType::FollowUp,
        ConnectionType::Related,
        ConnectionType::Contradiction,
        ConnectionType::GroupMember,
        ConnectionType::Duplicate,
        ConnectionType::FileReference,
        ConnectionType::Custom,
    ];

    /// Human-readable label
    pub fn label(self) -> &'static str {
        match self {
            ConnectionType::Semantic => "semantic",
            ConnectionType::Prerequisite => "prerequisite",
            ConnectionType::FollowUp => "follow-up",
            ConnectionType::Related => "related",
            ConnectionType::Contradiction => "contradiction",
            ConnectionType::GroupMember => "group member",
            ConnectionType::Duplicate => "duplicate",
            ConnectionType::FileReference => "file reference",
            ConnectionType::Custom => "custom",
        }
    }

    /// Whether source → target order carries meaning
    pub fn is_directed(self) -> bool {
        match self {
            ConnectionType::Prerequisite | ConnectionType::FollowUp => true,
            ConnectionType::Semantic
            | ConnectionType::Related
            | ConnectionType::Contradiction
            | ConnectionType::GroupMember
            | ConnectionType::Duplicate
            | ConnectionType::FileReference
            | ConnectionType::Custom => false,
        }
    }

    /// Stroke color used when drawing the connection
    pub fn display_color(self) -> &'static str {
        match self {
            ConnectionType::Semantic => "#4A90D9",
            ConnectionType::Prerequisite => "#E67E22",
            ConnectionType::FollowUp => "#27AE60",
            ConnectionType::Related => "#8E44AD",
            ConnectionType::Contradiction => "#C0392B",
            ConnectionType::GroupMember => "#16A085",
            ConnectionType::Duplicate => "#7F8C8D",
            ConnectionType::FileReference => "#D4AC0D",
            ConnectionType::Custom => "#34495E",
        }
    }

    /// Dash pattern (dash, gap) used when drawing; empty means solid
    pub fn dash_pattern(self) -> &'static [u8] {
        match self {
            ConnectionType::Semantic | ConnectionType::Prerequisite | ConnectionType::FollowUp => &[],
            ConnectionType::Related => &[4, 2],
            ConnectionType::Contradiction => &[2, 2],
            ConnectionType::GroupMember => &[1, 3],
            ConnectionType::Duplicate => &[6, 3],
            ConnectionType::FileReference => &[3, 1, 1, 1],
            ConnectionType::Custom => &[5, 5],
        }
    }
}

impl std::fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A directed, weighted edge produced by one algorithm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub source: NodeId,
    pub target: NodeId,
    pub connection_type: ConnectionType,
    pub strength: Score,
    #[serde(default)]
    pub description: String,
    /// Name of the algorithm that created the connection
    pub algorithm: String,
    /// The algorithm's confidence in the connection
    pub confidence: Score,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub user_confirmed: bool,
    #[serde(default)]
    pub metadata: Properties,
}

impl Connection {
    /// Create a new connection; strength is clamped to [0, 1]
    pub fn new(
        source: NodeId,
        target: NodeId,
        connection_type: ConnectionType,
        strength: f64,
        algorithm: impl Into<String>,
    ) -> Self {
        let strength = Score::new(strength);
        Self {
            id: ConnectionId::new(),
            source,
            target,
            connection_type,
            strength,
            description: String::new(),
            algorithm: algorithm.into(),
            confidence: strength,
            created_at: Utc::now(),
            user_confirmed: false,
            metadata: HashMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Score::new(confidence);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Whether the connection touches `node` at either end
    pub fn touches(&self, node: &NodeId) -> bool {
        self.source == *node || self.target == *node
    }
}
