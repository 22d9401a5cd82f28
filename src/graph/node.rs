//! FAQ node representation

use super::group::GroupId;
use super::score::Score;
use crate::scoring;
use crate::text::{self, EmbeddingError, Vectorizer};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use uuid::Uuid;

/// Unique identifier for a node
///
/// Serializes as a plain string. Freshly created nodes get a UUID; nodes
/// loaded from a store keep whatever id they were saved with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a new random NodeId
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a NodeId from an existing string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Typed property values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<PropertyValue>),
    Object(HashMap<String, PropertyValue>),
}

impl PropertyValue {
    /// Numeric view; integers widen to floats
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            PropertyValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Name of the variant, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Int(_) => "integer",
            PropertyValue::Float(_) => "float",
            PropertyValue::String(_) => "string",
            PropertyValue::Array(_) => "array",
            PropertyValue::Object(_) => "object",
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Float(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::String(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::String(v)
    }
}

/// Properties collection
pub type Properties = HashMap<String, PropertyValue>;

/// An artifact attached to a node (document, link, snippet)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Type tag, e.g. "file", "link", "image"
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub file_paths: Vec<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl Resource {
    pub fn file(title: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            kind: "file".to_string(),
            title: title.into(),
            file_paths: vec![path.into()],
            link: None,
            text: None,
        }
    }

    pub fn link(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: "link".to_string(),
            title: title.into(),
            file_paths: Vec::new(),
            link: Some(url.into()),
            text: None,
        }
    }
}

/// Provenance and usage metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Where the record came from ("import", "manual", ...)
    #[serde(default)]
    pub source_type: String,
    #[serde(default = "full_score")]
    pub confidence: Score,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    /// SHA-256 of query + response
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub access_count: u64,
    #[serde(default)]
    pub usefulness: Score,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Extended key/value properties (computed quality scores land here)
    #[serde(default)]
    pub properties: Properties,
}

fn full_score() -> Score {
    Score::ONE
}

impl Default for NodeMetadata {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            source_type: "manual".to_string(),
            confidence: Score::ONE,
            created_at: now,
            updated_at: now,
            hash: String::new(),
            group_name: None,
            access_count: 0,
            usefulness: Score::ZERO,
            tags: BTreeSet::new(),
            properties: HashMap::new(),
        }
    }
}

/// Language statistics for a node's text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageFeatures {
    /// "ru", "en", "mixed" or "unknown"
    pub language: String,
    pub confidence: Score,
    pub text_length: usize,
    pub word_count: usize,
    pub formality: Score,
}

impl Default for LanguageFeatures {
    fn default() -> Self {
        Self {
            language: "unknown".to_string(),
            confidence: Score::ZERO,
            text_length: 0,
            word_count: 0,
            formality: Score::ZERO,
        }
    }
}

/// Fields derived by the analysis algorithms
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmProps {
    #[serde(default)]
    pub semantic_vector: Vec<f64>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub complexity: Score,
    #[serde(default)]
    pub popularity: Score,
    #[serde(default)]
    pub language: LanguageFeatures,
    #[serde(default)]
    pub cluster_id: Option<GroupId>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Precomputed lexical index over a node's text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchIndex {
    #[serde(default)]
    pub normalized_text: String,
    #[serde(default)]
    pub words: BTreeSet<String>,
    #[serde(default)]
    pub bigrams: BTreeSet<String>,
    #[serde(default)]
    pub word_frequency: BTreeMap<String, usize>,
    #[serde(default)]
    pub vector: Option<Vec<f64>>,
}

impl SearchIndex {
    /// Build the index for `text`
    pub fn build(text: &str, vector: Option<Vec<f64>>) -> Self {
        let tokens = text::tokenize(text);
        Self {
            normalized_text: tokens.join(" "),
            words: tokens.iter().cloned().collect(),
            bigrams: text::bigrams(&tokens).into_iter().collect(),
            word_frequency: text::word_frequencies(&tokens),
            vector,
        }
    }
}

/// A question/answer record
///
/// `query` and `response` are plain strings, so an empty string is the
/// floor. The id is fixed at construction; there is no setter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqNode {
    id: NodeId,
    pub query: String,
    pub response: String,
    #[serde(default)]
    pub variations: Vec<String>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub metadata: NodeMetadata,
    #[serde(default)]
    pub algorithm_props: AlgorithmProps,
    #[serde(default)]
    pub search_index: SearchIndex,
}

impl FaqNode {
    /// Create a node with a fresh id
    pub fn new(query: impl Into<String>, response: impl Into<String>) -> Self {
        Self::with_id(NodeId::new(), query, response)
    }

    /// Create a node with a known id
    pub fn with_id(id: NodeId, query: impl Into<String>, response: impl Into<String>) -> Self {
        let query = query.into();
        let response = response.into();
        let metadata = NodeMetadata {
            hash: content_hash(&query, &response),
            ..Default::default()
        };
        Self {
            id,
            query,
            response,
            variations: Vec::new(),
            resources: Vec::new(),
            metadata,
            algorithm_props: AlgorithmProps::default(),
            search_index: SearchIndex::default(),
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn with_variation(mut self, variation: impl Into<String>) -> Self {
        self.variations.push(variation.into());
        self
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.metadata.tags.insert(tag.into());
        self
    }

    pub fn with_usage(mut self, access_count: u64, usefulness: f64) -> Self {
        self.metadata.access_count = access_count;
        self.metadata.usefulness = Score::new(usefulness);
        self
    }

    /// Replace the answer text and bump the update timestamp
    pub fn set_response(&mut self, response: impl Into<String>) {
        self.response = response.into();
        self.metadata.hash = content_hash(&self.query, &self.response);
        self.metadata.updated_at = Utc::now();
    }

    /// Count one lookup of this node
    pub fn record_access(&mut self) {
        self.metadata.access_count += 1;
        self.algorithm_props.popularity = Score::new(scoring::popularity(self.metadata.access_count));
    }

    /// Query and response as one text
    pub fn combined_text(&self) -> String {
        format!("{}\n{}", self.query, self.response)
    }

    /// Every file path referenced by the node's resources
    pub fn file_paths(&self) -> BTreeSet<&str> {
        self.resources
            .iter()
            .flat_map(|r| r.file_paths.iter())
            .map(|p| p.as_str())
            .filter(|p| !p.trim().is_empty())
            .collect()
    }

    /// Whether derived text features have been computed
    pub fn has_features(&self) -> bool {
        !self.algorithm_props.semantic_vector.is_empty()
    }

    /// Recompute vector, keywords, language features and the search index,
    /// and re-stamp the content hash they were computed from
    pub fn refresh_features(&mut self, vectorizer: &dyn Vectorizer) -> Result<(), EmbeddingError> {
        let combined = self.combined_text();
        let vector = vectorizer.vectorize(&combined)?;

        let mut indexed = self.query.clone();
        for variation in &self.variations {
            indexed.push('\n');
            indexed.push_str(variation);
        }
        indexed.push('\n');
        indexed.push_str(&self.response);

        let props = &mut self.algorithm_props;
        props.keywords = text::keywords(&combined);
        props.language = text::language_features(&combined);
        props.popularity = Score::new(scoring::popularity(self.metadata.access_count));
        props.updated_at = Some(Utc::now());
        self.search_index = SearchIndex::build(&indexed, Some(vector.clone()));
        props.semantic_vector = vector;
        self.metadata.hash = content_hash(&self.query, &self.response);
        Ok(())
    }
}

/// SHA-256 hex digest of a query/response pair
pub fn content_hash(query: &str, response: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.as_bytes());
    hasher.update([0u8]);
    hasher.update(response.as_bytes());
    format!("{:x}", hasher.finalize())
}
