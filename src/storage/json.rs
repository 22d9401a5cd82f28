//! JSON file store and FAQ import
//!
//! `JsonFileStore` keeps an array of encoded nodes in one file and the
//! connections in a sibling `<stem>.connections.json`. The importer reads the
//! bot's plain `faq.json` layout: an array of `{query, response, variations,
//! resources}` objects.

use super::traits::{NodeStore, StorageError, StorageResult};
use crate::graph::{self, Connection, FaqNode, NodeId, Resource};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Counts reported by an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    /// Entries in the source document
    pub total_items: usize,
    /// Entries that became nodes
    pub valid_items: usize,
    /// Variations kept across all valid entries
    pub total_variations: usize,
}

impl ImportStats {
    pub fn skipped(&self) -> usize {
        self.total_items - self.valid_items
    }
}

/// Import the bot's FAQ layout from a parsed JSON document
pub fn import_faq_value(document: &Value) -> StorageResult<(Vec<FaqNode>, ImportStats)> {
    let items = document
        .as_array()
        .ok_or_else(|| StorageError::InvalidFormat("FAQ document must be a JSON array".to_string()))?;

    let mut stats = ImportStats {
        total_items: items.len(),
        ..Default::default()
    };
    let mut nodes = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match import_item(item) {
            Ok(node) => {
                stats.total_variations += node.variations.len();
                nodes.push(node);
            }
            Err(reason) => warn!(index, reason, "Skipping FAQ entry"),
        }
    }
    stats.valid_items = nodes.len();

    if nodes.is_empty() {
        return Err(StorageError::InvalidFormat(
            "FAQ document contains no valid entries".to_string(),
        ));
    }
    info!(
        total = stats.total_items,
        valid = stats.valid_items,
        variations = stats.total_variations,
        "Imported FAQ entries"
    );
    Ok((nodes, stats))
}

/// Import the bot's FAQ layout from a file
pub fn import_faq_file(path: impl AsRef<Path>) -> StorageResult<(Vec<FaqNode>, ImportStats)> {
    let content = fs::read_to_string(path.as_ref())?;
    let document: Value = serde_json::from_str(&content)?;
    debug!(path = %path.as_ref().display(), "Parsed FAQ file");
    import_faq_value(&document)
}

fn import_item(item: &Value) -> Result<FaqNode, &'static str> {
    let object = item.as_object().ok_or("entry is not an object")?;
    let query = match object.get("query") {
        Some(Value::String(q)) if !q.trim().is_empty() => q.trim(),
        Some(Value::String(_)) => return Err("query is empty"),
        Some(_) => return Err("query is not a string"),
        None => return Err("query is missing"),
    };
    let response = match object.get("response") {
        Some(Value::String(r)) => r.as_str(),
        Some(_) => return Err("response is not a string"),
        None => return Err("response is missing"),
    };

    let mut node = FaqNode::new(query, response);
    node.metadata.source_type = "import".to_string();
    if let Some(Value::Array(variations)) = object.get("variations") {
        node.variations = variations
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(Value::Array(resources)) = object.get("resources") {
        node.resources = resources.iter().filter_map(import_resource).collect();
    }
    Ok(node)
}

/// `{title, type, files, link, text}` from the bot layout
fn import_resource(value: &Value) -> Option<Resource> {
    let object: &Map<String, Value> = value.as_object()?;
    let text = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_string);
    Some(Resource {
        kind: text("type").unwrap_or_else(|| "file".to_string()),
        title: text("title").unwrap_or_default(),
        file_paths: object
            .get("files")
            .and_then(Value::as_array)
            .map(|files| files.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default(),
        link: text("link"),
        text: text("text"),
    })
}

/// File-backed node store
///
/// Every write rewrites the whole file; fine for the collection sizes a FAQ
/// has.
pub struct JsonFileStore {
    path: PathBuf,
    connections_path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Use `path` as the node file; it is created on first save
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "nodes".to_string());
        let connections_path = path.with_file_name(format!("{}.connections.json", stem));
        Self {
            path,
            connections_path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_nodes(&self) -> StorageResult<Vec<FaqNode>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let document: Value = serde_json::from_str(&fs::read_to_string(&self.path)?)?;
        Ok(graph::decode_nodes(&document)?)
    }

    fn write_nodes(&self, nodes: &[FaqNode]) -> StorageResult<()> {
        let encoded = nodes
            .iter()
            .map(graph::encode_node)
            .collect::<Result<Vec<_>, _>>()?;
        write_json(&self.path, &Value::Array(encoded))
    }

    /// Upsert `incoming` into `nodes`, keeping existing positions
    fn merge(nodes: &mut Vec<FaqNode>, incoming: &[FaqNode]) {
        for node in incoming {
            match nodes.iter_mut().find(|n| n.id() == node.id()) {
                Some(existing) => *existing = node.clone(),
                None => nodes.push(node.clone()),
            }
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

impl NodeStore for JsonFileStore {
    fn load_all(&self) -> StorageResult<Vec<FaqNode>> {
        let _guard = self.lock.lock().unwrap();
        self.read_nodes()
    }

    fn load(&self, id: &NodeId) -> StorageResult<Option<FaqNode>> {
        let _guard = self.lock.lock().unwrap();
        Ok(self.read_nodes()?.into_iter().find(|n| n.id() == id))
    }

    fn save(&self, node: &FaqNode) -> StorageResult<()> {
        self.save_all(std::slice::from_ref(node))
    }

    fn save_all(&self, nodes: &[FaqNode]) -> StorageResult<()> {
        let _guard = self.lock.lock().unwrap();
        let mut stored = self.read_nodes()?;
        Self::merge(&mut stored, nodes);
        self.write_nodes(&stored)?;
        debug!(path = %self.path.display(), nodes = stored.len(), "Wrote node file");
        Ok(())
    }

    fn save_connections(&self, connections: &[Connection]) -> StorageResult<()> {
        let _guard = self.lock.lock().unwrap();
        write_json(&self.connections_path, &connections)
    }

    fn load_connections(&self) -> StorageResult<Vec<Connection>> {
        let _guard = self.lock.lock().unwrap();
        if !self.connections_path.exists() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&fs::read_to_string(&self.connections_path)?)?)
    }
}
