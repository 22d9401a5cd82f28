//! Storage trait definitions

use crate::graph::{Connection, DecodeError, FaqNode, NodeId};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence collaborator for node collections
///
/// Implementations must be thread-safe (Send + Sync). `load_all` returns
/// nodes in the order they were first saved.
pub trait NodeStore: Send + Sync {
    /// Load every node, in insertion order
    fn load_all(&self) -> StorageResult<Vec<FaqNode>>;

    /// Load a node by ID
    fn load(&self, id: &NodeId) -> StorageResult<Option<FaqNode>>;

    /// Save a node (insert or update); an update keeps its position
    fn save(&self, node: &FaqNode) -> StorageResult<()>;

    /// Save a batch of nodes
    fn save_all(&self, nodes: &[FaqNode]) -> StorageResult<()> {
        for node in nodes {
            self.save(node)?;
        }
        Ok(())
    }

    /// Replace the stored connections
    fn save_connections(&self, connections: &[Connection]) -> StorageResult<()>;

    /// Load stored connections
    fn load_connections(&self) -> StorageResult<Vec<Connection>>;

    /// Number of stored nodes
    fn count(&self) -> StorageResult<usize> {
        Ok(self.load_all()?.len())
    }
}

/// Extension trait for opening stores from paths
pub trait OpenStore: NodeStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
