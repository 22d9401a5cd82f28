//! SQLite storage backend
//!
//! Nodes are stored as encoded JSON rows with an insertion position, so a
//! collection loads back in the order it was first saved. Connections live
//! in their own table and are replaced wholesale by each analysis run.

use super::traits::{NodeStore, OpenStore, StorageResult};
use crate::graph::{self, Connection as FaqConnection, FaqNode, NodeId};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// SQLite-backed node store
///
/// Thread-safe via internal mutex on the connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

const UPSERT_NODE: &str = r#"
    INSERT INTO nodes (id, position, query, node_json)
    VALUES (?1, (SELECT COALESCE(MAX(position) + 1, 0) FROM nodes), ?2, ?3)
    ON CONFLICT(id) DO UPDATE SET
        query = excluded.query,
        node_json = excluded.node_json
"#;

const INSERT_CONNECTION: &str = r#"
    INSERT INTO connections (id, source_id, target_id, connection_type, strength, algorithm, connection_json)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT(id) DO UPDATE SET
        source_id = excluded.source_id,
        target_id = excluded.target_id,
        connection_type = excluded.connection_type,
        strength = excluded.strength,
        algorithm = excluded.algorithm,
        connection_json = excluded.connection_json
"#;

impl SqliteStore {
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS nodes (
                id TEXT PRIMARY KEY,
                position INTEGER NOT NULL,
                query TEXT NOT NULL,
                node_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_nodes_position ON nodes(position);

            CREATE TABLE IF NOT EXISTS connections (
                id TEXT PRIMARY KEY,
                source_id TEXT NOT NULL,
                target_id TEXT NOT NULL,
                connection_type TEXT NOT NULL,
                strength REAL NOT NULL,
                algorithm TEXT NOT NULL,
                connection_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_connections_source ON connections(source_id);
            CREATE INDEX IF NOT EXISTS idx_connections_target ON connections(target_id);

            -- Enable WAL mode for concurrent reads during writes
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn node_to_row(node: &FaqNode) -> StorageResult<(String, String, String)> {
        Ok((
            node.id().as_str().to_string(),
            node.query.clone(),
            serde_json::to_string(&graph::encode_node(node)?)?,
        ))
    }

    /// Decode through the strict codec so damaged rows surface as errors
    fn row_to_node(node_json: &str) -> StorageResult<FaqNode> {
        let value: serde_json::Value = serde_json::from_str(node_json)?;
        Ok(graph::decode_node(&value)?)
    }

    fn upsert(conn: &Connection, node: &FaqNode) -> StorageResult<()> {
        let (id, query, json) = Self::node_to_row(node)?;
        conn.execute(UPSERT_NODE, params![id, query, json])?;
        Ok(())
    }

    /// Connections whose source is `node`, strongest first
    pub fn connections_from(&self, node: &NodeId) -> StorageResult<Vec<FaqConnection>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT connection_json FROM connections WHERE source_id = ?1 ORDER BY strength DESC, id",
        )?;
        let rows = stmt.query_map(params![node.as_str()], |row| row.get::<_, String>(0))?;

        let mut connections = Vec::new();
        for json in rows {
            connections.push(serde_json::from_str(&json?)?);
        }
        Ok(connections)
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl NodeStore for SqliteStore {
    fn load_all(&self) -> StorageResult<Vec<FaqNode>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT node_json FROM nodes ORDER BY position")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut nodes = Vec::new();
        for json in rows {
            nodes.push(Self::row_to_node(&json?)?);
        }
        debug!(nodes = nodes.len(), "Loaded nodes from SQLite");
        Ok(nodes)
    }

    fn load(&self, id: &NodeId) -> StorageResult<Option<FaqNode>> {
        let conn = self.conn.lock().unwrap();
        let json: Option<String> = conn
            .query_row(
                "SELECT node_json FROM nodes WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        json.map(|j| Self::row_to_node(&j)).transpose()
    }

    fn save(&self, node: &FaqNode) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        Self::upsert(&conn, node)
    }

    fn save_all(&self, nodes: &[FaqNode]) -> StorageResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for node in nodes {
            Self::upsert(&tx, node)?;
        }
        tx.commit()?;
        debug!(nodes = nodes.len(), "Saved nodes to SQLite");
        Ok(())
    }

    fn save_connections(&self, connections: &[FaqConnection]) -> StorageResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM connections", [])?;
        for c in connections {
            tx.execute(
                INSERT_CONNECTION,
                params![
                    c.id.as_str(),
                    c.source.as_str(),
                    c.target.as_str(),
                    c.connection_type.label(),
                    c.strength.get(),
                    c.algorithm,
                    serde_json::to_string(c)?,
                ],
            )?;
        }
        tx.commit()?;
        debug!(connections = connections.len(), "Saved connections to SQLite");
        Ok(())
    }

    fn load_connections(&self) -> StorageResult<Vec<FaqConnection>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT connection_json FROM connections ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut connections = Vec::new();
        for json in rows {
            connections.push(serde_json::from_str(&json?)?);
        }
        Ok(connections)
    }

    fn count(&self) -> StorageResult<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ConnectionType, Resource};
    use crate::storage::StorageError;
    use crate::text::HashedBagOfWords;
    use tempfile::tempdir;

    fn create_test_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn create_test_node(query: &str) -> FaqNode {
        FaqNode::new(query, format!("Answer to {}", query))
    }

    #[test]
    fn load_all_preserves_insertion_order() {
        let store = create_test_store();
        let nodes: Vec<FaqNode> = ["zeta", "alpha", "mid"].iter().map(|q| create_test_node(q)).collect();
        store.save_all(&nodes).unwrap();

        let loaded = store.load_all().unwrap();
        let queries: Vec<&str> = loaded.iter().map(|n| n.query.as_str()).collect();
        assert_eq!(queries, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn update_keeps_position() {
        let store = create_test_store();
        let mut first = create_test_node("first");
        let second = create_test_node("second");
        store.save(&first).unwrap();
        store.save(&second).unwrap();

        first.set_response("Rewritten");
        store.save(&first).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id(), first.id());
        assert_eq!(loaded[0].response, "Rewritten");
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn node_round_trip_keeps_features() {
        let store = create_test_store();
        let mut node = create_test_node("How do I reset the router?")
            .with_variation("router reset")
            .with_resource(Resource::file("Manual", "docs/router.pdf"))
            .with_usage(12, 0.8);
        node.refresh_features(&HashedBagOfWords).unwrap();
        store.save(&node).unwrap();

        let loaded = store.load(node.id()).unwrap().unwrap();
        assert_eq!(loaded.query, node.query);
        assert_eq!(loaded.variations, node.variations);
        assert_eq!(loaded.resources, node.resources);
        assert_eq!(loaded.metadata.access_count, 12);
        assert_eq!(loaded.metadata.hash, node.metadata.hash);
        assert_eq!(loaded.algorithm_props.keywords, node.algorithm_props.keywords);
        assert_eq!(
            loaded.algorithm_props.semantic_vector.len(),
            node.algorithm_props.semantic_vector.len()
        );
        assert!(store.load(&NodeId::from_string("missing")).unwrap().is_none());
    }

    #[test]
    fn connections_are_replaced_per_save() {
        let store = create_test_store();
        let a = create_test_node("a");
        let b = create_test_node("b");
        store.save_all(&[a.clone(), b.clone()]).unwrap();

        let old = FaqConnection::new(a.id().clone(), b.id().clone(), ConnectionType::Related, 0.4, "test");
        store.save_connections(&[old]).unwrap();

        let weak = FaqConnection::new(a.id().clone(), b.id().clone(), ConnectionType::Semantic, 0.7, "test");
        let strong = FaqConnection::new(a.id().clone(), b.id().clone(), ConnectionType::Duplicate, 0.97, "test");
        store.save_connections(&[weak.clone(), strong.clone()]).unwrap();

        let loaded = store.load_connections().unwrap();
        assert_eq!(loaded, vec![weak.clone(), strong.clone()]);

        let from_a = store.connections_from(a.id()).unwrap();
        assert_eq!(from_a[0].connection_type, ConnectionType::Duplicate);
        assert!(store.connections_from(b.id()).unwrap().is_empty());
    }

    #[test]
    fn damaged_row_is_a_decode_error() {
        let store = create_test_store();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO nodes (id, position, query, node_json) VALUES ('x', 0, 'q', '{\"id\":\"x\",\"query\":\"q\"}')",
                [],
            )
            .unwrap();
        }
        assert!(matches!(store.load_all(), Err(StorageError::Decode(_))));
    }

    #[test]
    fn file_store_persists_across_opens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("faq.db");
        let node = create_test_node("persisted");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.save(&node).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id(), node.id());
    }
}
