//! SQLite-backed realization of the graph's four logical collections
//! (`nodes`, `edges`, `sessions`, `meta`). Each row carries a JSON blob of
//! the full domain value plus indexed scalar columns for the range/filter
//! queries the in-memory graph doesn't already answer on its own.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use mnemo_types::graph::{Edge, EdgeId, Node, NodeId};
use mnemo_types::session::{Session, SessionId};

use crate::error::Result;

pub const SCHEMA_VERSION: i32 = 1;

pub trait GraphStore: Send + Sync {
    fn put_node(&self, node: &Node) -> Result<()>;
    fn get_node(&self, id: &NodeId) -> Result<Option<Node>>;
    fn delete_node(&self, id: &NodeId) -> Result<()>;
    fn all_nodes(&self) -> Result<Vec<Node>>;
    /// Nodes with `createdAt >= cutoff`, newest first when `reversed`.
    fn nodes_since(&self, cutoff: DateTime<Utc>, reversed: bool) -> Result<Vec<Node>>;

    fn put_edge(&self, edge: &Edge) -> Result<()>;
    fn get_edge(&self, id: &EdgeId) -> Result<Option<Edge>>;
    fn delete_edge(&self, id: &EdgeId) -> Result<()>;
    fn all_edges(&self) -> Result<Vec<Edge>>;

    fn put_session(&self, session: &Session) -> Result<()>;
    fn get_session(&self, id: &SessionId) -> Result<Option<Session>>;
    fn all_sessions(&self) -> Result<Vec<Session>>;

    fn get_meta(&self, key: &str) -> Result<Option<Value>>;
    fn put_meta(&self, key: &str, value: &Value) -> Result<()>;

    /// Writes all live nodes/edges/sessions in one transaction and stamps
    /// `meta.stats`/`meta.lastSaved`.
    fn save_graph(
        &self,
        nodes: &[Node],
        edges: &[Edge],
        sessions: &[Session],
        stats: &Value,
    ) -> Result<()>;

    /// Reads all three collections back, for the in-memory graph to rebuild
    /// its secondary indices from.
    fn load_graph(&self) -> Result<(Vec<Node>, Vec<Edge>, Vec<Session>)>;

    /// Deletes nodes older than `max_age`. Returns the number removed.
    fn prune_old_nodes(&self, max_age: Duration, now: DateTime<Utc>) -> Result<usize>;

    /// Drops edges whose source or target node no longer exists. Returns
    /// the number removed.
    fn prune_orphaned_edges(&self) -> Result<usize>;

    /// Deletes nodes older than 7 days with `relevance_score < min_relevance`,
    /// then prunes orphaned edges. Returns the number of nodes removed.
    fn compact(&self, min_relevance: f64, now: DateTime<Utc>) -> Result<usize>;
}

pub struct SqliteGraphStore {
    conn: Mutex<Connection>,
}

impl SqliteGraphStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init(conn: &Connection) -> Result<()> {
        let current_version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if current_version != 0 && current_version != SCHEMA_VERSION {
            conn.execute_batch(
                r#"
                DROP TABLE IF EXISTS nodes;
                DROP TABLE IF EXISTS edges;
                DROP TABLE IF EXISTS sessions;
                DROP TABLE IF EXISTS meta;
                "#,
            )?;
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS nodes (
                id TEXT PRIMARY KEY,
                type TEXT NOT NULL,
                platform TEXT,
                session_id TEXT,
                created_at TEXT NOT NULL,
                data TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_nodes_type ON nodes(type);
            CREATE INDEX IF NOT EXISTS idx_nodes_platform ON nodes(platform);
            CREATE INDEX IF NOT EXISTS idx_nodes_session ON nodes(session_id);
            CREATE INDEX IF NOT EXISTS idx_nodes_created ON nodes(created_at);
            CREATE INDEX IF NOT EXISTS idx_nodes_type_platform ON nodes(type, platform);

            CREATE TABLE IF NOT EXISTS edges (
                id TEXT PRIMARY KEY,
                type TEXT NOT NULL,
                source_id TEXT NOT NULL,
                target_id TEXT NOT NULL,
                data TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_edges_type ON edges(type);
            CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source_id);
            CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id);
            CREATE INDEX IF NOT EXISTS idx_edges_source_target ON edges(source_id, target_id);

            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                platform TEXT,
                started_at TEXT NOT NULL,
                is_active BOOLEAN NOT NULL,
                data TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_platform ON sessions(platform);
            CREATE INDEX IF NOT EXISTS idx_sessions_started ON sessions(started_at);
            CREATE INDEX IF NOT EXISTS idx_sessions_active ON sessions(is_active);

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        conn.execute(&format!("PRAGMA user_version = {}", SCHEMA_VERSION), [])?;
        Ok(())
    }
}

fn node_created_at(node: &Node) -> String {
    node.metadata
        .created_at
        .unwrap_or_else(Utc::now)
        .to_rfc3339()
}

impl GraphStore for SqliteGraphStore {
    fn put_node(&self, node: &Node) -> Result<()> {
        let conn = self.conn.lock().expect("graph store mutex poisoned");
        let data = serde_json::to_string(node)?;
        conn.execute(
            r#"
            INSERT INTO nodes (id, type, platform, session_id, created_at, data)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                type = ?2, platform = ?3, session_id = ?4, created_at = ?5, data = ?6
            "#,
            params![
                node.id.as_str(),
                node.node_type.as_str(),
                node.platform,
                node.session_id,
                node_created_at(node),
                data
            ],
        )?;
        Ok(())
    }

    fn get_node(&self, id: &NodeId) -> Result<Option<Node>> {
        let conn = self.conn.lock().expect("graph store mutex poisoned");
        let raw: Option<String> = conn
            .query_row(
                "SELECT data FROM nodes WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw.map(|s| serde_json::from_str(&s)).transpose()?)
    }

    fn delete_node(&self, id: &NodeId) -> Result<()> {
        let conn = self.conn.lock().expect("graph store mutex poisoned");
        conn.execute("DELETE FROM nodes WHERE id = ?1", params![id.as_str()])?;
        Ok(())
    }

    fn all_nodes(&self) -> Result<Vec<Node>> {
        let conn = self.conn.lock().expect("graph store mutex poisoned");
        let mut stmt = conn.prepare("SELECT data FROM nodes")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|s| Ok(serde_json::from_str(&s)?))
            .collect()
    }

    fn nodes_since(&self, cutoff: DateTime<Utc>, reversed: bool) -> Result<Vec<Node>> {
        let conn = self.conn.lock().expect("graph store mutex poisoned");
        let order = if reversed { "DESC" } else { "ASC" };
        let query = format!(
            "SELECT data FROM nodes WHERE created_at >= ?1 ORDER BY created_at {}",
            order
        );
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt
            .query_map(params![cutoff.to_rfc3339()], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|s| Ok(serde_json::from_str(&s)?))
            .collect()
    }

    fn put_edge(&self, edge: &Edge) -> Result<()> {
        let conn = self.conn.lock().expect("graph store mutex poisoned");
        let data = serde_json::to_string(edge)?;
        conn.execute(
            r#"
            INSERT INTO edges (id, type, source_id, target_id, data)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                type = ?2, source_id = ?3, target_id = ?4, data = ?5
            "#,
            params![
                edge.id.to_string(),
                edge.edge_type.as_str(),
                edge.source_id.as_str(),
                edge.target_id.as_str(),
                data
            ],
        )?;
        Ok(())
    }

    fn get_edge(&self, id: &EdgeId) -> Result<Option<Edge>> {
        let conn = self.conn.lock().expect("graph store mutex poisoned");
        let raw: Option<String> = conn
            .query_row(
                "SELECT data FROM edges WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw.map(|s| serde_json::from_str(&s)).transpose()?)
    }

    fn delete_edge(&self, id: &EdgeId) -> Result<()> {
        let conn = self.conn.lock().expect("graph store mutex poisoned");
        conn.execute("DELETE FROM edges WHERE id = ?1", params![id.to_string()])?;
        Ok(())
    }

    fn all_edges(&self) -> Result<Vec<Edge>> {
        let conn = self.conn.lock().expect("graph store mutex poisoned");
        let mut stmt = conn.prepare("SELECT data FROM edges")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|s| Ok(serde_json::from_str(&s)?))
            .collect()
    }

    fn put_session(&self, session: &Session) -> Result<()> {
        let conn = self.conn.lock().expect("graph store mutex poisoned");
        let data = serde_json::to_string(session)?;
        conn.execute(
            r#"
            INSERT INTO sessions (id, platform, started_at, is_active, data)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                platform = ?2, started_at = ?3, is_active = ?4, data = ?5
            "#,
            params![
                session.id.0,
                session.platform,
                session.started_at.to_rfc3339(),
                session.is_active,
                data
            ],
        )?;
        Ok(())
    }

    fn get_session(&self, id: &SessionId) -> Result<Option<Session>> {
        let conn = self.conn.lock().expect("graph store mutex poisoned");
        let raw: Option<String> = conn
            .query_row(
                "SELECT data FROM sessions WHERE id = ?1",
                params![id.0],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw.map(|s| serde_json::from_str(&s)).transpose()?)
    }

    fn all_sessions(&self) -> Result<Vec<Session>> {
        let conn = self.conn.lock().expect("graph store mutex poisoned");
        let mut stmt = conn.prepare("SELECT data FROM sessions")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|s| Ok(serde_json::from_str(&s)?))
            .collect()
    }

    fn get_meta(&self, key: &str) -> Result<Option<Value>> {
        let conn = self.conn.lock().expect("graph store mutex poisoned");
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw.map(|s| serde_json::from_str(&s)).transpose()?)
    }

    fn put_meta(&self, key: &str, value: &Value) -> Result<()> {
        let conn = self.conn.lock().expect("graph store mutex poisoned");
        let data = serde_json::to_string(value)?;
        conn.execute(
            r#"
            INSERT INTO meta (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = ?2
            "#,
            params![key, data],
        )?;
        Ok(())
    }

    fn save_graph(
        &self,
        nodes: &[Node],
        edges: &[Edge],
        sessions: &[Session],
        stats: &Value,
    ) -> Result<()> {
        let mut conn = self.conn.lock().expect("graph store mutex poisoned");
        let tx = conn.transaction()?;

        for node in nodes {
            let data = serde_json::to_string(node)?;
            tx.execute(
                r#"
                INSERT INTO nodes (id, type, platform, session_id, created_at, data)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(id) DO UPDATE SET
                    type = ?2, platform = ?3, session_id = ?4, created_at = ?5, data = ?6
                "#,
                params![
                    node.id.as_str(),
                    node.node_type.as_str(),
                    node.platform,
                    node.session_id,
                    node_created_at(node),
                    data
                ],
            )?;
        }

        for edge in edges {
            let data = serde_json::to_string(edge)?;
            tx.execute(
                r#"
                INSERT INTO edges (id, type, source_id, target_id, data)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(id) DO UPDATE SET
                    type = ?2, source_id = ?3, target_id = ?4, data = ?5
                "#,
                params![
                    edge.id.to_string(),
                    edge.edge_type.as_str(),
                    edge.source_id.as_str(),
                    edge.target_id.as_str(),
                    data
                ],
            )?;
        }

        for session in sessions {
            let data = serde_json::to_string(session)?;
            tx.execute(
                r#"
                INSERT INTO sessions (id, platform, started_at, is_active, data)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(id) DO UPDATE SET
                    platform = ?2, started_at = ?3, is_active = ?4, data = ?5
                "#,
                params![
                    session.id.0,
                    session.platform,
                    session.started_at.to_rfc3339(),
                    session.is_active,
                    data
                ],
            )?;
        }

        let stats_json = serde_json::to_string(stats)?;
        tx.execute(
            "INSERT INTO meta (key, value) VALUES ('stats', ?1) ON CONFLICT(key) DO UPDATE SET value = ?1",
            params![stats_json],
        )?;
        let last_saved = serde_json::to_string(&Value::String(Utc::now().to_rfc3339()))?;
        tx.execute(
            "INSERT INTO meta (key, value) VALUES ('lastSaved', ?1) ON CONFLICT(key) DO UPDATE SET value = ?1",
            params![last_saved],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn load_graph(&self) -> Result<(Vec<Node>, Vec<Edge>, Vec<Session>)> {
        Ok((self.all_nodes()?, self.all_edges()?, self.all_sessions()?))
    }

    fn prune_old_nodes(&self, max_age: Duration, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = now - chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::zero());
        let conn = self.conn.lock().expect("graph store mutex poisoned");
        let removed = conn.execute(
            "DELETE FROM nodes WHERE created_at < ?1",
            params![cutoff.to_rfc3339()],
        )?;
        Ok(removed)
    }

    fn prune_orphaned_edges(&self) -> Result<usize> {
        let conn = self.conn.lock().expect("graph store mutex poisoned");
        let removed = conn.execute(
            r#"
            DELETE FROM edges
            WHERE source_id NOT IN (SELECT id FROM nodes)
               OR target_id NOT IN (SELECT id FROM nodes)
            "#,
            [],
        )?;
        Ok(removed)
    }

    fn compact(&self, min_relevance: f64, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = now - chrono::Duration::days(7);
        let stale: Vec<NodeId> = {
            let conn = self.conn.lock().expect("graph store mutex poisoned");
            let mut stmt = conn.prepare(
                "SELECT data FROM nodes WHERE created_at < ?1",
            )?;
            let rows = stmt
                .query_map(params![cutoff.to_rfc3339()], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter()
                .filter_map(|raw| serde_json::from_str::<Node>(&raw).ok())
                .filter(|node| node.relevance_score(now) < min_relevance)
                .map(|node| node.id)
                .collect()
        };

        let removed = stale.len();
        for id in &stale {
            self.delete_node(id)?;
        }
        self.prune_orphaned_edges()?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_types::graph::{EdgeType, NodeType};
    use serde_json::json;

    #[test]
    fn roundtrips_a_node() {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        let node = Node::new(NodeType::Language, "rust");
        store.put_node(&node).unwrap();

        let fetched = store.get_node(&node.id).unwrap().unwrap();
        assert_eq!(fetched.id, node.id);

        store.delete_node(&node.id).unwrap();
        assert!(store.get_node(&node.id).unwrap().is_none());
    }

    #[test]
    fn prunes_orphaned_edges() {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        let a = Node::new(NodeType::Language, "rust");
        let b = Node::new(NodeType::Framework, "axum");
        let edge = Edge::new(a.id.clone(), b.id.clone(), EdgeType::Uses);

        store.put_node(&a).unwrap();
        store.put_node(&b).unwrap();
        store.put_edge(&edge).unwrap();

        store.delete_node(&b.id).unwrap();
        let removed = store.prune_orphaned_edges().unwrap();
        assert_eq!(removed, 1);
        assert!(store.get_edge(&edge.id).unwrap().is_none());
    }

    #[test]
    fn save_and_load_graph_roundtrip() {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        let node = Node::new(NodeType::Topic, "databases");
        store
            .save_graph(&[node.clone()], &[], &[], &json!({"nodeCount": 1}))
            .unwrap();

        let (nodes, edges, sessions) = store.load_graph().unwrap();
        assert_eq!(nodes.len(), 1);
        assert!(edges.is_empty());
        assert!(sessions.is_empty());
        assert_eq!(store.get_meta("stats").unwrap(), Some(json!({"nodeCount": 1})));
        assert!(store.get_meta("lastSaved").unwrap().is_some());
    }

    #[test]
    fn compact_removes_low_relevance_old_nodes() {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        let now = Utc::now();
        let mut stale = Node::new(NodeType::Topic, "forgotten");
        stale.metadata.created_at = Some(now - chrono::Duration::days(10));
        stale.importance = 0.1;
        stale.confidence = 0.1;
        stale.decay = 0.1;

        store.put_node(&stale).unwrap();
        let removed = store.compact(0.5, now).unwrap();
        assert_eq!(removed, 1);
        assert!(store.get_node(&stale.id).unwrap().is_none());
    }
}
