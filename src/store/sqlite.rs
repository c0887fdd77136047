//! SQLite-backed graph store.
//!
//! One `nodes` and one `edges` table, keyed by repository id. A snapshot
//! replace runs inside a single transaction, so readers on other
//! connections never observe a half-written graph (the database runs in WAL
//! mode). Statements go through `prepare_cached`: the first call compiles,
//! later calls hit rusqlite's statement cache.

use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OpenFlags};

use crate::error::Result;
use crate::graph::traversal::Direction;
use crate::store::GraphStore;
use crate::types::{CodeEdge, CodeNode, EdgeKind, GraphSnapshot, NodeKind};

const SCHEMA_SQL: &str = "\
CREATE TABLE IF NOT EXISTS repos (
    repo_id     TEXT PRIMARY KEY,
    indexed_at  INTEGER NOT NULL,
    node_count  INTEGER NOT NULL,
    edge_count  INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS nodes (
    repo_id     TEXT NOT NULL,
    id          TEXT NOT NULL,
    kind        TEXT NOT NULL,
    file_path   TEXT NOT NULL,
    start_line  INTEGER,
    end_line    INTEGER,
    code        TEXT,
    summary     TEXT,
    PRIMARY KEY (repo_id, id)
);
CREATE TABLE IF NOT EXISTS edges (
    repo_id     TEXT NOT NULL,
    source_id   TEXT NOT NULL,
    target_id   TEXT NOT NULL,
    kind        TEXT NOT NULL,
    PRIMARY KEY (repo_id, source_id, target_id, kind)
);
CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(repo_id, source_id);
CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(repo_id, target_id);
";

pub struct SqliteGraphStore {
    conn: Mutex<Connection>,
}

impl SqliteGraphStore {
    /// Open (or create) the database at `db_path` and apply the schema.
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    /// An in-memory store, for tests and ephemeral use.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_with_flags(
            ":memory:",
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn row_to_node(row: &rusqlite::Row<'_>) -> rusqlite::Result<CodeNode> {
    let kind: String = row.get("kind")?;
    Ok(CodeNode {
        id: row.get("id")?,
        kind: NodeKind::from_str_loose(&kind).unwrap_or(NodeKind::GenericFile),
        file_path: row.get("file_path")?,
        start_line: row.get("start_line")?,
        end_line: row.get("end_line")?,
        code: row.get("code")?,
        summary: row.get("summary")?,
    })
}

fn row_to_edge(row: &rusqlite::Row<'_>) -> rusqlite::Result<CodeEdge> {
    let kind: String = row.get("kind")?;
    Ok(CodeEdge {
        source: row.get("source_id")?,
        target: row.get("target_id")?,
        kind: EdgeKind::from_str_loose(&kind).unwrap_or(EdgeKind::Contains),
    })
}

/// An `IN (...)` list for a closed set of edge kinds. Kind names come from
/// the enum, never from user input.
fn kind_list(edge_kinds: &[EdgeKind]) -> String {
    edge_kinds
        .iter()
        .map(|k| format!("'{}'", k.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

impl GraphStore for SqliteGraphStore {
    fn replace_graph(&self, repo_id: &str, snapshot: &GraphSnapshot) -> Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM nodes WHERE repo_id = ?1", params![repo_id])?;
        tx.execute("DELETE FROM edges WHERE repo_id = ?1", params![repo_id])?;

        {
            let mut node_stmt = tx.prepare_cached(
                "INSERT INTO nodes (repo_id, id, kind, file_path, start_line, end_line, code, summary)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for node in &snapshot.nodes {
                node_stmt.execute(params![
                    repo_id,
                    node.id,
                    node.kind.as_str(),
                    node.file_path,
                    node.start_line,
                    node.end_line,
                    node.code,
                    node.summary,
                ])?;
            }

            let mut edge_stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO edges (repo_id, source_id, target_id, kind)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for edge in &snapshot.edges {
                edge_stmt.execute(params![
                    repo_id,
                    edge.source,
                    edge.target,
                    edge.kind.as_str()
                ])?;
            }

            tx.prepare_cached(
                "INSERT INTO repos (repo_id, indexed_at, node_count, edge_count)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(repo_id) DO UPDATE SET
                   indexed_at = excluded.indexed_at,
                   node_count = excluded.node_count,
                   edge_count = excluded.edge_count",
            )?
            .execute(params![
                repo_id,
                chrono::Utc::now().timestamp(),
                snapshot.nodes.len(),
                snapshot.edges.len(),
            ])?;
        }

        tx.commit()?;
        Ok(())
    }

    fn neighbors(
        &self,
        repo_id: &str,
        node_id: &str,
        edge_kinds: &[EdgeKind],
        direction: Direction,
    ) -> Result<Vec<CodeEdge>> {
        if edge_kinds.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.lock();
        let filter_column = match direction {
            Direction::Outgoing => "source_id",
            Direction::Incoming => "target_id",
        };
        let sql = format!(
            "SELECT source_id, target_id, kind FROM edges
             WHERE repo_id = ?1 AND {filter_column} = ?2 AND kind IN ({})
             ORDER BY source_id, target_id, kind",
            kind_list(edge_kinds)
        );
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(params![repo_id, node_id], row_to_edge)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn node(&self, repo_id: &str, node_id: &str) -> Result<Option<CodeNode>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, kind, file_path, start_line, end_line, code, summary
             FROM nodes WHERE repo_id = ?1 AND id = ?2",
        )?;
        let result = stmt.query_row(params![repo_id, node_id], row_to_node);
        match result {
            Ok(node) => Ok(Some(node)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_summary(&self, repo_id: &str, node_id: &str, summary: &str) -> Result<()> {
        let conn = self.lock();
        conn.prepare_cached("UPDATE nodes SET summary = ?3 WHERE repo_id = ?1 AND id = ?2")?
            .execute(params![repo_id, node_id, summary])?;
        Ok(())
    }

    fn export(&self, repo_id: &str) -> Result<GraphSnapshot> {
        let conn = self.lock();

        let mut node_stmt = conn.prepare_cached(
            "SELECT id, kind, file_path, start_line, end_line, code, summary
             FROM nodes WHERE repo_id = ?1 ORDER BY id",
        )?;
        let nodes = node_stmt
            .query_map(params![repo_id], row_to_node)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut edge_stmt = conn.prepare_cached(
            "SELECT source_id, target_id, kind FROM edges
             WHERE repo_id = ?1 ORDER BY source_id, target_id, kind",
        )?;
        let edges = edge_stmt
            .query_map(params![repo_id], row_to_edge)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(GraphSnapshot { nodes, edges })
    }

    fn has_repo(&self, repo_id: &str) -> Result<bool> {
        let conn = self.lock();
        let count: i64 = conn
            .prepare_cached("SELECT COUNT(*) FROM repos WHERE repo_id = ?1")?
            .query_row(params![repo_id], |row| row.get(0))?;
        Ok(count > 0)
    }

    fn delete_repo(&self, repo_id: &str) -> Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM nodes WHERE repo_id = ?1", params![repo_id])?;
        tx.execute("DELETE FROM edges WHERE repo_id = ?1", params![repo_id])?;
        tx.execute("DELETE FROM repos WHERE repo_id = ?1", params![repo_id])?;
        tx.commit()?;
        Ok(())
    }

    fn delete_all(&self) -> Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM nodes", [])?;
        tx.execute("DELETE FROM edges", [])?;
        tx.execute("DELETE FROM repos", [])?;
        tx.commit()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
