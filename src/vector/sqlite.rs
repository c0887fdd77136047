//! SQLite-backed vector index using the `sqlite-vec` extension.
//!
//! Each repository gets its own `vec0` virtual table (embedding dimension is
//! fixed per table, and repositories may embed with different models) plus a
//! rowid-mapping metadata table. A registry table maps repository ids to
//! their table suffix and dimension.

use std::sync::{Mutex, MutexGuard, Once};

use rusqlite::{params, Connection};
use sha2::{Digest, Sha256};
use zerocopy::IntoBytes;

use crate::error::{RepoGraphError, Result};
use crate::vector::{ScoredNode, VectorIndex};

static VEC_EXTENSION: Once = Once::new();

/// Register sqlite-vec as an auto-extension, once per process, before any
/// connection that needs `vec0` is opened.
fn ensure_vec_extension() {
    VEC_EXTENSION.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite_vec::sqlite3_vec_init as *const (),
        )));
    });
}

const REGISTRY_SQL: &str = "\
CREATE TABLE IF NOT EXISTS vec_repos (
    repo_id  TEXT PRIMARY KEY,
    suffix   TEXT NOT NULL,
    dim      INTEGER NOT NULL
);
";

pub struct SqliteVectorIndex {
    conn: Mutex<Connection>,
}

impl SqliteVectorIndex {
    /// Open (or create) the index at `db_path`.
    pub fn open(db_path: &str) -> Result<Self> {
        ensure_vec_extension();
        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    /// An in-memory index, for tests and ephemeral use.
    pub fn open_in_memory() -> Result<Self> {
        ensure_vec_extension();
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.execute_batch(REGISTRY_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn repo_suffix(repo_id: &str) -> String {
    let digest = Sha256::digest(repo_id.as_bytes());
    hex::encode(&digest[..6])
}

fn meta_table(suffix: &str) -> String {
    format!("vec_meta_{suffix}")
}

fn items_table(suffix: &str) -> String {
    format!("vec_items_{suffix}")
}

/// Look up a repo's `(suffix, dim)` registry entry.
fn repo_entry(conn: &Connection, repo_id: &str) -> Result<Option<(String, usize)>> {
    let existing = conn
        .prepare_cached("SELECT suffix, dim FROM vec_repos WHERE repo_id = ?1")?
        .query_row(params![repo_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
        });

    match existing {
        Ok(entry) => Ok(Some(entry)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Look up a repo's entry, creating its tables on first use. The embedding
/// dimension is fixed by the first vector stored.
fn ensure_repo_entry(conn: &Connection, repo_id: &str, dim: usize) -> Result<(String, usize)> {
    if let Some(entry) = repo_entry(conn, repo_id)? {
        return Ok(entry);
    }
    let suffix = repo_suffix(repo_id);
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {meta} (
             id       INTEGER PRIMARY KEY AUTOINCREMENT,
             node_id  TEXT NOT NULL UNIQUE,
             metadata TEXT
         );
         CREATE VIRTUAL TABLE IF NOT EXISTS {items} USING vec0(
             embedding float[{dim}] distance_metric=cosine
         );",
        meta = meta_table(&suffix),
        items = items_table(&suffix),
    ))?;
    conn.prepare_cached("INSERT INTO vec_repos (repo_id, suffix, dim) VALUES (?1, ?2, ?3)")?
        .execute(params![repo_id, suffix, dim as i64])?;
    Ok((suffix, dim))
}

impl VectorIndex for SqliteVectorIndex {
    fn upsert_embedding(
        &self,
        repo_id: &str,
        node_id: &str,
        vector: &[f32],
        metadata: Option<&serde_json::Value>,
    ) -> Result<()> {
        if vector.is_empty() {
            return Err(RepoGraphError::Validation(
                "embedding vector must not be empty".to_string(),
            ));
        }
        let conn = self.lock();
        let (suffix, dim) = ensure_repo_entry(&conn, repo_id, vector.len())?;
        if vector.len() != dim {
            return Err(RepoGraphError::Validation(format!(
                "embedding dimension {} does not match index dimension {}",
                vector.len(),
                dim
            )));
        }

        let metadata_text = metadata.map(|m| m.to_string());
        conn.prepare_cached(&format!(
            "INSERT INTO {meta} (node_id, metadata) VALUES (?1, ?2)
             ON CONFLICT(node_id) DO UPDATE SET metadata = excluded.metadata",
            meta = meta_table(&suffix)
        ))?
        .execute(params![node_id, metadata_text])?;

        let rowid: i64 = conn
            .prepare_cached(&format!(
                "SELECT id FROM {meta} WHERE node_id = ?1",
                meta = meta_table(&suffix)
            ))?
            .query_row(params![node_id], |row| row.get(0))?;

        // vec0 has no upsert; delete-then-insert keeps the rowid mapping
        conn.prepare_cached(&format!(
            "DELETE FROM {items} WHERE rowid = ?1",
            items = items_table(&suffix)
        ))?
        .execute(params![rowid])?;
        conn.prepare_cached(&format!(
            "INSERT INTO {items} (rowid, embedding) VALUES (?1, ?2)",
            items = items_table(&suffix)
        ))?
        .execute(params![rowid, vector.as_bytes()])?;

        Ok(())
    }

    fn nearest_neighbors(
        &self,
        repo_id: &str,
        query: &[f32],
        top_k: usize,
        score_threshold: Option<f32>,
    ) -> Result<Vec<ScoredNode>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let conn = self.lock();
        let (suffix, dim) = match repo_entry(&conn, repo_id)? {
            Some(entry) => entry,
            None => return Ok(Vec::new()),
        };
        if query.len() != dim {
            return Err(RepoGraphError::Validation(format!(
                "query dimension {} does not match index dimension {}",
                query.len(),
                dim
            )));
        }

        let hits: Vec<(i64, f64)> = conn
            .prepare_cached(&format!(
                "SELECT rowid, distance FROM {items}
                 WHERE embedding MATCH ?1 AND k = ?2
                 ORDER BY distance",
                items = items_table(&suffix)
            ))?
            .query_map(params![query.as_bytes(), top_k as i64], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut results = Vec::with_capacity(hits.len());
        let mut id_stmt = conn.prepare_cached(&format!(
            "SELECT node_id FROM {meta} WHERE id = ?1",
            meta = meta_table(&suffix)
        ))?;
        for (rowid, distance) in hits {
            let node_id: String = match id_stmt.query_row(params![rowid], |row| row.get(0)) {
                Ok(id) => id,
                Err(rusqlite::Error::QueryReturnedNoRows) => continue,
                Err(e) => return Err(e.into()),
            };
            // cosine distance -> similarity
            let score = 1.0 - distance as f32;
            if score_threshold.map(|t| score >= t).unwrap_or(true) {
                results.push(ScoredNode { node_id, score });
            }
        }
        Ok(results)
    }

    fn delete_repo(&self, repo_id: &str) -> Result<()> {
        let conn = self.lock();
        if let Some((suffix, _)) = repo_entry(&conn, repo_id)? {
            conn.execute_batch(&format!(
                "DROP TABLE IF EXISTS {meta};
                 DROP TABLE IF EXISTS {items};",
                meta = meta_table(&suffix),
                items = items_table(&suffix),
            ))?;
            conn.prepare_cached("DELETE FROM vec_repos WHERE repo_id = ?1")?
                .execute(params![repo_id])?;
        }
        Ok(())
    }

    fn delete_all(&self) -> Result<()> {
        let conn = self.lock();
        let suffixes: Vec<String> = conn
            .prepare_cached("SELECT suffix FROM vec_repos")?
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for suffix in suffixes {
            conn.execute_batch(&format!(
                "DROP TABLE IF EXISTS {meta};
                 DROP TABLE IF EXISTS {items};",
                meta = meta_table(&suffix),
                items = items_table(&suffix),
            ))?;
        }
        conn.execute("DELETE FROM vec_repos", [])?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
