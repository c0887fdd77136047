//! Vector index adapter contract and implementations.
//!
//! The index stores one embedding per node, keyed by `(repo_id, node_id)`,
//! and answers filtered nearest-neighbor queries. Node payloads live in the
//! graph store; the index only needs ids, optional metadata, and scores.

pub mod memory;
pub mod sqlite;

use crate::error::Result;

pub use memory::InMemoryVectorIndex;
pub use sqlite::SqliteVectorIndex;

/// One nearest-neighbor hit. Higher scores are more similar.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredNode {
    pub node_id: String,
    pub score: f32,
}

/// Storage contract for node embeddings.
pub trait VectorIndex: Send + Sync {
    /// Insert or replace a node's embedding.
    fn upsert_embedding(
        &self,
        repo_id: &str,
        node_id: &str,
        vector: &[f32],
        metadata: Option<&serde_json::Value>,
    ) -> Result<()>;

    /// The `top_k` most similar node ids within one repository, ranked by
    /// descending cosine similarity. Entries below `score_threshold` are
    /// dropped.
    fn nearest_neighbors(
        &self,
        repo_id: &str,
        query: &[f32],
        top_k: usize,
        score_threshold: Option<f32>,
    ) -> Result<Vec<ScoredNode>>;

    /// Remove one repository's embeddings.
    fn delete_repo(&self, repo_id: &str) -> Result<()>;

    /// Remove everything.
    fn delete_all(&self) -> Result<()>;
}
