//! Graph store adapter contract and implementations.
//!
//! A store holds published snapshots keyed by repository id. Publication is
//! a full replace, never a merge, and is atomic: no reader observes a
//! partially built graph. After publication only the summary annotation
//! field may be filled in; topology is immutable.

pub mod memory;
pub mod sqlite;

use crate::error::Result;
use crate::graph::traversal::{Direction, GraphAccess};
use crate::types::{CodeEdge, CodeNode, EdgeKind, GraphSnapshot};

pub use memory::InMemoryGraphStore;
pub use sqlite::SqliteGraphStore;

/// Storage contract for published graph snapshots.
pub trait GraphStore: Send + Sync {
    /// Atomically replace the snapshot for `repo_id`.
    fn replace_graph(&self, repo_id: &str, snapshot: &GraphSnapshot) -> Result<()>;

    /// Edges of one node, filtered by kind, in a stable order.
    fn neighbors(
        &self,
        repo_id: &str,
        node_id: &str,
        edge_kinds: &[EdgeKind],
        direction: Direction,
    ) -> Result<Vec<CodeEdge>>;

    /// Fetch one node.
    fn node(&self, repo_id: &str, node_id: &str) -> Result<Option<CodeNode>>;

    /// Annotation fill-in: set a node's summary after publication.
    fn set_summary(&self, repo_id: &str, node_id: &str, summary: &str) -> Result<()>;

    /// The unfiltered node/edge dump for visualization.
    fn export(&self, repo_id: &str) -> Result<GraphSnapshot>;

    /// Whether a snapshot has been published for `repo_id`.
    fn has_repo(&self, repo_id: &str) -> Result<bool>;

    /// Remove one repository's snapshot.
    fn delete_repo(&self, repo_id: &str) -> Result<()>;

    /// Remove everything.
    fn delete_all(&self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// RepoView
// ---------------------------------------------------------------------------

/// A store scoped to one repository, usable as a traversal accessor.
pub struct RepoView<'a> {
    store: &'a dyn GraphStore,
    repo_id: &'a str,
}

impl<'a> RepoView<'a> {
    pub fn new(store: &'a dyn GraphStore, repo_id: &'a str) -> Self {
        Self { store, repo_id }
    }
}

impl GraphAccess for RepoView<'_> {
    fn neighbors(
        &self,
        node_id: &str,
        edge_kinds: &[EdgeKind],
        direction: Direction,
    ) -> Result<Vec<CodeEdge>> {
        self.store
            .neighbors(self.repo_id, node_id, edge_kinds, direction)
    }

    fn node(&self, node_id: &str) -> Result<Option<CodeNode>> {
        self.store.node(self.repo_id, node_id)
    }
}
