//! In-memory graph store: a versioned snapshot registry behind an `RwLock`.
//!
//! The "current snapshot" per repository is an explicit registry entry
//! swapped wholesale under the write lock, not ambient shared state, which
//! is what makes concurrent reads safe without further locking. Used by the
//! test suites and by embedders that don't want a database on disk.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::Result;
use crate::graph::traversal::Direction;
use crate::store::GraphStore;
use crate::types::{CodeEdge, CodeNode, EdgeKind, GraphSnapshot};

#[derive(Default)]
pub struct InMemoryGraphStore {
    snapshots: RwLock<HashMap<String, GraphSnapshot>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, GraphSnapshot>> {
        self.snapshots.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, GraphSnapshot>> {
        self.snapshots.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl GraphStore for InMemoryGraphStore {
    fn replace_graph(&self, repo_id: &str, snapshot: &GraphSnapshot) -> Result<()> {
        self.write().insert(repo_id.to_string(), snapshot.clone());
        Ok(())
    }

    fn neighbors(
        &self,
        repo_id: &str,
        node_id: &str,
        edge_kinds: &[EdgeKind],
        direction: Direction,
    ) -> Result<Vec<CodeEdge>> {
        let guard = self.read();
        let snapshot = match guard.get(repo_id) {
            Some(s) => s,
            None => return Ok(Vec::new()),
        };
        // snapshot edges are sorted at build time, so this order is stable
        Ok(snapshot
            .edges
            .iter()
            .filter(|e| match direction {
                Direction::Outgoing => e.source == node_id,
                Direction::Incoming => e.target == node_id,
            })
            .filter(|e| edge_kinds.contains(&e.kind))
            .cloned()
            .collect())
    }

    fn node(&self, repo_id: &str, node_id: &str) -> Result<Option<CodeNode>> {
        Ok(self
            .read()
            .get(repo_id)
            .and_then(|s| s.node(node_id))
            .cloned())
    }

    fn set_summary(&self, repo_id: &str, node_id: &str, summary: &str) -> Result<()> {
        let mut guard = self.write();
        if let Some(snapshot) = guard.get_mut(repo_id) {
            if let Some(node) = snapshot.nodes.iter_mut().find(|n| n.id == node_id) {
                node.summary = Some(summary.to_string());
            }
        }
        Ok(())
    }

    fn export(&self, repo_id: &str) -> Result<GraphSnapshot> {
        Ok(self.read().get(repo_id).cloned().unwrap_or_default())
    }

    fn has_repo(&self, repo_id: &str) -> Result<bool> {
        Ok(self.read().contains_key(repo_id))
    }

    fn delete_repo(&self, repo_id: &str) -> Result<()> {
        self.write().remove(repo_id);
        Ok(())
    }

    fn delete_all(&self) -> Result<()> {
        self.write().clear();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeKind;

    fn sample() -> GraphSnapshot {
        GraphSnapshot {
            nodes: vec![
                CodeNode::bare("a.py", NodeKind::File, "a.py"),
                CodeNode::bare("a.py:f", NodeKind::Function, "a.py"),
            ],
            edges: vec![CodeEdge::new("a.py", "a.py:f", EdgeKind::Contains)],
        }
    }

    #[test]
    fn replace_then_query() {
        let store = InMemoryGraphStore::new();
        store.replace_graph("repo", &sample()).unwrap();

        assert!(store.has_repo("repo").unwrap());
        assert!(!store.has_repo("other").unwrap());

        let node = store.node("repo", "a.py:f").unwrap().unwrap();
        assert_eq!(node.kind, NodeKind::Function);

        let out = store
            .neighbors("repo", "a.py", &[EdgeKind::Contains], Direction::Outgoing)
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].target, "a.py:f");

        let incoming = store
            .neighbors("repo", "a.py:f", &[EdgeKind::Contains], Direction::Incoming)
            .unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].source, "a.py");
    }

    #[test]
    fn replace_is_wholesale_never_a_merge() {
        let store = InMemoryGraphStore::new();
        store.replace_graph("repo", &sample()).unwrap();

        let smaller = GraphSnapshot {
            nodes: vec![CodeNode::bare("b.py", NodeKind::File, "b.py")],
            edges: vec![],
        };
        store.replace_graph("repo", &smaller).unwrap();

        assert!(store.node("repo", "a.py").unwrap().is_none());
        assert!(store.node("repo", "b.py").unwrap().is_some());
    }

    #[test]
    fn set_summary_fills_annotation_field() {
        let store = InMemoryGraphStore::new();
        store.replace_graph("repo", &sample()).unwrap();
        store.set_summary("repo", "a.py:f", "Does things.").unwrap();

        let node = store.node("repo", "a.py:f").unwrap().unwrap();
        assert_eq!(node.summary.as_deref(), Some("Does things."));
    }

    #[test]
    fn neighbors_filters_by_edge_kind() {
        let store = InMemoryGraphStore::new();
        store.replace_graph("repo", &sample()).unwrap();
        let out = store
            .neighbors("repo", "a.py", &[EdgeKind::Invokes], Direction::Outgoing)
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn export_returns_full_dump() {
        let store = InMemoryGraphStore::new();
        store.replace_graph("repo", &sample()).unwrap();
        let dump = store.export("repo").unwrap();
        assert_eq!(dump.nodes.len(), 2);
        assert_eq!(dump.edges.len(), 1);
    }

    #[test]
    fn delete_all_clears_every_repo() {
        let store = InMemoryGraphStore::new();
        store.replace_graph("one", &sample()).unwrap();
        store.replace_graph("two", &sample()).unwrap();
        store.delete_all().unwrap();
        assert!(!store.has_repo("one").unwrap());
        assert!(!store.has_repo("two").unwrap());
    }
}
