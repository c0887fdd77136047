//! In-memory vector index: brute-force cosine similarity.
//!
//! Fine for tests and small repositories; the SQLite adapter is the
//! persistent default.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::error::Result;
use crate::vector::{ScoredNode, VectorIndex};

#[derive(Default)]
pub struct InMemoryVectorIndex {
    // BTreeMap keeps per-repo iteration order stable
    repos: RwLock<HashMap<String, BTreeMap<String, Vec<f32>>>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

impl VectorIndex for InMemoryVectorIndex {
    fn upsert_embedding(
        &self,
        repo_id: &str,
        node_id: &str,
        vector: &[f32],
        _metadata: Option<&serde_json::Value>,
    ) -> Result<()> {
        let mut repos = self.repos.write().unwrap_or_else(|e| e.into_inner());
        repos
            .entry(repo_id.to_string())
            .or_default()
            .insert(node_id.to_string(), vector.to_vec());
        Ok(())
    }

    fn nearest_neighbors(
        &self,
        repo_id: &str,
        query: &[f32],
        top_k: usize,
        score_threshold: Option<f32>,
    ) -> Result<Vec<ScoredNode>> {
        let repos = self.repos.read().unwrap_or_else(|e| e.into_inner());
        let vectors = match repos.get(repo_id) {
            Some(v) => v,
            None => return Ok(Vec::new()),
        };

        let mut scored: Vec<ScoredNode> = vectors
            .iter()
            .map(|(node_id, vector)| ScoredNode {
                node_id: node_id.clone(),
                score: cosine_similarity(query, vector),
            })
            .filter(|s| score_threshold.map(|t| s.score >= t).unwrap_or(true))
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.node_id.cmp(&b.node_id))
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    fn delete_repo(&self, repo_id: &str) -> Result<()> {
        self.repos
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(repo_id);
        Ok(())
    }

    fn delete_all(&self) -> Result<()> {
        self.repos
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = [0.5, 0.5, 0.1];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn cosine_handles_mismatched_or_zero_vectors() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn nearest_ranks_by_similarity() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert_embedding("repo", "close", &[1.0, 0.0], None)
            .unwrap();
        index
            .upsert_embedding("repo", "far", &[0.0, 1.0], None)
            .unwrap();
        index
            .upsert_embedding("repo", "middle", &[1.0, 1.0], None)
            .unwrap();

        let hits = index
            .nearest_neighbors("repo", &[1.0, 0.0], 3, None)
            .unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.node_id.as_str()).collect();
        assert_eq!(ids, vec!["close", "middle", "far"]);
    }

    #[test]
    fn top_k_limits_results() {
        let index = InMemoryVectorIndex::new();
        for i in 0..10 {
            index
                .upsert_embedding("repo", &format!("n{i}"), &[1.0, i as f32], None)
                .unwrap();
        }
        let hits = index
            .nearest_neighbors("repo", &[1.0, 0.0], 3, None)
            .unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn threshold_filters_low_scores() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert_embedding("repo", "close", &[1.0, 0.0], None)
            .unwrap();
        index
            .upsert_embedding("repo", "orthogonal", &[0.0, 1.0], None)
            .unwrap();

        let hits = index
            .nearest_neighbors("repo", &[1.0, 0.0], 5, Some(0.5))
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node_id, "close");
    }

    #[test]
    fn repos_are_isolated() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert_embedding("one", "a", &[1.0, 0.0], None)
            .unwrap();

        assert!(index
            .nearest_neighbors("two", &[1.0, 0.0], 5, None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn upsert_replaces_existing_vector() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert_embedding("repo", "a", &[1.0, 0.0], None)
            .unwrap();
        index
            .upsert_embedding("repo", "a", &[0.0, 1.0], None)
            .unwrap();

        let hits = index
            .nearest_neighbors("repo", &[0.0, 1.0], 1, None)
            .unwrap();
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn delete_repo_and_delete_all() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert_embedding("one", "a", &[1.0], None)
            .unwrap();
        index
            .upsert_embedding("two", "b", &[1.0], None)
            .unwrap();

        index.delete_repo("one").unwrap();
        assert!(index
            .nearest_neighbors("one", &[1.0], 1, None)
            .unwrap()
            .is_empty());
        assert_eq!(
            index.nearest_neighbors("two", &[1.0], 1, None).unwrap().len(),
            1
        );

        index.delete_all().unwrap();
        assert!(index
            .nearest_neighbors("two", &[1.0], 1, None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn equal_scores_break_ties_by_node_id() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert_embedding("repo", "beta", &[1.0, 0.0], None)
            .unwrap();
        index
            .upsert_embedding("repo", "alpha", &[1.0, 0.0], None)
            .unwrap();

        let hits = index
            .nearest_neighbors("repo", &[1.0, 0.0], 2, None)
            .unwrap();
        assert_eq!(hits[0].node_id, "alpha");
        assert_eq!(hits[1].node_id, "beta");
    }
}
