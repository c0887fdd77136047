//! Annotation pass: summaries and embeddings for a published snapshot.
//!
//! Runs after publication: topology is already immutable, only the
//! optional per-node fields get filled in. Work is parallelized across
//! nodes under a concurrency bound to respect external rate limits. One
//! node's failure is isolated: it is logged as a partial-annotation warning
//! and never aborts the pass or invalidates other nodes.

use std::collections::HashMap;

use futures::StreamExt;

use crate::llm::{build_embedding_input, ChildPreview, Embedder, Summarizer, SummaryContext};
use crate::store::GraphStore;
use crate::types::{CodeNode, EdgeKind, GraphSnapshot, NodeKind};
use crate::vector::VectorIndex;

/// Outcome counters for one annotation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotationReport {
    pub summarized: usize,
    pub embedded: usize,
    /// Nodes left without a summary or embedding. Non-fatal by design.
    pub failed: usize,
}

/// Annotate every node of `snapshot`: generate a summary, persist it via
/// the graph store, embed the node, and upsert the vector.
pub async fn annotate_graph(
    repo_id: &str,
    snapshot: &GraphSnapshot,
    store: &dyn GraphStore,
    vectors: &dyn VectorIndex,
    summarizer: &dyn Summarizer,
    embedder: &dyn Embedder,
    concurrency: usize,
) -> AnnotationReport {
    let readme = find_readme_text(snapshot);
    let contexts = build_contexts(snapshot, &readme);

    let work: Vec<(CodeNode, SummaryContext)> = snapshot
        .nodes
        .iter()
        .map(|node| {
            let ctx = contexts.get(node.id.as_str()).cloned().unwrap_or_default();
            (node.clone(), ctx)
        })
        .collect();

    let outcomes: Vec<(bool, bool)> = futures::stream::iter(work)
        .map(|(node, ctx)| {
            annotate_node(repo_id, node, ctx, store, vectors, summarizer, embedder)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut report = AnnotationReport::default();
    for (summarized, embedded) in outcomes {
        if summarized {
            report.summarized += 1;
        }
        if embedded {
            report.embedded += 1;
        }
        if !summarized || !embedded {
            report.failed += 1;
        }
    }
    report
}

/// Annotate a single node. Returns (summary persisted, embedding persisted).
async fn annotate_node(
    repo_id: &str,
    node: CodeNode,
    ctx: SummaryContext,
    store: &dyn GraphStore,
    vectors: &dyn VectorIndex,
    summarizer: &dyn Summarizer,
    embedder: &dyn Embedder,
) -> (bool, bool) {
    let mut annotated = node.clone();

    let summarized = match summarizer.summarize(&node, &ctx).await {
        Ok(summary) => match store.set_summary(repo_id, &node.id, &summary) {
            Ok(()) => {
                annotated.summary = Some(summary);
                true
            }
            Err(err) => {
                tracing::warn!(node_id = %node.id, error = %err, "failed to persist summary");
                false
            }
        },
        Err(err) => {
            tracing::warn!(node_id = %node.id, error = %err, "summary generation failed");
            false
        }
    };

    // embed the summary when we have one, the code otherwise
    let input = build_embedding_input(&annotated);
    let embedded = match embedder.embed(&input).await {
        Ok(vector) => {
            let metadata = serde_json::json!({
                "type": annotated.kind.as_str(),
                "file_path": annotated.file_path,
            });
            match vectors.upsert_embedding(repo_id, &node.id, &vector, Some(&metadata)) {
                Ok(()) => true,
                Err(err) => {
                    tracing::warn!(node_id = %node.id, error = %err, "failed to persist embedding");
                    false
                }
            }
        }
        Err(err) => {
            tracing::warn!(node_id = %node.id, error = %err, "embedding failed");
            false
        }
    };

    (summarized, embedded)
}

// ---------------------------------------------------------------------------
// Context construction
// ---------------------------------------------------------------------------

fn find_readme_text(snapshot: &GraphSnapshot) -> String {
    snapshot
        .nodes
        .iter()
        .find(|n| {
            n.kind == NodeKind::GenericFile
                && n.file_path
                    .rsplit('/')
                    .next()
                    .unwrap_or("")
                    .to_lowercase()
                    .starts_with("readme")
        })
        .and_then(|n| n.code.clone())
        .unwrap_or_default()
}

/// Precompute each node's summary context from the snapshot: symbol
/// siblings for functions/classes, contained children for files and
/// directories.
fn build_contexts<'a>(
    snapshot: &'a GraphSnapshot,
    readme: &str,
) -> HashMap<&'a str, SummaryContext> {
    let by_id: HashMap<&str, &CodeNode> =
        snapshot.nodes.iter().map(|n| (n.id.as_str(), n)).collect();

    let mut children_of: HashMap<&str, Vec<&CodeNode>> = HashMap::new();
    for edge in &snapshot.edges {
        if edge.kind != EdgeKind::Contains {
            continue;
        }
        if let Some(child) = by_id.get(edge.target.as_str()) {
            children_of
                .entry(edge.source.as_str())
                .or_default()
                .push(child);
        }
    }

    let preview = |node: &CodeNode| ChildPreview {
        id: node.id.clone(),
        code: node.code.clone(),
    };

    let mut contexts = HashMap::new();
    for node in &snapshot.nodes {
        let mut ctx = SummaryContext {
            readme: readme.to_string(),
            ..Default::default()
        };
        match node.kind {
            NodeKind::Function | NodeKind::Class => {
                // symbol siblings: other symbols directly under the same file
                ctx.siblings = children_of
                    .get(node.file_path.as_str())
                    .map(|children| {
                        children
                            .iter()
                            .filter(|c| {
                                c.id != node.id
                                    && matches!(c.kind, NodeKind::Function | NodeKind::Class)
                            })
                            .map(|c| preview(c))
                            .collect()
                    })
                    .unwrap_or_default();
            }
            NodeKind::File | NodeKind::Directory => {
                ctx.children = children_of
                    .get(node.id.as_str())
                    .map(|children| children.iter().map(|c| preview(c)).collect())
                    .unwrap_or_default();
            }
            NodeKind::GenericFile => {}
        }
        contexts.insert(node.id.as_str(), ctx);
    }
    contexts
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
