//! Context assembly: rank, truncate, and package traversal output.
//!
//! A pure ranking/packaging step with no external calls. Ranking is
//! (hop distance ascending, seed similarity descending, discovery order);
//! truncation keeps the top-ranked prefix, but every original seed survives
//! regardless of budget: the traversal's "extra" discoveries are trimmed
//! first.

use std::collections::BTreeSet;

use crate::graph::traversal::TraversalOutcome;
use crate::types::{ContextRecord, Relationship};

/// Assemble ranked context records from a traversal outcome.
///
/// At most `max_records` entries are returned, unless the seed count alone
/// exceeds the budget, in which case every seed is still kept.
pub fn assemble(outcome: &TraversalOutcome, max_records: usize) -> Vec<ContextRecord> {
    let mut ranked: Vec<usize> = (0..outcome.nodes.len()).collect();
    ranked.sort_by(|&a, &b| {
        let da = &outcome.nodes[a];
        let db = &outcome.nodes[b];
        da.hops
            .cmp(&db.hops)
            .then_with(|| db.score.total_cmp(&da.score))
            .then_with(|| da.order.cmp(&db.order))
    });

    let mut rank_of = vec![0usize; outcome.nodes.len()];
    for (pos, &idx) in ranked.iter().enumerate() {
        rank_of[idx] = pos;
    }

    // seeds always survive; non-seeds fill the remaining budget in rank order
    let mut kept: Vec<usize> = Vec::new();
    for &idx in &ranked {
        if outcome.nodes[idx].is_seed {
            kept.push(idx);
        }
    }
    for &idx in &ranked {
        if kept.len() >= max_records {
            break;
        }
        if !outcome.nodes[idx].is_seed {
            kept.push(idx);
        }
    }
    // restore overall rank order after the two passes
    kept.sort_by_key(|&idx| rank_of[idx]);

    let kept_ids: BTreeSet<&str> = kept
        .iter()
        .map(|&idx| outcome.nodes[idx].node.id.as_str())
        .collect();

    kept.iter()
        .map(|&idx| {
            let discovered = &outcome.nodes[idx];
            let node = &discovered.node;
            let relationships: Vec<Relationship> = outcome
                .edges
                .iter()
                .filter(|e| e.source == node.id && kept_ids.contains(e.target.as_str()))
                .map(|e| Relationship {
                    target: e.target.clone(),
                    kind: e.kind,
                })
                .collect();

            ContextRecord {
                id: node.id.clone(),
                kind: node.kind,
                file_path: node.file_path.clone(),
                start_line: node.start_line,
                end_line: node.end_line,
                code: node.code.clone(),
                summary: node.summary.clone(),
                score: discovered.score,
                hops: discovered.hops,
                relationships,
            }
        })
        .collect()
}

/// Render assembled context into the prompt text handed to the answering
/// model.
pub fn render_context(records: &[ContextRecord]) -> String {
    let mut lines: Vec<String> = Vec::new();
    for record in records {
        lines.push(format!("--- Node {} ({}) ---", record.id, record.kind));
        let range = match (record.start_line, record.end_line) {
            (Some(start), Some(end)) => format!("{}-{}", start, end),
            _ => "?".to_string(),
        };
        lines.push(format!("File: {}, Lines: {}", record.file_path, range));
        if let Some(ref summary) = record.summary {
            lines.push(format!("Summary: {}", summary));
        }
        match record.code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => lines.push(format!("Code:\n{}", code)),
            _ => lines.push("Code: [Not available]".to_string()),
        }
        for rel in &record.relationships {
            lines.push(format!("-> {} -> Node {}", rel.kind, rel.target));
        }
        lines.push(String::new());
    }
    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::traversal::DiscoveredNode;
    use crate::types::{CodeEdge, CodeNode, EdgeKind, NodeKind};

    fn discovered(id: &str, hops: u32, score: f32, order: usize, is_seed: bool) -> DiscoveredNode {
        DiscoveredNode {
            node: CodeNode::bare(id, NodeKind::Function, "f.py"),
            hops,
            score,
            order,
            is_seed,
        }
    }

    fn outcome(nodes: Vec<DiscoveredNode>, edges: Vec<CodeEdge>) -> TraversalOutcome {
        TraversalOutcome { nodes, edges }
    }

    fn record_ids(records: &[ContextRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn ranks_by_hop_then_score_then_order() {
        let out = outcome(
            vec![
                discovered("far", 2, 0.9, 0, false),
                discovered("near_low", 1, 0.2, 1, false),
                discovered("near_high", 1, 0.8, 2, false),
                discovered("seed", 0, 0.5, 3, true),
            ],
            vec![],
        );
        let records = assemble(&out, 10);
        assert_eq!(
            record_ids(&records),
            vec!["seed", "near_high", "near_low", "far"]
        );
    }

    #[test]
    fn equal_rank_breaks_ties_by_discovery_order() {
        let out = outcome(
            vec![
                discovered("second", 1, 0.5, 7, false),
                discovered("first", 1, 0.5, 3, false),
            ],
            vec![],
        );
        let records = assemble(&out, 10);
        assert_eq!(record_ids(&records), vec!["first", "second"]);
    }

    #[test]
    fn truncation_trims_non_seeds_first() {
        let out = outcome(
            vec![
                discovered("seed_a", 0, 0.9, 0, true),
                discovered("seed_b", 0, 0.1, 1, true),
                discovered("extra_1", 1, 0.9, 2, false),
                discovered("extra_2", 2, 0.9, 3, false),
            ],
            vec![],
        );
        let records = assemble(&out, 3);
        assert_eq!(record_ids(&records), vec!["seed_a", "seed_b", "extra_1"]);
    }

    #[test]
    fn all_seeds_survive_even_when_budget_is_smaller() {
        let out = outcome(
            vec![
                discovered("seed_a", 0, 0.9, 0, true),
                discovered("seed_b", 0, 0.8, 1, true),
                discovered("seed_c", 0, 0.7, 2, true),
                discovered("extra", 1, 0.9, 3, false),
            ],
            vec![],
        );
        let records = assemble(&out, 2);
        assert_eq!(record_ids(&records), vec!["seed_a", "seed_b", "seed_c"]);
    }

    #[test]
    fn relationships_are_restricted_to_kept_targets() {
        let out = outcome(
            vec![
                discovered("seed", 0, 0.9, 0, true),
                discovered("kept", 1, 0.9, 1, false),
                discovered("trimmed", 2, 0.1, 2, false),
            ],
            vec![
                CodeEdge::new("seed", "kept", EdgeKind::Invokes),
                CodeEdge::new("seed", "trimmed", EdgeKind::Invokes),
            ],
        );
        let records = assemble(&out, 2);
        assert_eq!(record_ids(&records), vec!["seed", "kept"]);
        assert_eq!(
            records[0].relationships,
            vec![Relationship {
                target: "kept".to_string(),
                kind: EdgeKind::Invokes,
            }]
        );
    }

    #[test]
    fn empty_outcome_yields_empty_context() {
        let records = assemble(&TraversalOutcome::default(), 10);
        assert!(records.is_empty());
    }

    #[test]
    fn records_carry_node_fields_and_traversal_metadata() {
        let mut node = CodeNode::bare("f.py:run", NodeKind::Function, "f.py");
        node.start_line = Some(4);
        node.end_line = Some(9);
        node.code = Some("def run():\n    pass".to_string());
        node.summary = Some("Runs.".to_string());
        let out = outcome(
            vec![DiscoveredNode {
                node,
                hops: 1,
                score: 0.42,
                order: 0,
                is_seed: false,
            }],
            vec![],
        );

        let records = assemble(&out, 10);
        let record = &records[0];
        assert_eq!(record.kind, NodeKind::Function);
        assert_eq!(record.start_line, Some(4));
        assert_eq!(record.hops, 1);
        assert_eq!(record.score, 0.42);
        assert_eq!(record.summary.as_deref(), Some("Runs."));
    }

    #[test]
    fn render_includes_ids_lines_code_and_relationships() {
        let out = outcome(
            vec![
                {
                    let mut d = discovered("a.py:f", 0, 0.9, 0, true);
                    d.node.start_line = Some(1);
                    d.node.end_line = Some(2);
                    d.node.code = Some("def f():\n    g()".to_string());
                    d
                },
                discovered("a.py:g", 1, 0.9, 1, false),
            ],
            vec![CodeEdge::new("a.py:f", "a.py:g", EdgeKind::Invokes)],
        );
        let text = render_context(&assemble(&out, 10));

        assert!(text.contains("--- Node a.py:f (function) ---"));
        assert!(text.contains("File: f.py, Lines: 1-2"));
        assert!(text.contains("def f():"));
        assert!(text.contains("-> invokes -> Node a.py:g"));
        assert!(text.contains("Code: [Not available]"));
    }
}
