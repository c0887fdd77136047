//! Multi-source bounded breadth-first traversal.
//!
//! Expands a seed set over a [`GraphAccess`] implementation under a resolved
//! traversal configuration. Pure and synchronous: the only I/O happens
//! inside the accessor, so a traversal can be dropped at any await-free
//! point with no cleanup obligations.

use std::collections::{BTreeSet, HashMap, VecDeque};

use crate::error::Result;
use crate::retrieval::strategy::TraversalConfig;
use crate::types::{CodeEdge, CodeNode, EdgeKind};

// ---------------------------------------------------------------------------
// Access contract
// ---------------------------------------------------------------------------

/// Which edges of a node to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Edges whose `source` is the node.
    Outgoing,
    /// Edges whose `target` is the node.
    Incoming,
}

/// Read access to one repository's published snapshot.
///
/// Implementations must return edges in a stable order; traversal results
/// (discovery order, tie-breaks) inherit their determinism from it.
pub trait GraphAccess {
    fn neighbors(
        &self,
        node_id: &str,
        edge_kinds: &[EdgeKind],
        direction: Direction,
    ) -> Result<Vec<CodeEdge>>;

    fn node(&self, node_id: &str) -> Result<Option<CodeNode>>;
}

// ---------------------------------------------------------------------------
// Inputs / outputs
// ---------------------------------------------------------------------------

/// A traversal starting point chosen by similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct Seed {
    pub node_id: String,
    pub score: f32,
}

/// One node discovered by the traversal.
#[derive(Debug, Clone)]
pub struct DiscoveredNode {
    pub node: CodeNode,
    /// Minimal hop distance from the nearest seed.
    pub hops: u32,
    /// Similarity score of the seed whose expansion first reached this node.
    pub score: f32,
    /// Stable discovery index.
    pub order: usize,
    pub is_seed: bool,
}

/// The traversal result: discovered nodes plus the permitted edges whose
/// endpoints both survived to the output set.
#[derive(Debug, Clone, Default)]
pub struct TraversalOutcome {
    pub nodes: Vec<DiscoveredNode>,
    pub edges: Vec<CodeEdge>,
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Visit {
    hops: u32,
    score: f32,
    order: usize,
    is_seed: bool,
}

/// Multi-source bounded BFS.
///
/// Seeds enter the frontier at hop 0 in deterministic order (descending
/// similarity, id as tie-break), which fixes which seed's score a node
/// reached at equal distance reports. Each node's hop distance is set the
/// first time it is reached; BFS explores in non-decreasing hop order, so
/// first-reached is minimal. A visited node is never re-expanded.
///
/// The node-kind filter is a post-filter only: an excluded node is still
/// discovered and expanded through (a pure conduit, e.g. a directory), but
/// it is omitted from the returned result. Seeds are exempt: a seed always
/// appears in the output.
pub fn traverse(
    access: &impl GraphAccess,
    seeds: &[Seed],
    config: &TraversalConfig,
) -> Result<TraversalOutcome> {
    if seeds.is_empty() {
        return Ok(TraversalOutcome::default());
    }

    let mut ordered: Vec<&Seed> = seeds.iter().collect();
    ordered.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.node_id.cmp(&b.node_id))
    });

    let mut visited: HashMap<String, Visit> = HashMap::new();
    let mut frontier: VecDeque<(String, u32, f32)> = VecDeque::new();
    let mut seen_edges: BTreeSet<CodeEdge> = BTreeSet::new();
    let mut order = 0usize;

    for seed in ordered {
        if visited.contains_key(&seed.node_id) {
            continue;
        }
        if access.node(&seed.node_id)?.is_none() {
            tracing::warn!(node_id = %seed.node_id, "seed not present in graph, skipping");
            continue;
        }
        visited.insert(
            seed.node_id.clone(),
            Visit {
                hops: 0,
                score: seed.score,
                order,
                is_seed: true,
            },
        );
        order += 1;
        frontier.push_back((seed.node_id.clone(), 0, seed.score));
    }

    let directions: Vec<Direction> = if !config.directed {
        // undirected relaxation: both directions regardless of the flags
        vec![Direction::Outgoing, Direction::Incoming]
    } else {
        let mut dirs = Vec::new();
        if config.include_outgoing {
            dirs.push(Direction::Outgoing);
        }
        if config.include_incoming {
            dirs.push(Direction::Incoming);
        }
        dirs
    };

    while let Some((node_id, hops, score)) = frontier.pop_front() {
        if hops >= config.depth {
            continue;
        }
        for direction in &directions {
            let edges = access.neighbors(&node_id, &config.edge_kinds, *direction)?;
            for edge in edges {
                let neighbor = match direction {
                    Direction::Outgoing => edge.target.clone(),
                    Direction::Incoming => edge.source.clone(),
                };
                seen_edges.insert(edge);
                if !visited.contains_key(&neighbor) {
                    visited.insert(
                        neighbor.clone(),
                        Visit {
                            hops: hops + 1,
                            score,
                            order,
                            is_seed: false,
                        },
                    );
                    order += 1;
                    frontier.push_back((neighbor, hops + 1, score));
                }
            }
        }
    }

    // materialize in discovery order, applying the node-kind post-filter
    let mut entries: Vec<(&String, &Visit)> = visited.iter().collect();
    entries.sort_by_key(|(_, v)| v.order);

    let mut nodes = Vec::with_capacity(entries.len());
    for (id, visit) in entries {
        let node = match access.node(id)? {
            Some(n) => n,
            None => continue,
        };
        let kept = visit.is_seed
            || match &config.include_node_kinds {
                None => true,
                Some(kinds) => kinds.contains(&node.kind),
            };
        if kept {
            nodes.push(DiscoveredNode {
                node,
                hops: visit.hops,
                score: visit.score,
                order: visit.order,
                is_seed: visit.is_seed,
            });
        }
    }

    let included: BTreeSet<&str> = nodes.iter().map(|d| d.node.id.as_str()).collect();
    let edges = seen_edges
        .into_iter()
        .filter(|e| included.contains(e.source.as_str()) && included.contains(e.target.as_str()))
        .collect();

    Ok(TraversalOutcome { nodes, edges })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
