//! Retrieval strategies: named traversal presets and override resolution.
//!
//! Each strategy maps to a preset traversal configuration: pure data in one
//! table, resolved once per request. Explicit request overrides replace
//! preset values field-by-field. The strategy set is fixed; an unrecognized
//! name is rejected before any traversal runs.

use serde::{Deserialize, Serialize};

use crate::error::{RepoGraphError, Result};
use crate::types::{AskRequest, EdgeKind, NodeKind};

/// Depth bounds. Out-of-range requests are clamped, not rejected: a
/// documented leniency for the number of hops.
pub const MIN_DEPTH: u32 = 1;
pub const MAX_DEPTH: u32 = 5;

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// The fixed set of recognized strategy names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Undirected BFS up to 2 hops, any edge kind.
    DefaultBfsAll,
    /// Direct callers and callees only (1 hop on `invokes`).
    InvokesOnly,
    /// The seed and its immediate container (1 incoming `contains` hop).
    ShallowContains,
    /// Undirected BFS up to 2 hops, keeping only file and function nodes.
    FileAndFunctionOnly,
    /// Directed BFS up to 3 hops following `invokes` and `inherits`.
    DeepLogicChain,
    /// Directed BFS up to 2 hops following `inherits`.
    ClassHierarchy,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DefaultBfsAll => "default_bfs_all",
            Self::InvokesOnly => "invokes_only",
            Self::ShallowContains => "shallow_contains",
            Self::FileAndFunctionOnly => "file_and_function_only",
            Self::DeepLogicChain => "deep_logic_chain",
            Self::ClassHierarchy => "class_hierarchy",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "default_bfs_all" => Some(Self::DefaultBfsAll),
            "invokes_only" => Some(Self::InvokesOnly),
            "shallow_contains" => Some(Self::ShallowContains),
            "file_and_function_only" => Some(Self::FileAndFunctionOnly),
            "deep_logic_chain" => Some(Self::DeepLogicChain),
            "class_hierarchy" => Some(Self::ClassHierarchy),
            _ => None,
        }
    }

    pub const ALL: [Strategy; 6] = [
        Strategy::DefaultBfsAll,
        Strategy::InvokesOnly,
        Strategy::ShallowContains,
        Strategy::FileAndFunctionOnly,
        Strategy::DeepLogicChain,
        Strategy::ClassHierarchy,
    ];
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TraversalConfig
// ---------------------------------------------------------------------------

/// One fully resolved traversal configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TraversalConfig {
    pub depth: u32,
    pub edge_kinds: Vec<EdgeKind>,
    /// Post-filter on returned node kinds; `None` keeps everything.
    pub include_node_kinds: Option<Vec<NodeKind>>,
    pub directed: bool,
    pub include_incoming: bool,
    pub include_outgoing: bool,
}

/// The preset configuration for a strategy. Pure data; no behavior hangs
/// off the strategy name anywhere else.
pub fn preset(strategy: Strategy) -> TraversalConfig {
    match strategy {
        Strategy::DefaultBfsAll => TraversalConfig {
            depth: 2,
            edge_kinds: EdgeKind::ALL.to_vec(),
            include_node_kinds: None,
            directed: false,
            include_incoming: true,
            include_outgoing: true,
        },
        Strategy::InvokesOnly => TraversalConfig {
            depth: 1,
            edge_kinds: vec![EdgeKind::Invokes],
            include_node_kinds: None,
            directed: true,
            include_incoming: true,
            include_outgoing: true,
        },
        Strategy::ShallowContains => TraversalConfig {
            depth: 1,
            edge_kinds: vec![EdgeKind::Contains],
            include_node_kinds: None,
            directed: true,
            include_incoming: true,
            include_outgoing: false,
        },
        Strategy::FileAndFunctionOnly => TraversalConfig {
            depth: 2,
            edge_kinds: EdgeKind::ALL.to_vec(),
            include_node_kinds: Some(vec![NodeKind::File, NodeKind::Function]),
            directed: false,
            include_incoming: true,
            include_outgoing: true,
        },
        Strategy::DeepLogicChain => TraversalConfig {
            depth: 3,
            edge_kinds: vec![EdgeKind::Invokes, EdgeKind::Inherits],
            include_node_kinds: None,
            directed: true,
            include_incoming: false,
            include_outgoing: true,
        },
        Strategy::ClassHierarchy => TraversalConfig {
            depth: 2,
            edge_kinds: vec![EdgeKind::Inherits],
            include_node_kinds: None,
            directed: true,
            include_incoming: false,
            include_outgoing: true,
        },
    }
}

// ---------------------------------------------------------------------------
// Overrides
// ---------------------------------------------------------------------------

/// Explicit per-request overrides. Every present field replaces the preset
/// value wholesale.
#[derive(Debug, Clone, Default)]
pub struct TraversalOverrides {
    pub depth: Option<u32>,
    pub edge_kinds: Option<Vec<EdgeKind>>,
    pub include_node_kinds: Option<Vec<NodeKind>>,
    pub directed: Option<bool>,
    pub include_incoming: Option<bool>,
    pub include_outgoing: Option<bool>,
}

impl From<&AskRequest> for TraversalOverrides {
    fn from(req: &AskRequest) -> Self {
        Self {
            depth: req.depth,
            edge_kinds: req.edge_types.clone(),
            include_node_kinds: req.include_node_types.clone(),
            directed: req.directed,
            include_incoming: req.include_incoming,
            include_outgoing: req.include_outgoing,
        }
    }
}

/// Resolve a strategy name plus overrides into one traversal configuration.
///
/// Fails with [`RepoGraphError::InvalidStrategy`] for names outside the
/// documented set. Depth (from preset or override) is clamped to
/// `[MIN_DEPTH, MAX_DEPTH]`.
pub fn resolve(name: &str, overrides: &TraversalOverrides) -> Result<TraversalConfig> {
    let strategy =
        Strategy::from_name(name).ok_or_else(|| RepoGraphError::InvalidStrategy(name.to_string()))?;

    let mut config = preset(strategy);
    if let Some(depth) = overrides.depth {
        config.depth = depth;
    }
    if let Some(ref kinds) = overrides.edge_kinds {
        config.edge_kinds = kinds.clone();
    }
    if let Some(ref kinds) = overrides.include_node_kinds {
        config.include_node_kinds = Some(kinds.clone());
    }
    if let Some(directed) = overrides.directed {
        config.directed = directed;
    }
    if let Some(incoming) = overrides.include_incoming {
        config.include_incoming = incoming;
    }
    if let Some(outgoing) = overrides.include_outgoing {
        config.include_outgoing = outgoing;
    }

    config.depth = config.depth.clamp(MIN_DEPTH, MAX_DEPTH);
    Ok(config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
