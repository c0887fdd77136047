//! Core domain types for RepoGraph.
//!
//! The node/edge vocabulary is a closed set per schema version: traversal
//! filters stay exhaustively checkable, and adding a kind is a deliberate
//! schema change rather than a new runtime string.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// NodeKind
// ---------------------------------------------------------------------------

/// Kinds of nodes in the code graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Directory,
    File,
    Class,
    Function,
    GenericFile,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::File => "file",
            Self::Class => "class",
            Self::Function => "function",
            Self::GenericFile => "generic_file",
        }
    }

    /// Parse from a string (lenient on common aliases).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s {
            "directory" | "dir" => Some(Self::Directory),
            "file" => Some(Self::File),
            "class" => Some(Self::Class),
            "function" | "func" => Some(Self::Function),
            "generic_file" | "generic" => Some(Self::GenericFile),
            _ => None,
        }
    }

    /// All kinds, for iteration.
    pub const ALL: [NodeKind; 5] = [
        NodeKind::Directory,
        NodeKind::File,
        NodeKind::Class,
        NodeKind::Function,
        NodeKind::GenericFile,
    ];
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EdgeKind
// ---------------------------------------------------------------------------

/// Kinds of directed edges between nodes.
///
/// Storage is always directed. "Undirected" exists only as a traversal-time
/// relaxation, never as a storage property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Contains,
    Imports,
    Invokes,
    Inherits,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Imports => "imports",
            Self::Invokes => "invokes",
            Self::Inherits => "inherits",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s {
            "contains" => Some(Self::Contains),
            "imports" => Some(Self::Imports),
            "invokes" | "calls" => Some(Self::Invokes),
            "inherits" | "extends" => Some(Self::Inherits),
            _ => None,
        }
    }

    /// All kinds, for iteration and "no filter" traversal configs.
    pub const ALL: [EdgeKind; 4] = [
        EdgeKind::Contains,
        EdgeKind::Imports,
        EdgeKind::Invokes,
        EdgeKind::Inherits,
    ];
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CodeNode
// ---------------------------------------------------------------------------

/// A node in the code graph.
///
/// One fixed record shape for every kind; fields that do not apply to a kind
/// (line ranges on directories, code on generic files) are simply `None`.
/// Embedding vectors are owned by the vector index, keyed by node id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl CodeNode {
    /// A node with no line range, code, or summary.
    pub fn bare(id: impl Into<String>, kind: NodeKind, file_path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            file_path: file_path.into(),
            start_line: None,
            end_line: None,
            code: None,
            summary: None,
        }
    }
}

// ---------------------------------------------------------------------------
// CodeEdge
// ---------------------------------------------------------------------------

/// A typed directed edge between two nodes of the same snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CodeEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
}

impl CodeEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: EdgeKind) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
        }
    }
}

// ---------------------------------------------------------------------------
// GraphSnapshot
// ---------------------------------------------------------------------------

/// The complete node/edge set for one repository at one index time.
///
/// Built wholesale, published atomically, never merged or mutated; only the
/// optional annotation fields on nodes may be filled in after publication.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<CodeNode>,
    pub edges: Vec<CodeEdge>,
}

impl GraphSnapshot {
    pub fn node(&self, id: &str) -> Option<&CodeNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

// ---------------------------------------------------------------------------
// Node identity helpers
// ---------------------------------------------------------------------------

/// Id of the repository root directory node.
pub const ROOT_ID: &str = "/";

/// Build the node id for a declared symbol: `{file_path}:{qualname}`.
///
/// Reproducible from identical input content, independent of build order.
pub fn symbol_node_id(file_path: &str, qualname: &str) -> String {
    format!("{}:{}", file_path, qualname)
}

// ---------------------------------------------------------------------------
// Query contract
// ---------------------------------------------------------------------------

/// A question against an indexed repository, plus optional traversal
/// overrides that replace the strategy preset field-by-field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    pub repo_id: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub depth: Option<u32>,
    #[serde(default)]
    pub edge_types: Option<Vec<EdgeKind>>,
    #[serde(default)]
    pub include_node_types: Option<Vec<NodeKind>>,
    #[serde(default)]
    pub directed: Option<bool>,
    #[serde(default)]
    pub include_incoming: Option<bool>,
    #[serde(default)]
    pub include_outgoing: Option<bool>,
}

/// The answer plus the exact context records handed to the answering model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub context: Vec<ContextRecord>,
}

/// One relationship entry on a context record. Targets are always members of
/// the same context set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub target: String,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
}

/// One ranked entry of assembled context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Similarity score of the seed that first reached this node.
    pub score: f32,
    /// Minimal hop distance from the nearest seed.
    pub hops: u32,
    pub relationships: Vec<Relationship>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(NodeKind::Directory, "directory" ; "nk_directory")]
    #[test_case(NodeKind::File, "file" ; "nk_file")]
    #[test_case(NodeKind::Class, "class" ; "nk_class")]
    #[test_case(NodeKind::Function, "function" ; "nk_function")]
    #[test_case(NodeKind::GenericFile, "generic_file" ; "nk_generic_file")]
    fn node_kind_as_str_expected(kind: NodeKind, expected: &str) {
        assert_eq!(kind.as_str(), expected);
    }

    #[test_case(EdgeKind::Contains, "contains" ; "ek_contains")]
    #[test_case(EdgeKind::Imports, "imports" ; "ek_imports")]
    #[test_case(EdgeKind::Invokes, "invokes" ; "ek_invokes")]
    #[test_case(EdgeKind::Inherits, "inherits" ; "ek_inherits")]
    fn edge_kind_as_str_expected(kind: EdgeKind, expected: &str) {
        assert_eq!(kind.as_str(), expected);
    }

    #[test]
    fn node_kind_roundtrip() {
        for kind in NodeKind::ALL {
            assert_eq!(NodeKind::from_str_loose(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn edge_kind_roundtrip() {
        for kind in EdgeKind::ALL {
            assert_eq!(EdgeKind::from_str_loose(kind.as_str()), Some(kind));
        }
    }

    #[test_case("calls", EdgeKind::Invokes ; "alias_calls")]
    #[test_case("extends", EdgeKind::Inherits ; "alias_extends")]
    fn edge_kind_aliases(input: &str, expected: EdgeKind) {
        assert_eq!(EdgeKind::from_str_loose(input), Some(expected));
    }

    #[test_case("rel" ; "ek_unknown_rel")]
    #[test_case("" ; "ek_unknown_empty")]
    #[test_case("CONTAINS" ; "ek_unknown_uppercase")]
    fn edge_kind_from_str_loose_returns_none(input: &str) {
        assert_eq!(EdgeKind::from_str_loose(input), None);
    }

    #[test]
    fn display_matches_as_str() {
        for kind in NodeKind::ALL {
            assert_eq!(format!("{kind}"), kind.as_str());
        }
        for kind in EdgeKind::ALL {
            assert_eq!(format!("{kind}"), kind.as_str());
        }
    }

    #[test]
    fn symbol_node_id_format() {
        assert_eq!(
            symbol_node_id("src/app.py", "Service.run"),
            "src/app.py:Service.run"
        );
    }

    #[test]
    fn node_serde_uses_type_key_and_skips_none() {
        let node = CodeNode::bare("src/app.py", NodeKind::File, "src/app.py");
        let json = serde_json::to_string(&node).unwrap();
        assert!(json.contains("\"type\":\"file\""));
        assert!(!json.contains("start_line"));
        assert!(!json.contains("summary"));
    }

    #[test]
    fn node_serde_roundtrip_with_all_fields() {
        let node = CodeNode {
            id: "src/app.py:main".to_string(),
            kind: NodeKind::Function,
            file_path: "src/app.py".to_string(),
            start_line: Some(3),
            end_line: Some(9),
            code: Some("def main():\n    pass".to_string()),
            summary: Some("Entry point.".to_string()),
        };
        let json = serde_json::to_string(&node).unwrap();
        let back: CodeNode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn edge_serde_roundtrip() {
        let edge = CodeEdge::new("a.py", "b.py", EdgeKind::Imports);
        let json = serde_json::to_string(&edge).unwrap();
        assert!(json.contains("\"type\":\"imports\""));
        let back: CodeEdge = serde_json::from_str(&json).unwrap();
        assert_eq!(back, edge);
    }

    #[test]
    fn ask_request_optional_fields_default_to_none() {
        let req: AskRequest =
            serde_json::from_str(r#"{"question": "what does main do?", "repo_id": "demo"}"#)
                .unwrap();
        assert_eq!(req.question, "what does main do?");
        assert!(req.strategy.is_none());
        assert!(req.depth.is_none());
        assert!(req.edge_types.is_none());
        assert!(req.directed.is_none());
    }

    #[test]
    fn ask_request_parses_edge_type_names() {
        let req: AskRequest = serde_json::from_str(
            r#"{"question": "q", "repo_id": "r", "edge_types": ["invokes", "inherits"]}"#,
        )
        .unwrap();
        assert_eq!(
            req.edge_types,
            Some(vec![EdgeKind::Invokes, EdgeKind::Inherits])
        );
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn node_kind_from_str_loose_never_panics(s in "\\PC{0,30}") {
            let _ = NodeKind::from_str_loose(&s);
        }

        #[test]
        fn edge_kind_from_str_loose_never_panics(s in "\\PC{0,30}") {
            let _ = EdgeKind::from_str_loose(&s);
        }

        #[test]
        fn symbol_node_id_keeps_both_parts(file in "[a-z/]{1,20}", name in "[A-Za-z_.]{1,20}") {
            let id = symbol_node_id(&file, &name);
            prop_assert!(id.starts_with(&file));
            prop_assert!(id.ends_with(&name));
        }
    }
}
