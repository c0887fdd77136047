//! Graph construction: parsed symbol tables → one typed Node/Edge set.
//!
//! Structural pass first (directories, files, symbols under `contains`),
//! then a cross-reference pass resolving `imports`, `invokes`, and
//! `inherits` edges across files. References that cannot be resolved (or
//! resolve ambiguously) are dropped silently: precision over forcing an
//! incorrect edge.
//!
//! Determinism contract: identical file set and content yields an identical
//! Node/Edge set regardless of input order. All intermediate collections are
//! ordered (BTree) and inputs are sorted up front.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::indexer::{FileSymbols, ImportStmt, ParsedFile, SymbolKind};
use crate::types::{symbol_node_id, CodeEdge, CodeNode, EdgeKind, GraphSnapshot, NodeKind, ROOT_ID};

/// Build the complete snapshot for one repository from its parsed files.
pub fn build_graph(files: &[ParsedFile]) -> GraphSnapshot {
    let mut files: Vec<&ParsedFile> = files.iter().collect();
    files.sort_by(|a, b| a.rel_path().cmp(b.rel_path()));

    let mut nodes: BTreeMap<String, CodeNode> = BTreeMap::new();
    let mut edges: BTreeSet<CodeEdge> = BTreeSet::new();

    nodes.insert(
        ROOT_ID.to_string(),
        CodeNode::bare(ROOT_ID, NodeKind::Directory, ROOT_ID),
    );

    // -- structural pass -------------------------------------------------

    for file in &files {
        let rel_path = file.rel_path();
        add_directories(rel_path, &mut nodes, &mut edges);
        let parent_dir = parent_directory(rel_path);

        match file {
            ParsedFile::Python(symbols) => {
                nodes.insert(
                    rel_path.to_string(),
                    CodeNode::bare(rel_path, NodeKind::File, rel_path),
                );
                edges.insert(CodeEdge::new(parent_dir, rel_path, EdgeKind::Contains));
                add_symbols(symbols, &mut nodes, &mut edges);
            }
            ParsedFile::Generic { rel_path, readme } => {
                let mut node = CodeNode::bare(rel_path, NodeKind::GenericFile, rel_path);
                node.code = readme.clone();
                nodes.insert(rel_path.clone(), node);
                edges.insert(CodeEdge::new(parent_dir, rel_path, EdgeKind::Contains));
            }
        }
    }

    // -- cross-reference pass --------------------------------------------

    let python_files: BTreeSet<&str> = files
        .iter()
        .filter_map(|f| match f {
            ParsedFile::Python(s) => Some(s.rel_path.as_str()),
            ParsedFile::Generic { .. } => None,
        })
        .collect();

    // repo-wide name index: last qualname segment -> symbol node ids
    let mut by_name: HashMap<&str, Vec<String>> = HashMap::new();
    for file in &files {
        if let ParsedFile::Python(symbols) = file {
            for sym in &symbols.symbols {
                let name = sym.qualname.rsplit('.').next().unwrap_or(&sym.qualname);
                by_name
                    .entry(name)
                    .or_default()
                    .push(symbol_node_id(&symbols.rel_path, &sym.qualname));
            }
        }
    }

    for file in &files {
        if let ParsedFile::Python(symbols) = file {
            resolve_imports(symbols, &python_files, &nodes, &mut edges);
            resolve_invokes(symbols, &nodes, &by_name, &mut edges);
            resolve_inherits(symbols, &nodes, &by_name, &mut edges);
        }
    }

    GraphSnapshot {
        nodes: nodes.into_values().collect(),
        edges: edges.into_iter().collect(),
    }
}

// ---------------------------------------------------------------------------
// Structural helpers
// ---------------------------------------------------------------------------

fn parent_directory(rel_path: &str) -> String {
    match rel_path.rfind('/') {
        Some(pos) => rel_path[..pos].to_string(),
        None => ROOT_ID.to_string(),
    }
}

/// Emit every ancestor directory of `rel_path` with its `contains` chain.
/// Directories holding no indexed files never appear.
fn add_directories(
    rel_path: &str,
    nodes: &mut BTreeMap<String, CodeNode>,
    edges: &mut BTreeSet<CodeEdge>,
) {
    let parts: Vec<&str> = rel_path.split('/').collect();
    let mut current = String::new();
    // everything but the file name itself
    for part in &parts[..parts.len().saturating_sub(1)] {
        let parent = if current.is_empty() {
            ROOT_ID.to_string()
        } else {
            current.clone()
        };
        if current.is_empty() {
            current = (*part).to_string();
        } else {
            current = format!("{}/{}", current, part);
        }
        nodes
            .entry(current.clone())
            .or_insert_with(|| CodeNode::bare(&current, NodeKind::Directory, &current));
        edges.insert(CodeEdge::new(parent, &current, EdgeKind::Contains));
    }
}

fn add_symbols(
    symbols: &FileSymbols,
    nodes: &mut BTreeMap<String, CodeNode>,
    edges: &mut BTreeSet<CodeEdge>,
) {
    for sym in &symbols.symbols {
        let id = symbol_node_id(&symbols.rel_path, &sym.qualname);
        let kind = match sym.kind {
            SymbolKind::Class => NodeKind::Class,
            SymbolKind::Function => NodeKind::Function,
        };
        nodes.insert(
            id.clone(),
            CodeNode {
                id: id.clone(),
                kind,
                file_path: symbols.rel_path.clone(),
                start_line: Some(sym.start_line),
                end_line: Some(sym.end_line),
                code: Some(sym.code.clone()),
                summary: None,
            },
        );

        let parent_id = match sym.qualname.rfind('.') {
            Some(pos) => symbol_node_id(&symbols.rel_path, &sym.qualname[..pos]),
            None => symbols.rel_path.clone(),
        };
        edges.insert(CodeEdge::new(parent_id, id, EdgeKind::Contains));
    }
}

// ---------------------------------------------------------------------------
// Cross-reference resolution
// ---------------------------------------------------------------------------

/// Turn `a.b.c` into `a/b/c.py` or `a/b/c/__init__.py` within the indexed
/// file set.
fn resolve_module(module: &str, python_files: &BTreeSet<&str>) -> Option<String> {
    if module.is_empty() {
        return None;
    }
    let base = module.replace('.', "/");
    let plain = format!("{}.py", base);
    if python_files.contains(plain.as_str()) {
        return Some(plain);
    }
    let package = format!("{}/__init__.py", base);
    if python_files.contains(package.as_str()) {
        return Some(package);
    }
    None
}

fn resolve_imports(
    symbols: &FileSymbols,
    python_files: &BTreeSet<&str>,
    nodes: &BTreeMap<String, CodeNode>,
    edges: &mut BTreeSet<CodeEdge>,
) {
    let source = symbols.rel_path.as_str();
    for import in &symbols.imports {
        match import {
            ImportStmt::Module { module } => {
                if let Some(target) = resolve_module(module, python_files) {
                    if target != source {
                        edges.insert(CodeEdge::new(source, target, EdgeKind::Imports));
                    }
                }
            }
            ImportStmt::From {
                module,
                names,
                wildcard,
            } => {
                if *wildcard || names.is_empty() {
                    if let Some(target) = resolve_module(module, python_files) {
                        if target != source {
                            edges.insert(CodeEdge::new(source, target, EdgeKind::Imports));
                        }
                    }
                    continue;
                }
                for name in names {
                    // `from pkg import mod` where mod is itself a module
                    let qualified = if module.is_empty() {
                        name.clone()
                    } else {
                        format!("{}.{}", module, name)
                    };
                    if let Some(target) = resolve_module(&qualified, python_files) {
                        if target != source {
                            edges.insert(CodeEdge::new(source, target, EdgeKind::Imports));
                        }
                        continue;
                    }
                    // `from pkg.mod import symbol`; a name that matches
                    // neither a module nor a declared symbol is dropped
                    if let Some(module_file) = resolve_module(module, python_files) {
                        let symbol_id = symbol_node_id(&module_file, name);
                        if nodes.contains_key(&symbol_id) {
                            edges.insert(CodeEdge::new(source, symbol_id, EdgeKind::Imports));
                        }
                    }
                }
            }
        }
    }
}

/// Resolve a referenced name to a symbol node: enclosing scope first
/// (innermost to outermost), then file level, then repository-wide. A
/// repository-wide match is used only when it is unique; ambiguity drops the
/// reference.
fn resolve_symbol_ref(
    file: &str,
    scope: &str,
    name: &str,
    nodes: &BTreeMap<String, CodeNode>,
    by_name: &HashMap<&str, Vec<String>>,
    want: Option<NodeKind>,
) -> Option<String> {
    let kind_ok = |id: &str| match want {
        None => true,
        Some(kind) => nodes.get(id).map(|n| n.kind == kind).unwrap_or(false),
    };

    // enclosing scopes, innermost first: for scope "A.B.f" try "A.B.name",
    // then "A.name"
    let mut prefix = scope;
    while let Some(pos) = prefix.rfind('.') {
        prefix = &prefix[..pos];
        let candidate = symbol_node_id(file, &format!("{}.{}", prefix, name));
        if nodes.contains_key(&candidate) && kind_ok(&candidate) {
            return Some(candidate);
        }
    }

    // file level
    let candidate = symbol_node_id(file, name);
    if nodes.contains_key(&candidate) && kind_ok(&candidate) {
        return Some(candidate);
    }

    // repository-wide, unique matches only
    let matches: Vec<&String> = by_name
        .get(name)
        .map(|ids| ids.iter().filter(|id| kind_ok(id)).collect())
        .unwrap_or_default();
    match matches.as_slice() {
        [only] => Some((*only).clone()),
        _ => None,
    }
}

fn resolve_invokes(
    symbols: &FileSymbols,
    nodes: &BTreeMap<String, CodeNode>,
    by_name: &HashMap<&str, Vec<String>>,
    edges: &mut BTreeSet<CodeEdge>,
) {
    let file = symbols.rel_path.as_str();
    for call in &symbols.calls {
        let source = symbol_node_id(file, &call.scope);
        if !nodes.contains_key(&source) {
            continue;
        }
        if let Some(target) =
            resolve_symbol_ref(file, &call.scope, &call.callee, nodes, by_name, None)
        {
            edges.insert(CodeEdge::new(source, target, EdgeKind::Invokes));
        }
    }
}

fn resolve_inherits(
    symbols: &FileSymbols,
    nodes: &BTreeMap<String, CodeNode>,
    by_name: &HashMap<&str, Vec<String>>,
    edges: &mut BTreeSet<CodeEdge>,
) {
    let file = symbols.rel_path.as_str();
    for base in &symbols.bases {
        let source = symbol_node_id(file, &base.class_qualname);
        if !nodes.contains_key(&source) {
            continue;
        }
        if let Some(target) = resolve_symbol_ref(
            file,
            &base.class_qualname,
            &base.base,
            nodes,
            by_name,
            Some(NodeKind::Class),
        ) {
            if target != source {
                edges.insert(CodeEdge::new(source, target, EdgeKind::Inherits));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
