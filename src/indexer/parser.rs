//! Python symbol extraction via tree-sitter.
//!
//! Produces per-file symbol tables: declared classes/functions with their
//! source segments, import statements, call sites, and base-class
//! references. The graph builder consumes these tables; nothing here touches
//! storage.
//!
//! A fresh `tree_sitter::Parser` is created per call; the underlying C
//! object is `!Send`, and `Parser::new()` is a single allocation, so this
//! keeps the function `Send + Sync` and trivially parallelizable with rayon.

use tree_sitter::Node;

use crate::error::{RepoGraphError, Result};

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Kind of a declared symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Class,
    Function,
}

/// One declared class or function.
#[derive(Debug, Clone)]
pub struct SymbolInfo {
    /// Dot-joined nesting path, e.g. `Outer.inner`.
    pub qualname: String,
    pub kind: SymbolKind,
    pub start_line: u32,
    pub end_line: u32,
    pub code: String,
}

/// One import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportStmt {
    /// `import a.b.c`
    Module { module: String },
    /// `from a.b import x, y` / `from . import z` / `from a import *`
    From {
        module: String,
        names: Vec<String>,
        wildcard: bool,
    },
}

/// A call expression and the scope it occurs in.
///
/// `scope` is the qualname of the nearest enclosing function; calls inside
/// `__init__` are attributed to the enclosing class. Module-level calls are
/// not collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub scope: String,
    pub callee: String,
}

/// A base-class reference on a class definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseRef {
    pub class_qualname: String,
    pub base: String,
}

/// The full symbol table for one Python file.
#[derive(Debug, Clone, Default)]
pub struct FileSymbols {
    pub rel_path: String,
    pub content_hash: String,
    pub symbols: Vec<SymbolInfo>,
    pub imports: Vec<ImportStmt>,
    pub calls: Vec<CallSite>,
    pub bases: Vec<BaseRef>,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Parse one Python file into its symbol table.
///
/// Unparseable content yields an empty table rather than an error: a file
/// the parser cannot read still becomes a `file` node, just without symbol
/// children.
pub fn parse_python(rel_path: &str, content: &str, content_hash: &str) -> Result<FileSymbols> {
    let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| RepoGraphError::Parse(format!("python grammar mismatch: {e}")))?;

    let mut out = FileSymbols {
        rel_path: rel_path.to_string(),
        content_hash: content_hash.to_string(),
        ..Default::default()
    };

    let tree = match parser.parse(content, None) {
        Some(t) => t,
        None => return Ok(out),
    };

    let mut extractor = Extractor {
        content,
        rel_path,
        scope: Vec::new(),
        out: &mut out,
    };
    extractor.visit(tree.root_node());

    Ok(out)
}

// ---------------------------------------------------------------------------
// Extraction walk
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    Class,
    Function,
    /// `__init__` of a class: no symbol of its own, calls attributed to the
    /// enclosing class.
    Init,
}

struct ScopeFrame {
    name: String,
    kind: ScopeKind,
}

struct Extractor<'a> {
    content: &'a str,
    rel_path: &'a str,
    scope: Vec<ScopeFrame>,
    out: &'a mut FileSymbols,
}

impl Extractor<'_> {
    fn visit(&mut self, node: Node<'_>) {
        match node.kind() {
            "class_definition" => self.visit_class(node),
            "function_definition" => self.visit_function(node),
            "call" => self.visit_call(node),
            "import_statement" => self.visit_import(node),
            "import_from_statement" => self.visit_import_from(node),
            _ => self.visit_children(node),
        }
    }

    fn visit_children(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
        for child in children {
            self.visit(child);
        }
    }

    fn text(&self, node: Node<'_>) -> &str {
        node.utf8_text(self.content.as_bytes()).unwrap_or_default()
    }

    fn qualname(&self, name: &str) -> String {
        if self.scope.is_empty() {
            name.to_string()
        } else {
            let mut parts: Vec<&str> = self.scope.iter().map(|f| f.name.as_str()).collect();
            parts.push(name);
            parts.join(".")
        }
    }

    fn in_init(&self) -> bool {
        self.scope.iter().any(|f| f.kind == ScopeKind::Init)
    }

    /// The qualname invoke edges originate from: the nearest enclosing
    /// function, or the enclosing class when inside `__init__`. `None` at
    /// module level and in bare class bodies.
    fn call_scope(&self) -> Option<String> {
        let idx = self
            .scope
            .iter()
            .rposition(|f| matches!(f.kind, ScopeKind::Function | ScopeKind::Init))?;
        let end = if self.scope[idx].kind == ScopeKind::Init {
            idx // exclude the __init__ frame, ending at the class
        } else {
            idx + 1
        };
        if end == 0 {
            return None;
        }
        Some(
            self.scope[..end]
                .iter()
                .map(|f| f.name.as_str())
                .collect::<Vec<_>>()
                .join("."),
        )
    }

    fn emit_symbol(&mut self, node: Node<'_>, qualname: &str, kind: SymbolKind) {
        self.out.symbols.push(SymbolInfo {
            qualname: qualname.to_string(),
            kind,
            start_line: node.start_position().row as u32 + 1,
            end_line: node.end_position().row as u32 + 1,
            code: self.content[node.start_byte()..node.end_byte()].to_string(),
        });
    }

    fn visit_class(&mut self, node: Node<'_>) {
        let name = match node.child_by_field_name("name") {
            Some(n) => self.text(n).to_string(),
            None => return self.visit_children(node),
        };
        let qualname = self.qualname(&name);

        if !self.in_init() {
            self.emit_symbol(node, &qualname, SymbolKind::Class);
            if let Some(superclasses) = node.child_by_field_name("superclasses") {
                let mut cursor = superclasses.walk();
                for base in superclasses.named_children(&mut cursor) {
                    let base_name = match base.kind() {
                        "identifier" => Some(self.text(base).to_string()),
                        "attribute" => base
                            .child_by_field_name("attribute")
                            .map(|a| self.text(a).to_string()),
                        _ => None,
                    };
                    if let Some(base_name) = base_name {
                        self.out.bases.push(BaseRef {
                            class_qualname: qualname.clone(),
                            base: base_name,
                        });
                    }
                }
            }
        }

        self.scope.push(ScopeFrame {
            name,
            kind: ScopeKind::Class,
        });
        if let Some(body) = node.child_by_field_name("body") {
            self.visit_children(body);
        }
        self.scope.pop();
    }

    fn visit_function(&mut self, node: Node<'_>) {
        let name = match node.child_by_field_name("name") {
            Some(n) => self.text(n).to_string(),
            None => return self.visit_children(node),
        };

        let parent_is_class = self
            .scope
            .last()
            .map(|f| f.kind == ScopeKind::Class)
            .unwrap_or(false);
        let kind = if name == "__init__" && parent_is_class {
            ScopeKind::Init
        } else {
            ScopeKind::Function
        };

        if kind == ScopeKind::Function && !self.in_init() {
            let qualname = self.qualname(&name);
            self.emit_symbol(node, &qualname, SymbolKind::Function);
        }

        self.scope.push(ScopeFrame { name, kind });
        if let Some(body) = node.child_by_field_name("body") {
            self.visit_children(body);
        }
        self.scope.pop();
    }

    fn visit_call(&mut self, node: Node<'_>) {
        if let Some(scope) = self.call_scope() {
            let callee = node.child_by_field_name("function").and_then(|f| {
                match f.kind() {
                    "identifier" => Some(self.text(f).to_string()),
                    "attribute" => f
                        .child_by_field_name("attribute")
                        .map(|a| self.text(a).to_string()),
                    _ => None,
                }
            });
            if let Some(callee) = callee {
                self.out.calls.push(CallSite { scope, callee });
            }
        }
        // arguments may hold lambdas and nested calls
        self.visit_children(node);
    }

    fn visit_import(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            let module = match child.kind() {
                "dotted_name" => Some(self.text(child).to_string()),
                "aliased_import" => child
                    .child_by_field_name("name")
                    .map(|n| self.text(n).to_string()),
                _ => None,
            };
            if let Some(module) = module {
                self.out.imports.push(ImportStmt::Module { module });
            }
        }
    }

    fn visit_import_from(&mut self, node: Node<'_>) {
        let module_node = match node.child_by_field_name("module_name") {
            Some(m) => m,
            None => return,
        };

        let module = match module_node.kind() {
            "dotted_name" => self.text(module_node).to_string(),
            "relative_import" => self.resolve_relative_module(module_node),
            _ => return,
        };

        let mut names = Vec::new();
        let mut wildcard = false;
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.id() == module_node.id() {
                continue;
            }
            match child.kind() {
                "wildcard_import" => wildcard = true,
                "dotted_name" => names.push(self.text(child).to_string()),
                "aliased_import" => {
                    if let Some(n) = child.child_by_field_name("name") {
                        names.push(self.text(n).to_string());
                    }
                }
                _ => {}
            }
        }

        self.out.imports.push(ImportStmt::From {
            module,
            names,
            wildcard,
        });
    }

    /// Turn `from ..pkg import x` into an absolute dotted module using the
    /// importing file's package path: one leading dot strips the file name,
    /// each further dot strips one more package level.
    fn resolve_relative_module(&self, node: Node<'_>) -> String {
        let mut dots = 0usize;
        let mut suffix = String::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "import_prefix" => dots = self.text(child).chars().filter(|c| *c == '.').count(),
                "dotted_name" => suffix = self.text(child).to_string(),
                _ => {}
            }
        }

        let parts: Vec<&str> = self.rel_path.split('/').collect();
        let keep = parts.len().saturating_sub(dots.max(1));
        let mut components: Vec<String> =
            parts[..keep].iter().map(|s| s.to_string()).collect();
        if !suffix.is_empty() {
            components.push(suffix);
        }
        components.join(".")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
