//! Repository tree scanner.
//!
//! Walks a checked-out repository, skipping vendored and cache directories,
//! and classifies every remaining file as Python source, recognized generic
//! file, or ignored. Entries are sorted so the scan order, and everything
//! derived from it, is independent of filesystem enumeration order.

use std::path::Path;

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::Result;

/// Directory names never worth indexing.
const SKIP_DIRS: &[&str] = &[
    ".git",
    ".github",
    ".mypy_cache",
    "__pycache__",
    ".idea",
    "venv",
    "env",
    ".venv",
    "node_modules",
    ".tox",
];

/// Non-source suffixes that still become `generic_file` nodes.
const GENERIC_SUFFIXES: &[&str] = &[
    ".js", ".jsx", ".ts", ".tsx", ".md", ".txt", ".ipynb", ".json", ".yaml", ".yml", ".cfg",
    ".toml",
];

/// How a scanned file will be treated downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Python,
    Generic,
}

/// One file surviving the walk, with its content loaded.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    /// Repository-relative path with `/` separators.
    pub rel_path: String,
    pub category: FileCategory,
    pub content: String,
    /// SHA-256 of the content, hex-encoded.
    pub content_hash: String,
}

impl ScannedFile {
    /// Whether this looks like the repository README.
    pub fn is_readme(&self) -> bool {
        file_name(&self.rel_path).to_lowercase().starts_with("readme")
    }
}

fn file_name(rel_path: &str) -> &str {
    rel_path.rsplit('/').next().unwrap_or(rel_path)
}

fn classify(rel_path: &str) -> Option<FileCategory> {
    let lower = rel_path.to_lowercase();
    if lower.ends_with(".py") {
        return Some(FileCategory::Python);
    }
    if GENERIC_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
        return Some(FileCategory::Generic);
    }
    None
}

/// Walk `root` and return every indexable file, sorted by relative path.
///
/// Files that are not valid UTF-8 are skipped; binary blobs carry no
/// symbols, and the graph only stores text excerpts.
pub fn scan_repository(root: &Path) -> Result<Vec<ScannedFile>> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        .into_iter()
        .filter_entry(|entry| {
            if entry.file_type().is_dir() {
                let name = entry.file_name().to_string_lossy();
                !SKIP_DIRS.contains(&name.as_ref())
            } else {
                true
            }
        });

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let rel_path = match entry.path().strip_prefix(root) {
            Ok(p) => p.to_string_lossy().replace('\\', "/"),
            Err(_) => continue,
        };
        let category = match classify(&rel_path) {
            Some(c) => c,
            None => continue,
        };

        let content = match std::fs::read_to_string(entry.path()) {
            Ok(c) => c,
            Err(err) => {
                tracing::warn!(path = %rel_path, error = %err, "skipping non-UTF-8 file");
                continue;
            }
        };

        let content_hash = hex::encode(Sha256::digest(content.as_bytes()));
        files.push(ScannedFile {
            rel_path,
            category,
            content,
            content_hash,
        });
    }

    files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(files)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn scan_classifies_python_and_generic_files() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "app.py", "x = 1\n");
        write(tmp.path(), "README.md", "# demo\n");
        write(tmp.path(), "logo.png", "not scanned");

        let files = scan_repository(tmp.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].rel_path, "README.md");
        assert_eq!(files[0].category, FileCategory::Generic);
        assert_eq!(files[1].rel_path, "app.py");
        assert_eq!(files[1].category, FileCategory::Python);
    }

    #[test]
    fn scan_skips_vendored_directories() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/main.py", "x = 1\n");
        write(tmp.path(), "venv/lib.py", "x = 2\n");
        write(tmp.path(), "__pycache__/main.py", "x = 3\n");
        write(tmp.path(), ".git/config.py", "x = 4\n");

        let files = scan_repository(tmp.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].rel_path, "src/main.py");
    }

    #[test]
    fn scan_output_is_sorted_by_path() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "zeta.py", "");
        write(tmp.path(), "alpha.py", "");
        write(tmp.path(), "pkg/beta.py", "");

        let files = scan_repository(tmp.path()).unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.rel_path.as_str()).collect();
        assert_eq!(paths, vec!["alpha.py", "pkg/beta.py", "zeta.py"]);
    }

    #[test]
    fn content_hash_depends_only_on_content() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.py", "x = 1\n");
        write(tmp.path(), "b.py", "x = 1\n");

        let files = scan_repository(tmp.path()).unwrap();
        assert_eq!(files[0].content_hash, files[1].content_hash);
    }

    #[test]
    fn readme_detection() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "README.md", "# hi\n");
        write(tmp.path(), "docs/readme.txt", "hi\n");
        write(tmp.path(), "notes.md", "not a readme\n");

        let files = scan_repository(tmp.path()).unwrap();
        let readmes: Vec<&str> = files
            .iter()
            .filter(|f| f.is_readme())
            .map(|f| f.rel_path.as_str())
            .collect();
        assert_eq!(readmes, vec!["README.md", "docs/readme.txt"]);
    }
}
