//! Repository acquisition: turn a repo reference into a local file tree.
//!
//! Local paths are used in place; URLs are shallow-cloned into a temp
//! directory that lives as long as the returned handle.

use std::path::{Path, PathBuf};
use std::process::Command;

use regex::Regex;
use tempfile::TempDir;

use crate::error::{RepoGraphError, Result};

/// A checked-out repository tree. Cloned trees are removed when dropped.
pub enum AcquiredRepo {
    Local(PathBuf),
    Cloned { tempdir: TempDir, path: PathBuf },
}

impl AcquiredRepo {
    pub fn path(&self) -> &Path {
        match self {
            Self::Local(path) => path,
            Self::Cloned { path, .. } => path,
        }
    }
}

/// Fetches a repository reference into a local tree.
pub trait RepoAcquirer: Send + Sync {
    fn fetch(&self, repo_ref: &str) -> Result<AcquiredRepo>;
}

// ---------------------------------------------------------------------------
// GitAcquirer
// ---------------------------------------------------------------------------

/// Default acquirer: existing directories pass through, anything else is
/// treated as a git URL and shallow-cloned.
#[derive(Default)]
pub struct GitAcquirer;

impl GitAcquirer {
    pub fn new() -> Self {
        Self
    }
}

/// Derive the checkout directory name from a repo URL:
/// `https://host/org/name.git` -> `name`.
fn repo_name(repo_url: &str) -> String {
    if let Ok(re) = Regex::new(r"([^/]+?)(?:\.git)?/?$") {
        if let Some(m) = re.captures(repo_url).and_then(|c| c.get(1)) {
            return m.as_str().to_string();
        }
    }
    "repo".to_string()
}

impl RepoAcquirer for GitAcquirer {
    fn fetch(&self, repo_ref: &str) -> Result<AcquiredRepo> {
        let local = Path::new(repo_ref);
        if local.is_dir() {
            return Ok(AcquiredRepo::Local(local.to_path_buf()));
        }

        let tempdir = TempDir::with_prefix("repograph-")?;
        let path = tempdir.path().join(repo_name(repo_ref));

        tracing::info!(url = %repo_ref, dest = %path.display(), "cloning repository");
        let output = Command::new("git")
            .arg("clone")
            .arg("--depth")
            .arg("1")
            .arg(repo_ref)
            .arg(&path)
            .output()
            .map_err(|e| RepoGraphError::upstream("git", e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RepoGraphError::upstream(
                "git",
                format!("clone failed for {repo_ref}: {}", stderr.trim()),
            ));
        }

        Ok(AcquiredRepo::Cloned { tempdir, path })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
