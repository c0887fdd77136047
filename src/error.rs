//! Error taxonomy for RepoGraph.
//!
//! Four user-visible categories: validation failures (including unknown
//! strategy names), missing snapshots, build conflicts, and upstream
//! collaborator failures. Upstream errors are surfaced without retry; retry
//! policy, if any, belongs to the adapter. Partial annotation is a warning,
//! not an error, and never appears here.

use thiserror::Error;

/// All errors produced by this crate.
#[derive(Debug, Error)]
pub enum RepoGraphError {
    /// Malformed request. Out-of-range depth is *not* a validation error;
    /// it is clamped to `[1, 5]`.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Strategy name outside the documented set. Raised before any
    /// traversal runs.
    #[error("unknown retrieval strategy: {0:?}")]
    InvalidStrategy(String),

    /// Query against a repository id with no published snapshot.
    #[error("repository not indexed: {0:?}")]
    NotFound(String),

    /// A build for this repository id is already in flight. Builds are
    /// never interleaved.
    #[error("a build is already in progress for repository {0:?}")]
    BuildInProgress(String),

    /// A storage, search, annotation, or answering collaborator failed.
    #[error("upstream {service} error: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl RepoGraphError {
    /// Shorthand for an upstream collaborator failure.
    pub fn upstream(service: &'static str, message: impl Into<String>) -> Self {
        Self::Upstream {
            service,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RepoGraphError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
