//! Runtime configuration.
//!
//! Loaded from a YAML file (explicit path, or the platform config directory)
//! with every field defaulted, so a missing file is not an error. The LLM
//! API key is never stored in the file; it is read from the environment at
//! client construction time.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RepoGraphError, Result};

/// Environment variable holding the API key for the LLM collaborators.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP bind address for `repograph serve`.
    pub bind_addr: String,
    /// Path of the SQLite database holding graphs and embeddings.
    pub db_path: String,
    /// Base URL of the OpenAI-compatible API.
    pub api_base: String,
    /// Chat model used for node summaries.
    pub summary_model: String,
    /// Chat model used for answering questions.
    pub answer_model: String,
    /// Embedding model.
    pub embedding_model: String,
    /// Concurrent annotation calls in flight at once.
    pub annotation_concurrency: usize,
    /// Maximum number of context records handed to the answering model.
    pub max_context_nodes: usize,
    /// Default number of nearest-neighbor seeds per question.
    pub default_top_k: usize,
    /// Minimum similarity score for a seed; `None` keeps everything.
    pub score_threshold: Option<f32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            db_path: "repograph.db".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            summary_model: "gpt-4o-mini".to_string(),
            answer_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            annotation_concurrency: 8,
            max_context_nodes: 25,
            default_top_k: 5,
            score_threshold: None,
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// With an explicit `path`, the file must exist and parse. Without one,
    /// `{config_dir}/repograph/config.yaml` is read when present, otherwise
    /// defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => {
                if !p.exists() {
                    return Err(RepoGraphError::Config(format!(
                        "config file not found: {}",
                        p.display()
                    )));
                }
                p.to_path_buf()
            }
            None => match default_config_path() {
                Some(p) if p.exists() => p,
                _ => return Ok(Self::default()),
            },
        };

        let raw = std::fs::read_to_string(&path)?;
        serde_yaml::from_str(&raw)
            .map_err(|e| RepoGraphError::Config(format!("{}: {}", path.display(), e)))
    }
}

fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "repograph")
        .map(|dirs| dirs.config_dir().join("config.yaml"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
