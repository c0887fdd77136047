//! The orchestration engine: index, ask, export, reset.
//!
//! Build and query are cleanly separated. A build acquires, scans, parses,
//! constructs, publishes atomically, then annotates; at most one build per
//! repository id is in flight at a time. Queries run against published
//! snapshots only and never mutate anything.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use rayon::prelude::*;

use crate::acquire::RepoAcquirer;
use crate::annotate::annotate_graph;
use crate::error::{RepoGraphError, Result};
use crate::graph::builder::build_graph;
use crate::graph::traversal::{traverse, Seed};
use crate::indexer::{parse_python, scanner, FileCategory, ParsedFile};
use crate::llm::{AnswerModel, Embedder, Summarizer};
use crate::retrieval::context::{assemble, render_context};
use crate::retrieval::strategy::{resolve, TraversalOverrides};
use crate::store::{GraphStore, RepoView};
use crate::types::{AskRequest, AskResponse, GraphSnapshot};
use crate::vector::VectorIndex;

/// Engine tuning knobs, taken from [`crate::config::Config`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub annotation_concurrency: usize,
    pub max_context_nodes: usize,
    pub default_top_k: usize,
    pub score_threshold: Option<f32>,
    /// Strategy applied when a request names none.
    pub default_strategy: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            annotation_concurrency: 8,
            max_context_nodes: 25,
            default_top_k: 5,
            score_threshold: None,
            default_strategy: "invokes_only".to_string(),
        }
    }
}

/// Result of one indexing run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IndexReport {
    pub repo_id: String,
    pub files: usize,
    pub nodes: usize,
    pub edges: usize,
    pub summarized: usize,
    pub embedded: usize,
    pub annotation_failures: usize,
}

pub struct Engine {
    graph: Arc<dyn GraphStore>,
    vectors: Arc<dyn VectorIndex>,
    summarizer: Arc<dyn Summarizer>,
    embedder: Arc<dyn Embedder>,
    answerer: Arc<dyn AnswerModel>,
    acquirer: Arc<dyn RepoAcquirer>,
    config: EngineConfig,
    builds_in_flight: Mutex<HashSet<String>>,
}

/// Releases the per-repo build slot when the build ends, however it ends.
struct BuildGuard<'a> {
    builds: &'a Mutex<HashSet<String>>,
    repo_id: String,
}

impl<'a> BuildGuard<'a> {
    fn acquire(builds: &'a Mutex<HashSet<String>>, repo_id: &str) -> Result<Self> {
        let mut in_flight = builds.lock().unwrap_or_else(|e| e.into_inner());
        if !in_flight.insert(repo_id.to_string()) {
            return Err(RepoGraphError::BuildInProgress(repo_id.to_string()));
        }
        Ok(Self {
            builds,
            repo_id: repo_id.to_string(),
        })
    }
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        self.builds
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.repo_id);
    }
}

impl Engine {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        vectors: Arc<dyn VectorIndex>,
        summarizer: Arc<dyn Summarizer>,
        embedder: Arc<dyn Embedder>,
        answerer: Arc<dyn AnswerModel>,
        acquirer: Arc<dyn RepoAcquirer>,
        config: EngineConfig,
    ) -> Self {
        Self {
            graph,
            vectors,
            summarizer,
            embedder,
            answerer,
            acquirer,
            config,
            builds_in_flight: Mutex::new(HashSet::new()),
        }
    }

    // -------------------------------------------------------------------
    // index
    // -------------------------------------------------------------------

    /// Index a repository. The reference (URL or local path) doubles as the
    /// repository id.
    pub async fn index_repo(&self, repo_ref: &str) -> Result<IndexReport> {
        let _guard = BuildGuard::acquire(&self.builds_in_flight, repo_ref)?;

        let acquired = self.acquirer.fetch(repo_ref)?;
        let scanned = scanner::scan_repository(acquired.path())?;
        tracing::info!(repo = %repo_ref, files = scanned.len(), "scanned repository");

        let parsed: Vec<ParsedFile> = scanned
            .par_iter()
            .map(|file| match file.category {
                FileCategory::Python => parse_python(
                    &file.rel_path,
                    &file.content,
                    &file.content_hash,
                )
                .map(ParsedFile::Python),
                FileCategory::Generic => Ok(ParsedFile::Generic {
                    rel_path: file.rel_path.clone(),
                    readme: file.is_readme().then(|| file.content.clone()),
                }),
            })
            .collect::<Result<Vec<_>>>()?;

        let snapshot = build_graph(&parsed);
        tracing::info!(
            repo = %repo_ref,
            nodes = snapshot.nodes.len(),
            edges = snapshot.edges.len(),
            "built graph snapshot"
        );

        // publish, then annotate: topology is immutable from here on
        self.graph.replace_graph(repo_ref, &snapshot)?;

        let report = annotate_graph(
            repo_ref,
            &snapshot,
            self.graph.as_ref(),
            self.vectors.as_ref(),
            self.summarizer.as_ref(),
            self.embedder.as_ref(),
            self.config.annotation_concurrency,
        )
        .await;
        if report.failed > 0 {
            tracing::warn!(
                repo = %repo_ref,
                failed = report.failed,
                "some nodes were persisted without annotations"
            );
        }

        Ok(IndexReport {
            repo_id: repo_ref.to_string(),
            files: scanned.len(),
            nodes: snapshot.nodes.len(),
            edges: snapshot.edges.len(),
            summarized: report.summarized,
            embedded: report.embedded,
            annotation_failures: report.failed,
        })
    }

    // -------------------------------------------------------------------
    // ask
    // -------------------------------------------------------------------

    /// Answer a question against an indexed repository.
    pub async fn ask(&self, request: &AskRequest) -> Result<AskResponse> {
        if request.question.trim().is_empty() {
            return Err(RepoGraphError::Validation(
                "question must not be empty".to_string(),
            ));
        }
        if !self.graph.has_repo(&request.repo_id)? {
            return Err(RepoGraphError::NotFound(request.repo_id.clone()));
        }

        // resolve the strategy before spending anything on embeddings;
        // an unknown name must fail before any traversal work happens
        let strategy_name = request
            .strategy
            .as_deref()
            .unwrap_or(&self.config.default_strategy);
        let traversal_config = resolve(strategy_name, &TraversalOverrides::from(request))?;

        let query_vector = self.embedder.embed(&request.question).await?;
        let top_k = request.top_k.unwrap_or(self.config.default_top_k);
        let seeds: Vec<Seed> = self
            .vectors
            .nearest_neighbors(
                &request.repo_id,
                &query_vector,
                top_k,
                self.config.score_threshold,
            )?
            .into_iter()
            .map(|hit| Seed {
                node_id: hit.node_id,
                score: hit.score,
            })
            .collect();
        tracing::debug!(repo = %request.repo_id, seeds = seeds.len(), strategy = %strategy_name, "seeded traversal");

        let view = RepoView::new(self.graph.as_ref(), &request.repo_id);
        let outcome = traverse(&view, &seeds, &traversal_config)?;
        let context = assemble(&outcome, self.config.max_context_nodes);

        let rendered = render_context(&context);
        let answer = self.answerer.answer(&request.question, &rendered).await?;

        Ok(AskResponse { answer, context })
    }

    // -------------------------------------------------------------------
    // export / reset
    // -------------------------------------------------------------------

    /// The unfiltered node/edge dump for one repository, for visualization.
    pub fn export(&self, repo_id: &str) -> Result<GraphSnapshot> {
        if !self.graph.has_repo(repo_id)? {
            return Err(RepoGraphError::NotFound(repo_id.to_string()));
        }
        self.graph.export(repo_id)
    }

    /// Remove every snapshot and every embedding.
    pub fn reset(&self) -> Result<()> {
        self.graph.delete_all()?;
        self.vectors.delete_all()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
