//! HTTP API over the engine.
//!
//! Endpoints mirror the indexing/query lifecycle: index a repository,
//! ask a question, export the full graph, reset. Repository ids are URLs,
//! so the export endpoint takes its id as a query parameter rather than a
//! path segment.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::engine::{Engine, IndexReport};
use crate::error::{RepoGraphError, Result};
use crate::types::{AskRequest, AskResponse, GraphSnapshot};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RepoRequest {
    pub repo_url: String,
}

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub report: IndexReport,
}

#[derive(Debug, Deserialize)]
pub struct GraphQuery {
    pub repo_id: String,
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Wrapper mapping crate errors onto HTTP statuses.
pub struct ApiError(RepoGraphError);

impl From<RepoGraphError> for ApiError {
    fn from(err: RepoGraphError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            RepoGraphError::Validation(_) | RepoGraphError::InvalidStrategy(_) => {
                StatusCode::BAD_REQUEST
            }
            RepoGraphError::NotFound(_) => StatusCode::NOT_FOUND,
            RepoGraphError::BuildInProgress(_) => StatusCode::CONFLICT,
            RepoGraphError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn index_repo(
    State(engine): State<Arc<Engine>>,
    Json(request): Json<RepoRequest>,
) -> std::result::Result<Json<IndexResponse>, ApiError> {
    let report = engine.index_repo(&request.repo_url).await?;
    Ok(Json(IndexResponse {
        status: "success",
        report,
    }))
}

async fn ask(
    State(engine): State<Arc<Engine>>,
    Json(request): Json<AskRequest>,
) -> std::result::Result<Json<AskResponse>, ApiError> {
    Ok(Json(engine.ask(&request).await?))
}

async fn export_graph(
    State(engine): State<Arc<Engine>>,
    Query(query): Query<GraphQuery>,
) -> std::result::Result<Json<GraphSnapshot>, ApiError> {
    Ok(Json(engine.export(&query.repo_id)?))
}

async fn reset(State(engine): State<Arc<Engine>>) -> std::result::Result<StatusCode, ApiError> {
    engine.reset()?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build the API router.
pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/repos", post(index_repo).delete(reset))
        .route("/ask", post(ask))
        .route("/graph", get(export_graph))
        .with_state(engine)
}

/// Serve the API until ctrl-c.
pub async fn serve(engine: Arc<Engine>, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("repograph API listening on http://{addr}");

    axum::serve(listener, router(engine))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
