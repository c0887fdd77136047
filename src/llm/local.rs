//! Local embedding via fastembed (feature `embedding`).
//!
//! Lets the query path run without a remote embedding API. Summaries and
//! answers still need a chat model; only the [`Embedder`] contract is
//! covered here.

use std::sync::Mutex;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use futures::future::{BoxFuture, FutureExt};

use crate::error::{RepoGraphError, Result};
use crate::llm::Embedder;

pub struct LocalEmbedder {
    model: Mutex<TextEmbedding>,
}

impl LocalEmbedder {
    /// Load the default model (AllMiniLM-L6-v2, 384 dimensions). Downloads
    /// model weights on first use.
    pub fn new() -> Result<Self> {
        let model = TextEmbedding::try_new(InitOptions::new(EmbeddingModel::AllMiniLML6V2))
            .map_err(|e| RepoGraphError::upstream("local-embedder", e.to_string()))?;
        Ok(Self {
            model: Mutex::new(model),
        })
    }

    fn embed_sync(&self, text: &str) -> Result<Vec<f32>> {
        let mut model = self.model.lock().unwrap_or_else(|e| e.into_inner());
        let mut vectors = model
            .embed(vec![text.to_string()], None)
            .map_err(|e| RepoGraphError::upstream("local-embedder", e.to_string()))?;
        vectors
            .pop()
            .ok_or_else(|| RepoGraphError::upstream("local-embedder", "empty embedding batch"))
    }
}

impl Embedder for LocalEmbedder {
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>> {
        futures::future::ready(self.embed_sync(text)).boxed()
    }
}
