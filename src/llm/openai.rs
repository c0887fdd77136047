//! OpenAI-compatible client implementing all three LLM contracts.
//!
//! Works against any API speaking the `/chat/completions` and `/embeddings`
//! protocol (OpenAI, Groq, local gateways). The API key comes from the
//! environment; a client without one still constructs, and fails at call
//! time, so the `export` and `reset` flows never need credentials.

use futures::future::{BoxFuture, FutureExt};
use serde_json::json;

use crate::config::{Config, API_KEY_ENV};
use crate::error::{RepoGraphError, Result};
use crate::llm::{
    build_answer_prompt, build_summary_prompt, AnswerModel, Embedder, Summarizer, SummaryContext,
};
use crate::types::CodeNode;

pub struct OpenAiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    summary_model: String,
    answer_model: String,
    embedding_model: String,
}

impl OpenAiClient {
    /// Build a client from config, reading the key from `OPENAI_API_KEY`.
    pub fn from_env(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()),
            summary_model: config.summary_model.clone(),
            answer_model: config.answer_model.clone(),
            embedding_model: config.embedding_model.clone(),
        }
    }

    fn key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            RepoGraphError::Config(format!("{API_KEY_ENV} is not set"))
        })
    }

    async fn chat(&self, service: &'static str, model: &str, prompt: &str) -> Result<String> {
        let key = self.key()?;
        let body = json!({
            "model": model,
            "messages": [
                {"role": "system", "content": "You are a helpful assistant for reasoning about code structure."},
                {"role": "user", "content": prompt},
            ],
            "temperature": 0.2,
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RepoGraphError::upstream(service, e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(RepoGraphError::upstream(
                service,
                format!("{status}: {detail}"),
            ));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RepoGraphError::upstream(service, e.to_string()))?;
        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| RepoGraphError::upstream(service, "malformed completion response"))
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let key = self.key()?;
        let body = json!({
            "model": self.embedding_model,
            "input": text,
        });

        let response = self
            .http
            .post(format!("{}/embeddings", self.api_base))
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RepoGraphError::upstream("embedder", e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(RepoGraphError::upstream(
                "embedder",
                format!("{status}: {detail}"),
            ));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RepoGraphError::upstream("embedder", e.to_string()))?;
        let vector = payload["data"][0]["embedding"]
            .as_array()
            .ok_or_else(|| RepoGraphError::upstream("embedder", "malformed embedding response"))?;
        vector
            .iter()
            .map(|v| {
                v.as_f64().map(|f| f as f32).ok_or_else(|| {
                    RepoGraphError::upstream("embedder", "non-numeric embedding entry")
                })
            })
            .collect()
    }
}

impl Summarizer for OpenAiClient {
    fn summarize<'a>(
        &'a self,
        node: &'a CodeNode,
        ctx: &'a SummaryContext,
    ) -> BoxFuture<'a, Result<String>> {
        async move {
            let prompt = build_summary_prompt(node, ctx);
            self.chat("summarizer", &self.summary_model, &prompt).await
        }
        .boxed()
    }
}

impl Embedder for OpenAiClient {
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>> {
        self.embed_text(text).boxed()
    }
}

impl AnswerModel for OpenAiClient {
    fn answer<'a>(&'a self, question: &'a str, context: &'a str) -> BoxFuture<'a, Result<String>> {
        async move {
            let prompt = build_answer_prompt(question, context);
            self.chat("answer-model", &self.answer_model, &prompt).await
        }
        .boxed()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
