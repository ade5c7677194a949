//! HTTP embedding backend for OpenAI-compatible `/embeddings` endpoints

use super::Embedder;
use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// Embedder backed by a remote OpenAI-compatible embeddings API
pub struct HttpEmbedder {
    client: reqwest::Client,
    base_url: String,
    model_name: String,
    dimension: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingEntry>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingEntry {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    /// Create a new HTTP embedder
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let base_url = config
            .http_url
            .clone()
            .ok_or_else(|| Error::Embedding("embedding.http_url not configured".to_string()))?;

        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model_name: config.model.clone(),
            dimension: config.dimension,
        })
    }

    fn validate_dimensions(&self, embeddings: &[Vec<f32>]) -> Result<()> {
        if let Some(mismatch) = embeddings.iter().find(|vec| vec.len() != self.dimension) {
            return Err(Error::Embedding(format!(
                "Embedding dimension mismatch for model '{}': expected {}, got {}",
                self.model_name,
                self.dimension,
                mismatch.len()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Embedding {} texts via {}", texts.len(), self.base_url);

        let expected = texts.len();
        let url = format!("{}/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({
                "model": self.model_name,
                "input": texts,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Embedding(format!(
                "Embedding API error {status}: {body}"
            )));
        }

        let parsed: EmbeddingsResponse = response.json().await?;
        if parsed.data.len() != expected {
            return Err(Error::Embedding(format!(
                "Embedding API returned {} vectors for {} inputs",
                parsed.data.len(),
                expected
            )));
        }

        let embeddings: Vec<Vec<f32>> = parsed.data.into_iter().map(|e| e.embedding).collect();
        self.validate_dimensions(&embeddings)?;
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
