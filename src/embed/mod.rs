//! Embedding generation
//!
//! This module provides an abstraction over embedding models with:
//! - A trait for different embedding backends
//! - Local embedding support via fastembed
//! - An HTTP backend for OpenAI-compatible embedding endpoints
//! - Batch processing for efficiency

#[cfg(feature = "local-embed")]
mod fastembed_impl;
mod http_backend;

#[cfg(feature = "local-embed")]
pub use fastembed_impl::*;
pub use http_backend::*;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;

/// Trait for embedding providers
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Create an embedder based on configuration
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    match config.backend.as_str() {
        "http" => {
            let embedder = HttpEmbedder::new(config)?;
            Ok(Box::new(embedder))
        }
        "local" => {
            #[cfg(feature = "local-embed")]
            {
                let embedder = FastEmbedder::new(config)?;
                Ok(Box::new(embedder))
            }

            #[cfg(not(feature = "local-embed"))]
            {
                Err(Error::Embedding(
                    "No local embedding backend available. Enable the 'local-embed' feature or set embedding.backend = 'http'.".to_string(),
                ))
            }
        }
        other => Err(Error::Embedding(format!(
            "Unknown embedding backend: {other}"
        ))),
    }
}

/// Helper to embed in batches
pub async fn embed_in_batches(
    embedder: &dyn Embedder,
    texts: Vec<String>,
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut all_embeddings = Vec::with_capacity(texts.len());

    for chunk in texts.chunks(batch_size.max(1)) {
        let batch_texts: Vec<String> = chunk.to_vec();
        let embeddings = embedder.embed(batch_texts).await?;
        all_embeddings.extend(embeddings);
    }

    Ok(all_embeddings)
}
