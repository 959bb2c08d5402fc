//! Embedding backends.
//!
//! Grid files name embedders with an [`EmbeddingSpec`]; specs are resolved
//! into shared [`Embedder`] handles before any experiment is built, so every
//! experiment using the same spec shares one model instance.

mod hashing;
#[cfg(feature = "local")]
mod local;
mod openai;

pub use hashing::HashingEmbedder;
#[cfg(feature = "local")]
pub use local::LocalEmbedder;
pub use openai::OpenAiEmbedder;

use crate::BoxFuture;
use crate::config::Config;
use crate::error::{Result, VectorboardError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared handle to an embedding model.
pub type EmbeddingHandle = Arc<dyn Embedder>;

/// Turns text into dense vectors.
pub trait Embedder: Send + Sync {
    /// Label shown in result tables.
    fn name(&self) -> &str;

    /// Embed a batch of passages, one vector per input, in input order.
    fn embed_documents<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;

    /// Embed a single query.
    fn embed_query<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>> {
        Box::pin(async move {
            let texts = vec![text.to_string()];
            self.embed_documents(&texts)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| VectorboardError::Embedding("no embedding returned".to_string()))
        })
    }
}

fn default_hashing_dimensions() -> usize {
    256
}

fn default_openai_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_local_model() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}

/// Embedding backends that can appear in a parameter grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EmbeddingSpec {
    /// Feature-hashed bag of words, computed locally.
    Hashing {
        #[serde(default = "default_hashing_dimensions")]
        dimensions: usize,
    },
    /// OpenAI-compatible `/v1/embeddings` endpoint.
    #[serde(rename = "openai")]
    OpenAi {
        #[serde(default = "default_openai_model")]
        model: String,
    },
    /// Sentence-transformers BERT model run with candle.
    Local {
        #[serde(default = "default_local_model")]
        model_id: String,
    },
}

impl EmbeddingSpec {
    /// Build the concrete backend for this spec.
    pub fn resolve(&self, config: &Config) -> Result<EmbeddingHandle> {
        match self {
            EmbeddingSpec::Hashing { dimensions } => {
                Ok(Arc::new(HashingEmbedder::new(*dimensions)?))
            }
            EmbeddingSpec::OpenAi { model } => Ok(Arc::new(OpenAiEmbedder::new(
                config.embeddings_api_base(),
                config.embeddings_api_key(),
                model.clone(),
            ))),
            #[cfg(feature = "local")]
            EmbeddingSpec::Local { model_id } => Ok(Arc::new(LocalEmbedder::load(model_id)?)),
            #[cfg(not(feature = "local"))]
            EmbeddingSpec::Local { model_id } => Err(VectorboardError::Config(format!(
                "embedding model '{model_id}' needs the `local` feature"
            ))),
        }
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Euclidean distance; mismatched lengths are infinitely far apart.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
