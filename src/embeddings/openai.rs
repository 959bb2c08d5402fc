//! OpenAI-compatible embeddings client.

use super::Embedder;
use crate::BoxFuture;
use crate::error::{Result, VectorboardError};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Inputs sent per request.
const BATCH_SIZE: usize = 64;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Embedder backed by `POST {api_base}/v1/embeddings`.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
    name: String,
}

impl OpenAiEmbedder {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>, model: String) -> Self {
        let name = format!("openai/{model}");
        Self {
            client: Client::new(),
            api_base: api_base.into(),
            api_key: api_key.into(),
            model,
            name,
        }
    }

    fn endpoint(&self) -> String {
        let base = self.api_base.trim_end_matches('/');
        format!("{}/v1/embeddings", base)
    }

    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: batch,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            if let Ok(api_error) = serde_json::from_str::<ApiError>(&body) {
                return Err(VectorboardError::Embedding(format!(
                    "API error ({}): {}",
                    status, api_error.error.message
                )));
            }
            return Err(VectorboardError::Embedding(format!(
                "Request failed ({}): {}",
                status, body
            )));
        }

        parse_response(&body, batch.len())
    }
}

/// Order embeddings by their `index` field and check the count.
fn parse_response(body: &str, expected: usize) -> Result<Vec<Vec<f32>>> {
    let mut parsed: EmbeddingResponse = serde_json::from_str(body)
        .map_err(|e| VectorboardError::Embedding(format!("malformed response: {e}")))?;

    if parsed.data.len() != expected {
        return Err(VectorboardError::Embedding(format!(
            "expected {} embeddings, got {}",
            expected,
            parsed.data.len()
        )));
    }

    parsed.data.sort_by_key(|d| d.index);
    Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
}

impl Embedder for OpenAiEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    fn embed_documents<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
        Box::pin(async move {
            let mut out = Vec::with_capacity(texts.len());
            for batch in texts.chunks(BATCH_SIZE) {
                out.extend(self.embed_batch(batch).await?);
            }
            Ok(out)
        })
    }
}
