//! Local embedding model using candle + sentence-transformers.

use super::Embedder;
use crate::BoxFuture;
use crate::error::{Result, VectorboardError};
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use hf_hub::{Repo, RepoType, api::sync::Api};
use tokenizers::Tokenizer;

/// Passages run through the model per forward pass.
const BATCH_SIZE: usize = 32;

fn embedding_err(context: &str, err: impl std::fmt::Display) -> VectorboardError {
    VectorboardError::Embedding(format!("{context}: {err}"))
}

/// BERT sentence embedder with mean pooling and L2 normalization.
pub struct LocalEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    name: String,
}

impl LocalEmbedder {
    /// Download (or reuse the hub cache for) a sentence-transformers model.
    pub fn load(model_id: &str) -> Result<Self> {
        let device = Device::Cpu;

        let api = Api::new().map_err(|e| embedding_err("Failed to create HF Hub API", e))?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let config_path = repo
            .get("config.json")
            .map_err(|e| embedding_err("Failed to get config.json", e))?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .map_err(|e| embedding_err("Failed to get tokenizer.json", e))?;
        let weights_path = repo
            .get("model.safetensors")
            .map_err(|e| embedding_err("Model must publish model.safetensors weights", e))?;

        let raw_config = std::fs::read_to_string(&config_path)
            .map_err(|e| VectorboardError::io(&config_path, e))?;
        let config: BertConfig = serde_json::from_str(&raw_config)
            .map_err(|e| embedding_err("Failed to parse model config", e))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| embedding_err("Failed to load tokenizer", e))?;

        // SAFETY: the weights file is owned by the hub cache and not modified while mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)
                .map_err(|e| embedding_err("Failed to load model weights", e))?
        };

        let model =
            BertModel::load(vb, &config).map_err(|e| embedding_err("Failed to load BERT model", e))?;

        tracing::info!(model = model_id, "loaded local embedding model");

        Ok(Self {
            model,
            tokenizer,
            device,
            name: format!("local/{model_id}"),
        })
    }

    fn embed_batch(&self, texts: &[&str]) -> candle_core::Result<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| candle_core::Error::Msg(format!("Tokenization failed: {e}")))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        let mut input_ids = Vec::with_capacity(texts.len() * max_len);
        let mut attention_mask = Vec::with_capacity(texts.len() * max_len);

        for encoding in &encodings {
            let mut ids = encoding.get_ids().to_vec();
            let mut mask = encoding.get_attention_mask().to_vec();
            ids.resize(max_len, 0);
            mask.resize(max_len, 0);
            input_ids.extend(ids);
            attention_mask.extend(mask);
        }

        let shape = (texts.len(), max_len);
        let input_ids = Tensor::from_vec(input_ids, shape, &self.device)?;
        let attention_mask = Tensor::from_vec(attention_mask, shape, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;

        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // Mean pooling over the sequence, ignoring padding.
        let mask = attention_mask
            .unsqueeze(2)?
            .to_dtype(output.dtype())?
            .broadcast_as(output.shape())?;
        let summed = (output * &mask)?.sum(1)?;
        let counts = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
        let pooled = (summed / counts)?;

        let norms = pooled.sqr()?.sum_keepdim(1)?.sqrt()?;
        let normalized = pooled.broadcast_div(&norms)?;

        normalized.to_vec2::<f32>()
    }
}

impl Embedder for LocalEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    fn embed_documents<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
        Box::pin(async move {
            let mut out = Vec::with_capacity(texts.len());
            for batch in texts.chunks(BATCH_SIZE) {
                let refs: Vec<&str> = batch.iter().map(String::as_str).collect();
                let vectors = self
                    .embed_batch(&refs)
                    .map_err(|e| embedding_err("Forward pass failed", e))?;
                out.extend(vectors);
            }
            Ok(out)
        })
    }
}
