//! Feature-hashing embedder.
//!
//! Lowercased alphanumeric tokens are hashed into a fixed number of buckets
//! with a signed FNV-1a hash, then the vector is L2-normalized. Needs no
//! model download or network, which makes it useful as a fast baseline.

use super::Embedder;
use crate::BoxFuture;
use crate::error::{Result, VectorboardError};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

pub struct HashingEmbedder {
    dimensions: usize,
    name: String,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(VectorboardError::InvalidGrid(
                "hashing embedder needs at least one dimension".to_string(),
            ));
        }
        Ok(Self {
            dimensions,
            name: format!("hashing-{dimensions}"),
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let lowered = text.to_lowercase();
        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

impl Embedder for HashingEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    fn embed_documents<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
        Box::pin(async move { Ok(texts.iter().map(|t| self.embed_one(t)).collect()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::cosine_similarity;

    #[test]
    fn test_deterministic_and_normalized() {
        let embedder = HashingEmbedder::new(128).unwrap();
        let a = embedder.embed_one("Recycling rates rose in 2022");
        let b = embedder.embed_one("recycling RATES rose in 2022!");
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_overlap_scores_higher() {
        let embedder = HashingEmbedder::new(256).unwrap();
        let query = embedder.embed_one("household waste collected");
        let related = embedder.embed_one("the amount of household waste collected grew");
        let unrelated = embedder.embed_one("quarterly revenue of the airline");
        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(8).unwrap();
        assert!(embedder.embed_one("  ...  ").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_batch_preserves_order() {
        let embedder = HashingEmbedder::new(16).unwrap();
        let texts = vec!["alpha".to_string(), "beta".to_string()];
        let batch = tokio_test::block_on(embedder.embed_documents(&texts)).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], embedder.embed_one("alpha"));
        assert_eq!(batch[1], embedder.embed_one("beta"));
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(HashingEmbedder::new(0).is_err());
    }
}
