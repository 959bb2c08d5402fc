//! In-memory vector indexes and retrievers.

use crate::document::Chunk;
use crate::embeddings::{EmbeddingHandle, cosine_similarity, euclidean_distance};
use crate::error::{Result, VectorboardError};
use crate::persistence;
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Vector store backends that can appear in a parameter grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VectorStoreKind {
    /// Exact search by cosine similarity.
    Flat,
    /// Exact search by euclidean distance.
    FlatL2,
    /// Cosine index written to `path/<experiment>.bin` after it is built.
    Persistent { path: PathBuf },
}

impl VectorStoreKind {
    pub fn metric(&self) -> DistanceMetric {
        match self {
            VectorStoreKind::FlatL2 => DistanceMetric::Euclidean,
            VectorStoreKind::Flat | VectorStoreKind::Persistent { .. } => DistanceMetric::Cosine,
        }
    }
}

impl fmt::Display for VectorStoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VectorStoreKind::Flat => write!(f, "flat"),
            VectorStoreKind::FlatL2 => write!(f, "flat_l2"),
            VectorStoreKind::Persistent { path } => write!(f, "persistent:{}", path.display()),
        }
    }
}

/// How index entries are ranked against a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Higher is closer.
    Cosine,
    /// Lower is closer.
    Euclidean,
}

/// A vector index entry.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// A chunk returned from a search with its score under the index metric.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Vector search index.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct VectorIndex {
    metric: DistanceMetric,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Create a new empty vector index.
    pub fn new(metric: DistanceMetric) -> Self {
        Self {
            metric,
            entries: Vec::new(),
        }
    }

    /// Embed `chunks` and build an index of the given kind.
    ///
    /// `label` names the on-disk file for persistent stores.
    pub async fn from_chunks(
        kind: &VectorStoreKind,
        chunks: Vec<Chunk>,
        embedder: &EmbeddingHandle,
        label: &str,
    ) -> Result<Self> {
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = embedder.embed_documents(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(VectorboardError::Embedding(format!(
                "{} returned {} embeddings for {} chunks",
                embedder.name(),
                embeddings.len(),
                chunks.len()
            )));
        }

        let entries = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexEntry { chunk, embedding })
            .collect();

        let index = Self {
            metric: kind.metric(),
            entries,
        };

        if let VectorStoreKind::Persistent { path } = kind {
            let file = path.join(format!("{label}.bin"));
            persistence::save_index(&index, &file)?;
            tracing::debug!(path = %file.display(), "persisted vector index");
        }

        Ok(index)
    }

    /// Add a pre-computed entry.
    pub fn push(&mut self, chunk: Chunk, embedding: Vec<f32>) {
        self.entries.push(IndexEntry { chunk, embedding });
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Number of chunks in the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get all entries.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// The `k` entries closest to `query`, closest first. Ties keep insertion order.
    pub fn similarity_search_by_vector(&self, query: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut results: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|entry| ScoredChunk {
                chunk: entry.chunk.clone(),
                score: match self.metric {
                    DistanceMetric::Cosine => cosine_similarity(query, &entry.embedding),
                    DistanceMetric::Euclidean => euclidean_distance(query, &entry.embedding),
                },
            })
            .collect();

        match self.metric {
            DistanceMetric::Cosine => results.sort_by(|a, b| b.score.total_cmp(&a.score)),
            DistanceMetric::Euclidean => results.sort_by(|a, b| a.score.total_cmp(&b.score)),
        }

        results.truncate(k);
        results
    }

    /// Embed `query` and search.
    pub async fn similarity_search(
        &self,
        query: &str,
        embedder: &EmbeddingHandle,
        k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let query_embedding = embedder.embed_query(query).await?;
        Ok(self.similarity_search_by_vector(&query_embedding, k))
    }

    /// Wrap a shared index as a top-`k` retriever.
    pub fn as_retriever(self: &Arc<Self>, embedder: EmbeddingHandle, k: usize) -> Retriever {
        Retriever {
            index: Arc::clone(self),
            embedder,
            k,
        }
    }
}

/// Top-k retrieval over a vector index.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<VectorIndex>,
    embedder: EmbeddingHandle,
    k: usize,
}

impl Retriever {
    pub fn k(&self) -> usize {
        self.k
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Chunks most relevant to `query`, best first.
    pub async fn get_relevant_documents(&self, query: &str) -> Result<Vec<Chunk>> {
        let results = self
            .index
            .similarity_search(query, &self.embedder, self.k)
            .await?;
        Ok(results.into_iter().map(|r| r.chunk).collect())
    }
}

impl fmt::Debug for Retriever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retriever")
            .field("embedder", &self.embedder.name())
            .field("k", &self.k)
            .field("entries", &self.index.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentMetadata;
    use crate::embeddings::HashingEmbedder;
    use tempfile::TempDir;

    fn chunk(text: &str, i: usize) -> Chunk {
        Chunk {
            content: text.to_string(),
            metadata: DocumentMetadata {
                source: "test".to_string(),
                page: None,
            },
            chunk_index: i,
        }
    }

    fn corpus() -> Vec<Chunk> {
        vec![
            chunk("household waste collected in 2022", 0),
            chunk("energy recovery from incineration", 1),
            chunk("materials recycled into new products", 2),
        ]
    }

    #[test]
    fn test_search_by_vector_cosine_and_l2() {
        let mut cosine = VectorIndex::new(DistanceMetric::Cosine);
        cosine.push(chunk("a", 0), vec![1.0, 0.0]);
        cosine.push(chunk("b", 1), vec![0.0, 1.0]);
        cosine.push(chunk("c", 2), vec![0.7, 0.7]);

        let top = cosine.similarity_search_by_vector(&[1.0, 0.1], 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].chunk.content, "a");
        assert_eq!(top[1].chunk.content, "c");

        let mut l2 = VectorIndex::new(DistanceMetric::Euclidean);
        l2.push(chunk("far", 0), vec![10.0, 10.0]);
        l2.push(chunk("near", 1), vec![0.0, 0.5]);
        let top = l2.similarity_search_by_vector(&[0.0, 0.0], 1);
        assert_eq!(top[0].chunk.content, "near");
    }

    #[tokio::test]
    async fn test_from_chunks_and_retriever() {
        let embedder: EmbeddingHandle = Arc::new(HashingEmbedder::new(256).unwrap());
        let index = VectorIndex::from_chunks(&VectorStoreKind::Flat, corpus(), &embedder, "t")
            .await
            .unwrap();
        assert_eq!(index.len(), 3);

        let retriever = Arc::new(index).as_retriever(embedder, 2);
        let docs = retriever
            .get_relevant_documents("how much household waste was collected")
            .await
            .unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].chunk_index, 0);
    }

    #[tokio::test]
    async fn test_persistent_store_writes_file() {
        let dir = TempDir::new().unwrap();
        let kind = VectorStoreKind::Persistent {
            path: dir.path().to_path_buf(),
        };
        let embedder: EmbeddingHandle = Arc::new(HashingEmbedder::new(32).unwrap());
        let index = VectorIndex::from_chunks(&kind, corpus(), &embedder, "Experiment_1")
            .await
            .unwrap();

        let file = dir.path().join("Experiment_1.bin");
        let loaded = persistence::load_index(&file).unwrap();
        assert_eq!(loaded.len(), index.len());
        assert_eq!(loaded.metric(), DistanceMetric::Cosine);
    }

    #[tokio::test]
    async fn test_empty_corpus_builds_empty_index() {
        let embedder: EmbeddingHandle = Arc::new(HashingEmbedder::new(8).unwrap());
        let index = VectorIndex::from_chunks(&VectorStoreKind::FlatL2, Vec::new(), &embedder, "e")
            .await
            .unwrap();
        assert!(index.is_empty());
        assert!(index.similarity_search_by_vector(&[0.0; 8], 2).is_empty());
    }

    #[test]
    fn test_kind_from_yaml_and_display() {
        let kinds: Vec<VectorStoreKind> =
            serde_yaml::from_str("- type: flat\n- type: flat_l2\n- type: persistent\n  path: idx\n")
                .unwrap();
        let labels: Vec<String> = kinds.iter().map(ToString::to_string).collect();
        assert_eq!(labels, vec!["flat", "flat_l2", "persistent:idx"]);
        assert_eq!(kinds[1].metric(), DistanceMetric::Euclidean);
    }
}
