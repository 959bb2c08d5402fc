//! A single grid-search experiment.

use crate::chain::{ChainType, RetrievalQa};
use crate::document::Document;
use crate::error::Result;
use crate::grid::ParameterCombination;
use crate::llm::LanguageModel;
use crate::splitter::{ChunkConfig, RecursiveTextSplitter};
use crate::table::experiment_label;
use crate::vector_store::{Retriever, VectorIndex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Chunks handed to the chain per query.
pub const RETRIEVER_K: usize = 2;

/// One parameter combination, run once over the shared corpus.
#[derive(Debug, Clone)]
pub struct Experiment {
    index: usize,
    params: ParameterCombination,
    documents: Arc<Vec<Document>>,
}

/// What an experiment produced.
#[derive(Debug)]
pub struct ExperimentOutcome {
    /// `(query, answer)` in query order.
    pub answers: Vec<(String, String)>,
    /// Start of the run to the last answer.
    pub run_time: Duration,
    /// Time spent embedding and indexing chunks, part of `run_time`.
    pub embedding_time: Duration,
    pub vector_store: Arc<VectorIndex>,
    pub retriever: Retriever,
}

impl Experiment {
    pub fn new(index: usize, params: ParameterCombination, documents: Arc<Vec<Document>>) -> Self {
        Self {
            index,
            params,
            documents,
        }
    }

    /// 1-based position in the grid.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn label(&self) -> String {
        experiment_label(self.index)
    }

    pub fn params(&self) -> &ParameterCombination {
        &self.params
    }

    pub fn documents(&self) -> &Arc<Vec<Document>> {
        &self.documents
    }

    /// Split, index, and answer every query.
    pub async fn run(
        &self,
        queries: &[String],
        llm: Arc<dyn LanguageModel>,
        chain_type: ChainType,
    ) -> Result<ExperimentOutcome> {
        tracing::info!("Experiment {} started", self.index);
        let start = Instant::now();

        let splitter =
            RecursiveTextSplitter::new(ChunkConfig::without_overlap(self.params.chunk_size()))?;
        let chunks = splitter.split_documents(&self.documents);
        tracing::debug!(
            experiment = self.index,
            chunks = chunks.len(),
            chunk_size = self.params.chunk_size(),
            "split documents"
        );

        let embedding_start = Instant::now();
        let index = VectorIndex::from_chunks(
            self.params.vector_store(),
            chunks,
            self.params.embeddings(),
            &self.label(),
        )
        .await?;
        let embedding_time = embedding_start.elapsed();

        let vector_store = Arc::new(index);
        let retriever = vector_store.as_retriever(self.params.embeddings().clone(), RETRIEVER_K);
        let qa = RetrievalQa::from_chain_type(llm, chain_type, retriever.clone());

        tracing::info!("Evaluating experiment {}", self.index);
        let mut answers = Vec::with_capacity(queries.len());
        for query in queries {
            let answer = qa.run(query).await?;
            answers.push((query.clone(), answer));
        }

        let run_time = start.elapsed();
        tracing::info!("Finished experiment {}", self.index);
        tracing::debug!(
            experiment = self.index,
            run_secs = run_time.as_secs_f64(),
            embedding_secs = embedding_time.as_secs_f64(),
            "experiment timings"
        );

        Ok(ExperimentOutcome {
            answers,
            run_time,
            embedding_time,
            vector_store,
            retriever,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BoxFuture;
    use crate::embeddings::{EmbeddingHandle, HashingEmbedder};
    use crate::grid::ParameterGrid;
    use crate::vector_store::VectorStoreKind;

    struct EchoModel;

    impl LanguageModel for EchoModel {
        fn name(&self) -> &str {
            "echo"
        }

        fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>> {
            Box::pin(async move { Ok(format!("{} chars", prompt.chars().count())) })
        }
    }

    fn combination(chunk_size: usize) -> ParameterCombination {
        let embedder: EmbeddingHandle = Arc::new(HashingEmbedder::new(32).unwrap());
        ParameterGrid::new()
            .chunk_sizes([chunk_size])
            .vector_stores([VectorStoreKind::Flat])
            .embeddings([embedder])
            .combinations()
            .unwrap()
            .remove(0)
    }

    fn corpus() -> Arc<Vec<Document>> {
        Arc::new(vec![Document::new(
            "waste.txt",
            "Municipal waste rose in 2022.\n\nRecycling covered a third of it.\n\nLandfill took the rest.",
        )])
    }

    #[tokio::test]
    async fn test_run_answers_every_query_in_order() {
        let experiment = Experiment::new(3, combination(40), corpus());
        let queries = vec!["How much was recycled?".to_string(), "Where did the rest go?".to_string()];

        let outcome = experiment
            .run(&queries, Arc::new(EchoModel), ChainType::Stuff)
            .await
            .unwrap();

        assert_eq!(experiment.label(), "Experiment_3");
        assert_eq!(outcome.answers.len(), 2);
        assert_eq!(outcome.answers[0].0, queries[0]);
        assert_eq!(outcome.answers[1].0, queries[1]);
        assert!(outcome.run_time >= outcome.embedding_time);
        assert_eq!(outcome.retriever.k(), RETRIEVER_K);
        assert!(outcome.vector_store.len() >= 3);
    }

    #[tokio::test]
    async fn test_no_queries_still_builds_index() {
        let experiment = Experiment::new(1, combination(1000), corpus());

        let outcome = experiment
            .run(&[], Arc::new(EchoModel), ChainType::Refine)
            .await
            .unwrap();

        assert!(outcome.answers.is_empty());
        assert_eq!(outcome.vector_store.len(), 1);
    }
}
