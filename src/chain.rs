//! Retrieval question-answering chains.

use crate::document::Chunk;
use crate::error::{Result, VectorboardError};
use crate::llm::{LanguageModel, Prompts};
use crate::vector_store::Retriever;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// How retrieved chunks are combined into an answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainType {
    /// All chunks in one prompt.
    #[default]
    Stuff,
    /// One call per chunk, each refining the previous answer.
    Refine,
}

impl fmt::Display for ChainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainType::Stuff => write!(f, "stuff"),
            ChainType::Refine => write!(f, "refine"),
        }
    }
}

impl FromStr for ChainType {
    type Err = VectorboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "stuff" => Ok(ChainType::Stuff),
            "refine" => Ok(ChainType::Refine),
            other => Err(VectorboardError::Config(format!(
                "unknown chain type '{other}' (expected stuff or refine)"
            ))),
        }
    }
}

/// Retrieve chunks for a query, then ask the language model.
pub struct RetrievalQa {
    llm: Arc<dyn LanguageModel>,
    chain_type: ChainType,
    retriever: Retriever,
}

impl RetrievalQa {
    pub fn from_chain_type(
        llm: Arc<dyn LanguageModel>,
        chain_type: ChainType,
        retriever: Retriever,
    ) -> Self {
        Self {
            llm,
            chain_type,
            retriever,
        }
    }

    pub fn chain_type(&self) -> ChainType {
        self.chain_type
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Answer one query.
    pub async fn run(&self, query: &str) -> Result<String> {
        let chunks = self.retriever.get_relevant_documents(query).await?;
        tracing::debug!(chunks = chunks.len(), chain = %self.chain_type, "retrieved context");

        match self.chain_type {
            ChainType::Stuff => self.stuff(query, &chunks).await,
            ChainType::Refine => self.refine(query, &chunks).await,
        }
    }

    async fn stuff(&self, query: &str, chunks: &[Chunk]) -> Result<String> {
        let context = chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = Prompts::render(
            Prompts::stuff_qa(),
            &[("context", &context), ("question", query)],
        );
        self.llm.complete(&prompt).await
    }

    async fn refine(&self, query: &str, chunks: &[Chunk]) -> Result<String> {
        let (first, rest) = match chunks.split_first() {
            Some((first, rest)) => (first.content.as_str(), rest),
            None => ("", chunks),
        };

        let prompt = Prompts::render(
            Prompts::refine_initial(),
            &[("context", first), ("question", query)],
        );
        let mut answer = self.llm.complete(&prompt).await?;

        for chunk in rest {
            let prompt = Prompts::render(
                Prompts::refine_step(),
                &[
                    ("question", query),
                    ("existing_answer", &answer),
                    ("context", &chunk.content),
                ],
            );
            answer = self.llm.complete(&prompt).await?;
        }

        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BoxFuture;
    use crate::document::{Chunk, DocumentMetadata};
    use crate::embeddings::{EmbeddingHandle, HashingEmbedder};
    use crate::vector_store::{VectorIndex, VectorStoreKind};
    use std::sync::Mutex;

    /// Records prompts and answers with the call number.
    #[derive(Default)]
    struct RecordingModel {
        prompts: Mutex<Vec<String>>,
    }

    impl LanguageModel for RecordingModel {
        fn name(&self) -> &str {
            "recording"
        }

        fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>> {
            Box::pin(async move {
                let mut prompts = self.prompts.lock().unwrap();
                prompts.push(prompt.to_string());
                Ok(format!("answer {}", prompts.len()))
            })
        }
    }

    fn chunk(text: &str, i: usize) -> Chunk {
        Chunk {
            content: text.to_string(),
            metadata: DocumentMetadata {
                source: "facts.txt".to_string(),
                page: None,
            },
            chunk_index: i,
        }
    }

    async fn retriever(texts: &[&str]) -> Retriever {
        let embedder: EmbeddingHandle = Arc::new(HashingEmbedder::new(64).unwrap());
        let chunks = texts.iter().enumerate().map(|(i, t)| chunk(t, i)).collect();
        let index = VectorIndex::from_chunks(&VectorStoreKind::Flat, chunks, &embedder, "test")
            .await
            .unwrap();
        Arc::new(index).as_retriever(embedder, 2)
    }

    #[test]
    fn test_chain_type_parse_and_display() {
        assert_eq!("stuff".parse::<ChainType>().unwrap(), ChainType::Stuff);
        assert_eq!("Refine".parse::<ChainType>().unwrap(), ChainType::Refine);
        assert!("map_reduce".parse::<ChainType>().unwrap_err().is_config_error());
        assert_eq!(ChainType::Refine.to_string(), "refine");
    }

    #[tokio::test]
    async fn test_stuff_uses_one_call_with_all_chunks() {
        let llm = Arc::new(RecordingModel::default());
        let retriever = retriever(&["glass is recycled", "paper is recycled", "cats"]).await;
        let qa = RetrievalQa::from_chain_type(llm.clone(), ChainType::Stuff, retriever);

        let answer = qa.run("what is recycled?").await.unwrap();

        assert_eq!(answer, "answer 1");
        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("glass is recycled"));
        assert!(prompts[0].contains("paper is recycled"));
        assert!(prompts[0].contains("Question: what is recycled?"));
    }

    #[tokio::test]
    async fn test_refine_calls_once_per_chunk() {
        let llm = Arc::new(RecordingModel::default());
        let retriever = retriever(&["glass is recycled", "paper is recycled"]).await;
        let qa = RetrievalQa::from_chain_type(llm.clone(), ChainType::Refine, retriever);

        let answer = qa.run("what is recycled?").await.unwrap();

        assert_eq!(answer, "answer 2");
        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("existing answer: answer 1"));
    }

    #[tokio::test]
    async fn test_empty_index_still_asks() {
        let llm = Arc::new(RecordingModel::default());
        let retriever = retriever(&[]).await;
        let qa = RetrievalQa::from_chain_type(llm.clone(), ChainType::Refine, retriever);

        assert_eq!(qa.run("anything?").await.unwrap(), "answer 1");
        assert_eq!(llm.prompts.lock().unwrap().len(), 1);
    }
}
