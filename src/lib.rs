//! Vectorboard - grid search for retrieval question-answering pipelines.
//!
//! Vectorboard expands a grid of pipeline settings (chunk size, embedding
//! model, vector store backend) into every combination, runs one retrieval
//! QA pipeline per combination over the same corpus and evaluation queries,
//! and collects the answers and timings into tables that can be browsed in
//! a small web dashboard.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use vectorboard::{
//!     chain::ChainType,
//!     config::Config,
//!     document::TextLoader,
//!     embeddings::EmbeddingSpec,
//!     grid::ParameterGrid,
//!     llm::LlmClient,
//!     search::GridSearch,
//!     vector_store::VectorStoreKind,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     config.validate()?;
//!
//!     let grid = ParameterGrid::new()
//!         .chunk_sizes([500])
//!         .vector_stores([VectorStoreKind::Flat])
//!         .embeddings([
//!             EmbeddingSpec::Hashing { dimensions: 256 }.resolve(&config)?,
//!             EmbeddingSpec::OpenAi { model: "text-embedding-3-small".into() }.resolve(&config)?,
//!         ]);
//!
//!     let llm = Arc::new(LlmClient::new(config.llm.clone()));
//!     let mut search = GridSearch::new(llm, ChainType::Stuff);
//!     let loader = TextLoader::new("recycling.txt");
//!     search.create_experiments(&grid, Some(&loader), None).await?;
//!
//!     search.run(&["What share of waste was recycled in 2022?".to_string()]).await?;
//!     search.results(true, false).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **ParameterGrid**: named candidate values, expanded by Cartesian product
//! - **Experiment**: one split / index / retrieve / answer run with timings
//! - **GridSearch**: creates, runs and aggregates experiments
//! - **Dashboard**: axum server rendering the result tables and a timing chart

use std::future::Future;
use std::pin::Pin;

pub mod chain;
pub mod config;
pub mod dashboard;
pub mod document;
pub mod embeddings;
pub mod error;
pub mod experiment;
pub mod grid;
pub mod llm;
pub mod persistence;
pub mod search;
pub mod splitter;
pub mod table;
pub mod vector_store;

/// Boxed future returned by the backend traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// Re-export commonly used types
pub use chain::{ChainType, RetrievalQa};
pub use config::Config;
pub use document::{Chunk, Document, DocumentLoader};
pub use embeddings::{Embedder, EmbeddingHandle, EmbeddingSpec};
pub use error::{Result, VectorboardError};
pub use experiment::{Experiment, ExperimentOutcome};
pub use grid::{ParamValue, ParameterCombination, ParameterGrid};
pub use llm::{LanguageModel, LlmClient};
pub use search::GridSearch;
pub use table::{GridReport, InfoTable, ResultsTable};
pub use vector_store::{Retriever, VectorIndex, VectorStoreKind};
