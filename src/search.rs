//! Grid search over retrieval QA pipelines.
//!
//! [`GridSearch`] expands a [`ParameterGrid`] into one [`Experiment`] per
//! combination, runs them one after another over the same corpus and
//! queries, and collects answers and timings into an [`InfoTable`] and a
//! [`ResultsTable`].

use crate::chain::ChainType;
use crate::config::DashboardConfig;
use crate::dashboard;
use crate::document::{Document, DocumentLoader};
use crate::error::{Result, VectorboardError};
use crate::experiment::Experiment;
use crate::grid::ParameterGrid;
use crate::llm::LanguageModel;
use crate::table::{GridReport, InfoTable, ResultsTable};
use crate::vector_store::{Retriever, VectorIndex};
use std::sync::Arc;

/// Runs every combination of a parameter grid.
pub struct GridSearch {
    llm: Arc<dyn LanguageModel>,
    chain_type: ChainType,
    dashboard: DashboardConfig,
    documents: Arc<Vec<Document>>,
    experiments: Vec<Experiment>,
    info: InfoTable,
    results: ResultsTable,
    vector_stores: Vec<Arc<VectorIndex>>,
    retrievers: Vec<Retriever>,
    created: bool,
    has_run: bool,
}

impl GridSearch {
    pub fn new(llm: Arc<dyn LanguageModel>, chain_type: ChainType) -> Self {
        Self {
            llm,
            chain_type,
            dashboard: DashboardConfig::default(),
            documents: Arc::new(Vec::new()),
            experiments: Vec::new(),
            info: InfoTable::default(),
            results: ResultsTable::default(),
            vector_stores: Vec::new(),
            retrievers: Vec::new(),
            created: false,
            has_run: false,
        }
    }

    /// Port and bind settings used by [`GridSearch::results`].
    pub fn with_dashboard(mut self, config: DashboardConfig) -> Self {
        self.dashboard = config;
        self
    }

    pub fn chain_type(&self) -> ChainType {
        self.chain_type
    }

    /// Expand `grid` and create one experiment per combination.
    ///
    /// `documents` takes precedence over `loader`; one of them is required.
    /// Nothing is created if the grid or the corpus is rejected.
    pub async fn create_experiments(
        &mut self,
        grid: &ParameterGrid,
        loader: Option<&dyn DocumentLoader>,
        documents: Option<Vec<Document>>,
    ) -> Result<()> {
        if self.has_run {
            return Err(VectorboardError::InvalidState(
                "experiments cannot be recreated after the grid search has run".to_string(),
            ));
        }

        grid.validate()?;

        let documents = match (documents, loader) {
            (Some(documents), loader) => {
                if loader.is_some() {
                    tracing::warn!("both documents and a loader were supplied, using documents");
                }
                documents
            }
            (None, Some(loader)) => loader.load().await?,
            (None, None) => return Err(VectorboardError::MissingDocuments),
        };
        tracing::info!(documents = documents.len(), "loaded corpus");

        let combinations = grid.combinations()?;
        let documents = Arc::new(documents);

        let mut info = InfoTable::new(grid.keys());
        let mut experiments = Vec::with_capacity(combinations.len());
        for (i, params) in combinations.into_iter().enumerate() {
            let experiment = Experiment::new(i + 1, params, Arc::clone(&documents));
            info.add_row(experiment.label(), experiment.params().labels());
            experiments.push(experiment);
        }

        tracing::info!("Created {} experiments", experiments.len());
        self.documents = documents;
        self.experiments = experiments;
        self.info = info;
        self.created = true;
        Ok(())
    }

    /// Run every experiment against `queries`, in creation order.
    ///
    /// A search runs at most once. The first error aborts the remaining
    /// experiments and this instance cannot be run again; build a new
    /// `GridSearch` to retry.
    pub async fn run(&mut self, queries: &[String]) -> Result<()> {
        if !self.created {
            return Err(VectorboardError::InvalidState(
                "create_experiments must be called before run".to_string(),
            ));
        }
        if self.has_run {
            return Err(VectorboardError::InvalidState(
                "grid search has already run".to_string(),
            ));
        }
        self.has_run = true;

        self.results = ResultsTable::new(queries.to_vec());

        for experiment in &self.experiments {
            let outcome = experiment
                .run(queries, Arc::clone(&self.llm), self.chain_type)
                .await?;

            let label = experiment.label();
            let answers = outcome.answers.into_iter().map(|(_, answer)| answer).collect();
            self.results.add_column(label.clone(), answers)?;
            self.info.set_timings(
                &label,
                outcome.run_time.as_secs_f64(),
                outcome.embedding_time.as_secs_f64(),
            );
            self.vector_stores.push(outcome.vector_store);
            self.retrievers.push(outcome.retriever);
        }

        tracing::info!(
            experiments = self.experiments.len(),
            queries = queries.len(),
            "grid search finished"
        );
        Ok(())
    }

    /// Serve the dashboard until Ctrl-C when `dashboard` is set.
    ///
    /// `share` binds on all interfaces instead of localhost.
    pub async fn results(&self, dashboard: bool, share: bool) -> Result<()> {
        if !dashboard {
            return Ok(());
        }
        let config = DashboardConfig {
            share: share || self.dashboard.share,
            ..self.dashboard.clone()
        };
        dashboard::serve(self.report(), &config).await
    }

    pub fn experiments(&self) -> &[Experiment] {
        &self.experiments
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn info_table(&self) -> &InfoTable {
        &self.info
    }

    pub fn results_table(&self) -> &ResultsTable {
        &self.results
    }

    /// Indexes built so far, in run order.
    pub fn vector_stores(&self) -> &[Arc<VectorIndex>] {
        &self.vector_stores
    }

    /// Retrievers built so far, in run order.
    pub fn retrievers(&self) -> &[Retriever] {
        &self.retrievers
    }

    /// Snapshot of both tables.
    pub fn report(&self) -> GridReport {
        GridReport {
            info: self.info.clone(),
            results: self.results.clone(),
        }
    }

    /// Print both tables to stdout.
    pub fn print_summary(&self) {
        println!("\n========== Grid Search Results ==========");
        println!(
            "Experiments: {}  Queries: {}  Documents: {}  Chain: {}",
            self.experiments.len(),
            self.results.queries().len(),
            self.documents.len(),
            self.chain_type
        );
        println!("-----------------------------------------");
        print!("{}", self.info.to_text());
        println!("-----------------------------------------");
        print!("{}", self.results.to_text());
        println!("=========================================\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BoxFuture;
    use crate::embeddings::{EmbeddingHandle, HashingEmbedder};
    use crate::vector_store::VectorStoreKind;

    struct FixedModel;

    impl LanguageModel for FixedModel {
        fn name(&self) -> &str {
            "fixed"
        }

        fn complete<'a>(&'a self, _prompt: &'a str) -> BoxFuture<'a, Result<String>> {
            Box::pin(async { Ok("fixed answer".to_string()) })
        }
    }

    fn search() -> GridSearch {
        GridSearch::new(Arc::new(FixedModel), ChainType::Stuff)
    }

    fn grid() -> ParameterGrid {
        let embedder: EmbeddingHandle = Arc::new(HashingEmbedder::new(16).unwrap());
        ParameterGrid::new()
            .chunk_sizes([100, 200])
            .vector_stores([VectorStoreKind::Flat])
            .embeddings([embedder])
    }

    fn docs() -> Vec<Document> {
        vec![Document::new("a.txt", "Paper and glass are recycled.")]
    }

    #[tokio::test]
    async fn test_run_before_create_is_invalid() {
        let mut search = search();
        let err = search.run(&["q".to_string()]).await.unwrap_err();
        assert!(matches!(err, VectorboardError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_second_run_is_invalid() {
        let mut search = search();
        search.create_experiments(&grid(), None, Some(docs())).await.unwrap();
        search.run(&["q".to_string()]).await.unwrap();

        let err = search.run(&["q".to_string()]).await.unwrap_err();
        assert!(matches!(err, VectorboardError::InvalidState(_)));
        assert_eq!(search.results_table().shape(), (1, 2));
    }

    #[tokio::test]
    async fn test_failed_run_cannot_be_retried() {
        let mut search = search();
        let grid = grid().vector_stores([VectorStoreKind::Persistent {
            path: "/dev/null/not-a-dir".into(),
        }]);
        search.create_experiments(&grid, None, Some(docs())).await.unwrap();

        assert!(search.run(&["q".to_string()]).await.is_err());
        let err = search.run(&["q".to_string()]).await.unwrap_err();
        assert!(matches!(err, VectorboardError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_results_without_dashboard_is_noop() {
        let search = search();
        search.results(false, true).await.unwrap();
    }

    #[tokio::test]
    async fn test_grid_error_leaves_search_empty() {
        let mut search = search();
        let err = search
            .create_experiments(&ParameterGrid::new().chunk_sizes([100]), None, Some(docs()))
            .await
            .unwrap_err();
        assert!(err.is_config_error());
        assert!(search.experiments().is_empty());
        assert!(search.documents().is_empty());
    }
}
