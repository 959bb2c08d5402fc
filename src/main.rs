//! Vectorboard CLI
//!
//! Grid search over chunk size, embedding model and vector store for a
//! retrieval QA pipeline, with a web dashboard for the results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use vectorboard::{
    chain::ChainType,
    config::Config,
    dashboard,
    document::{Document, loader_for_path},
    grid::ParameterGrid,
    llm::LlmClient,
    persistence::{file_size, load_report, save_report},
    search::GridSearch,
};

/// Vectorboard - grid search for retrieval QA pipelines
#[derive(Parser)]
#[command(name = "vectorboard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a grid search and show the dashboard
    Run {
        /// YAML file mapping parameter names to candidate values
        #[arg(short, long)]
        grid: PathBuf,

        /// Documents to index (text, markdown, pdf or directories)
        #[arg(short, long, required = true, num_args = 1..)]
        docs: Vec<PathBuf>,

        /// File with one evaluation query per line
        #[arg(long)]
        queries: Option<PathBuf>,

        /// Evaluation query (repeatable)
        #[arg(short, long = "query")]
        query: Vec<String>,

        /// How retrieved chunks are combined
        #[arg(long, default_value = "stuff")]
        chain: ChainType,

        /// Save the report as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the tables and exit without serving the dashboard
        #[arg(long)]
        no_dashboard: bool,

        /// Serve on all interfaces instead of localhost
        #[arg(long)]
        share: bool,

        /// Dashboard port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Serve the dashboard for a saved report
    Serve {
        /// Path to a report written by `run --output`
        report: PathBuf,

        /// Serve on all interfaces instead of localhost
        #[arg(long)]
        share: bool,

        /// Dashboard port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Test LLM connection
    Test,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            grid,
            docs,
            queries,
            query,
            chain,
            output,
            no_dashboard,
            share,
            port,
        } => {
            let args = RunArgs {
                grid,
                docs,
                queries,
                query,
                chain,
                output,
                dashboard: !no_dashboard,
                share,
                port,
            };
            cmd_run(args).await
        }
        Commands::Serve {
            report,
            share,
            port,
        } => cmd_serve(report, share, port).await,
        Commands::Test => cmd_test().await,
    }
}

struct RunArgs {
    grid: PathBuf,
    docs: Vec<PathBuf>,
    queries: Option<PathBuf>,
    query: Vec<String>,
    chain: ChainType,
    output: Option<PathBuf>,
    dashboard: bool,
    share: bool,
    port: Option<u16>,
}

async fn cmd_run(args: RunArgs) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    if let Some(port) = args.port {
        config.dashboard.port = port;
    }

    let grid_yaml = std::fs::read_to_string(&args.grid)
        .with_context(|| format!("Failed to read grid file '{}'", args.grid.display()))?;
    let grid = ParameterGrid::from_yaml_str(&grid_yaml, &config).context("Invalid grid")?;

    let queries = collect_queries(args.queries.as_deref(), args.query)?;
    if queries.is_empty() {
        anyhow::bail!("No queries given. Use --queries <file> or -q <query>.");
    }

    println!("Grid: {} combinations", grid.combination_count());
    println!("Queries: {}", queries.len());
    println!("Using model: {}", config.llm.model);

    let llm = Arc::new(LlmClient::new(config.llm.clone()));
    let mut search = GridSearch::new(llm, args.chain).with_dashboard(config.dashboard.clone());

    if let [path] = args.docs.as_slice() {
        let loader = loader_for_path(path);
        search
            .create_experiments(&grid, Some(&*loader), None)
            .await
            .context("Failed to create experiments")?;
    } else {
        let documents = load_all(&args.docs).await?;
        search
            .create_experiments(&grid, None, Some(documents))
            .await
            .context("Failed to create experiments")?;
    }

    let start = Instant::now();
    search.run(&queries).await.context("Grid search failed")?;
    println!("Grid search finished in {:.2?}", start.elapsed());

    search.print_summary();

    if let Some(output) = &args.output {
        save_report(&search.report(), output).context("Failed to save report")?;
        let size = file_size(output)?;
        println!("Report saved to: {} ({:.1} KB)", output.display(), size as f64 / 1024.0);
    }

    search
        .results(args.dashboard, args.share)
        .await
        .context("Dashboard failed")?;
    Ok(())
}

async fn cmd_serve(report_path: PathBuf, share: bool, port: Option<u16>) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let report = load_report(&report_path)
        .with_context(|| format!("Failed to load report '{}'", report_path.display()))?;

    let mut dashboard_config = config.dashboard;
    dashboard_config.share |= share;
    if let Some(port) = port {
        dashboard_config.port = port;
    }

    println!(
        "Serving {} experiments from {}",
        report.info.rows().len(),
        report_path.display()
    );
    dashboard::serve(report, &dashboard_config)
        .await
        .context("Dashboard failed")?;
    Ok(())
}

async fn cmd_test() -> Result<()> {
    println!("Testing LLM connection...\n");

    let config = Config::load().context("Failed to load configuration")?;

    let key_prefix: String = config.llm.api_key.chars().take(8).collect();
    println!("Configuration:");
    println!("  API Base:  {}", config.llm.api_base);
    println!("  Model:     {}", config.llm.model);
    println!("  API Key:   {}...", key_prefix);
    println!();

    if let Err(e) = config.validate() {
        println!("Configuration error: {}", e);
        return Ok(());
    }

    let client = LlmClient::new(config.llm);

    println!("Sending test request...");
    match client.test_connection().await {
        Ok(()) => println!("Connection successful!"),
        Err(e) => println!("Connection failed: {}", e),
    }

    Ok(())
}

/// Queries from `--queries` first, then `-q` flags. Blank lines are skipped.
fn collect_queries(file: Option<&Path>, inline: Vec<String>) -> Result<Vec<String>> {
    let mut queries = Vec::new();
    if let Some(path) = file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read queries '{}'", path.display()))?;
        queries.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        );
    }
    queries.extend(inline);
    Ok(queries)
}

async fn load_all(paths: &[PathBuf]) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    for path in paths {
        let loaded = loader_for_path(path)
            .load()
            .await
            .with_context(|| format!("Failed to load '{}'", path.display()))?;
        documents.extend(loaded);
    }
    Ok(documents)
}
