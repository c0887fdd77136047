//! RepoGraph CLI.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use repograph::acquire::GitAcquirer;
use repograph::config::Config;
use repograph::engine::{Engine, EngineConfig};
use repograph::error::Result;
use repograph::llm::OpenAiClient;
use repograph::observability::init_logging;
use repograph::store::SqliteGraphStore;
use repograph::types::AskRequest;
use repograph::vector::SqliteVectorIndex;

#[derive(Parser)]
#[command(name = "repograph", version, about = "Ask questions about a codebase via its dependency graph")]
struct Cli {
    /// Path to a config file (defaults to the platform config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API server.
    Serve {
        /// Bind address, e.g. 127.0.0.1:8080.
        #[arg(long)]
        addr: Option<String>,
    },
    /// Clone (or read) a repository and index it.
    Index {
        /// Git URL or local path. Doubles as the repository id.
        repo: String,
    },
    /// Ask a question against an indexed repository.
    Ask {
        repo_id: String,
        question: String,
        /// Retrieval strategy name.
        #[arg(long)]
        strategy: Option<String>,
        /// Number of nearest-neighbor seeds.
        #[arg(long)]
        top_k: Option<usize>,
        /// Traversal depth (clamped to 1..=5).
        #[arg(long)]
        depth: Option<u32>,
    },
    /// Print the full graph of a repository as JSON.
    Export { repo_id: String },
    /// Delete all indexed graphs and embeddings.
    Reset,
}

fn build_engine(config: &Config) -> Result<Arc<Engine>> {
    let graph = Arc::new(SqliteGraphStore::open(&config.db_path)?);
    let vectors = Arc::new(SqliteVectorIndex::open(&config.db_path)?);
    let llm = Arc::new(OpenAiClient::from_env(config));

    Ok(Arc::new(Engine::new(
        graph,
        vectors,
        llm.clone(),
        llm.clone(),
        llm,
        Arc::new(GitAcquirer::new()),
        EngineConfig {
            annotation_concurrency: config.annotation_concurrency,
            max_context_nodes: config.max_context_nodes,
            default_top_k: config.default_top_k,
            score_threshold: config.score_threshold,
            ..EngineConfig::default()
        },
    )))
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let engine = build_engine(&config)?;

    match cli.command {
        Command::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| config.bind_addr.clone());
            repograph::http::serve(engine, &addr).await?;
        }
        Command::Index { repo } => {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| {
                    ProgressStyle::default_spinner()
                }),
            );
            spinner.set_message(format!("indexing {repo}"));
            spinner.enable_steady_tick(Duration::from_millis(120));

            let report = engine.index_repo(&repo).await?;

            spinner.finish_with_message(format!(
                "indexed {}: {} files, {} nodes, {} edges ({} summarized, {} embedded, {} failed)",
                report.repo_id,
                report.files,
                report.nodes,
                report.edges,
                report.summarized,
                report.embedded,
                report.annotation_failures,
            ));
        }
        Command::Ask {
            repo_id,
            question,
            strategy,
            top_k,
            depth,
        } => {
            let request = AskRequest {
                question,
                repo_id,
                top_k,
                strategy,
                depth,
                edge_types: None,
                include_node_types: None,
                directed: None,
                include_incoming: None,
                include_outgoing: None,
            };
            let response = engine.ask(&request).await?;

            println!("{}", response.answer);
            println!();
            println!("Context ({} nodes):", response.context.len());
            for record in &response.context {
                println!(
                    "  [{}] {} ({} hops, score {:.3})",
                    record.kind, record.id, record.hops, record.score
                );
            }
        }
        Command::Export { repo_id } => {
            let snapshot = engine.export(&repo_id)?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Command::Reset => {
            engine.reset()?;
            println!("all graphs and embeddings deleted");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
