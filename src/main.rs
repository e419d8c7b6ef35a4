//! # Exam Verifier CLI (`verifier`)
//!
//! ## Usage
//!
//! ```bash
//! verifier --config ./config/verifier.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `verifier serve` | Index the corpus, then start the HTTP API |
//! | `verifier verify` | Grade one answer and print the result as JSON |
//! | `verifier corpus` | List the documents the corpus loader finds |
//! | `verifier index` | Embed and index the corpus, report counts, exit |
//!
//! A `.env` file in the working directory is loaded before the config, so
//! `GROQ_API_KEY` / `OPENAI_API_KEY` can live there.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use exam_verifier::config::{load_config, Config};
use exam_verifier::corpus::load_corpus;
use exam_verifier::embedding::{create_provider, EmbeddingProvider};
use exam_verifier::grading::create_client;
use exam_verifier::index::InMemoryIndex;
use exam_verifier::indexer::{build_index, build_index_best_effort};
use exam_verifier::logging::init_logging;
use exam_verifier::server::run_server;
use exam_verifier::verifier::Verifier;

/// Exam Verifier: grade free-text exam answers against a reference
/// knowledge base with retrieval-augmented generation.
#[derive(Parser)]
#[command(
    name = "verifier",
    about = "Grade free-text exam answers against a reference knowledge base",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Defaults apply if it does not exist.
    #[arg(long, global = true, default_value = "./config/verifier.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index the corpus and start the HTTP server.
    ///
    /// The server starts listening only after indexing finishes. If
    /// indexing fails, the server still starts with an empty index.
    Serve,

    /// Grade a single answer and print the rubric as JSON.
    Verify {
        /// The exam question.
        #[arg(long)]
        question: String,

        /// The student's answer.
        #[arg(long)]
        answer: String,

        /// Number of reference documents to retrieve (default: `retrieval.top_k`).
        #[arg(long)]
        k: Option<usize>,
    },

    /// List the corpus documents and their ids.
    Corpus,

    /// Embed and index the corpus, then report what was indexed.
    ///
    /// Unlike `serve`, an indexing failure is reported as an error.
    Index,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; real env vars still apply.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    init_logging(&config.logging);

    match cli.command {
        Commands::Serve => {
            let verifier = build_verifier(&config).await?;
            run_server(&config, verifier).await?;
        }
        Commands::Verify {
            question,
            answer,
            k,
        } => {
            let verifier = build_verifier(&config).await?;
            let k = k.unwrap_or(config.retrieval.top_k);
            match verifier.verify_with_k(&question, &answer, k).await {
                Ok(result) => println!("{}", serde_json::to_string_pretty(&result)?),
                Err(e) => {
                    println!("{}", serde_json::to_string_pretty(&e.to_error_result())?);
                    std::process::exit(1);
                }
            }
        }
        Commands::Corpus => {
            let documents = load_corpus(&config.corpus)?;
            if documents.is_empty() {
                println!("No documents found in {}", config.corpus.dir.display());
            }
            for doc in &documents {
                println!("{}\t{}\t{} bytes", doc.id, doc.source, doc.text.len());
            }
        }
        Commands::Index => {
            let documents = load_corpus(&config.corpus)?;
            let provider = load_provider(&config).await?;
            let index = InMemoryIndex::new();
            let report = build_index(documents, provider.as_ref(), &index).await?;
            println!("index {}", config.corpus.dir.display());
            println!("  model: {}", provider.model_name());
            println!("  documents indexed: {}", report.documents);
            if let Some(dims) = report.dims {
                println!("  dimensions: {}", dims);
            }
            println!("ok");
        }
    }

    Ok(())
}

/// The local provider loads (and may download) its model, so construct it
/// off the async executor.
async fn load_provider(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    let embedding_config = config.embedding.clone();
    tokio::task::spawn_blocking(move || create_provider(&embedding_config)).await?
}

/// Load the corpus, index it, and wire the verifier. Indexing completes
/// before this returns, so callers never see a partially built index.
async fn build_verifier(config: &Config) -> Result<Arc<Verifier>> {
    let grader = create_client(&config.grading)?;
    let documents = load_corpus(&config.corpus)?;
    let provider = load_provider(config).await?;

    let index = Arc::new(InMemoryIndex::new());
    let report = build_index_best_effort(documents, provider.as_ref(), index.as_ref()).await;
    tracing::info!(documents = report.documents, "index ready");

    let verifier = Verifier::new(provider, index, grader)
        .with_top_k(config.retrieval.top_k)
        .with_stage_timeout(config.server.request_timeout());
    Ok(Arc::new(verifier))
}
