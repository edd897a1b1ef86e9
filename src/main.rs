use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use scribe_docgen::{DocGenConfig, DocGenerator, DocTarget};
use scribe_index::indexer::{Indexer, IndexerConfig};
use scribe_index::retriever::{RetrievalConfig, Retriever};
use scribe_index::{ChunkerConfig, HeuristicTokenizer, TokenCounter};
use scribe_llm::openai::OpenAiProvider;
use scribe_store::VectorStore;
use scribe_store::catalog::Catalog;
use scribe_store::qdrant::QdrantVectorStore;

use crate::config::Config;

mod config;

#[derive(Parser)]
#[command(name = "scribe", version, about = "Codebase ingestion and RAG documentation generation")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "config/default.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a source tree as a new project.
    Ingest {
        /// Root directory of the codebase.
        path: PathBuf,
        /// Project name to register.
        #[arg(long)]
        project: String,
    },
    /// Generate documentation for an indexed file.
    Generate {
        /// Project id returned by ingest.
        #[arg(long)]
        project: String,
        /// File path relative to the ingested root.
        #[arg(long)]
        file: String,
        /// Document a single declaration instead of the whole file.
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Search a project's indexed chunks.
    Search {
        /// Project id returned by ingest.
        #[arg(long)]
        project: String,
        query: String,
        #[arg(long, default_value_t = 10)]
        top_k: u64,
    },
    /// Remove a project and all of its indexed chunks.
    Remove {
        /// Project id returned by ingest.
        #[arg(long)]
        project: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    let api_key = std::env::var("SCRIBE_OPENAI_API_KEY").unwrap_or_default();
    let provider = Arc::new(OpenAiProvider::new(
        api_key,
        config.llm.base_url.clone(),
        config.llm.model.clone(),
        config.llm.max_tokens,
        Some(config.llm.embedding_model.clone()),
    ));

    let store: Arc<dyn VectorStore> = Arc::new(
        QdrantVectorStore::new(&config.store.qdrant_url)
            .context("failed to connect to Qdrant")?,
    );

    if let Some(parent) = std::path::Path::new(&config.store.catalog_path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).context("failed to create catalog directory")?;
    }
    let catalog = Arc::new(Catalog::new(&config.store.catalog_path).await?);
    let tokenizer: Arc<dyn TokenCounter> = Arc::new(HeuristicTokenizer);

    match cli.command {
        Command::Ingest { path, project } => {
            let indexer = Indexer::new(
                store,
                catalog,
                provider,
                tokenizer,
                indexer_config(&config),
            );
            let report = indexer.ingest(&path, &project).await?;

            println!("project: {}", report.project_id);
            println!(
                "files: {}/{} indexed, chunks: {} ({} degraded), {} ms",
                report.files_indexed,
                report.files_scanned,
                report.chunks_created,
                report.chunks_degraded,
                report.duration_ms
            );
            for err in &report.errors {
                eprintln!("error: {err}");
            }
        }
        Command::Generate {
            project,
            file,
            symbol,
        } => {
            let retriever = Retriever::new(store, provider.clone(), retrieval_config(&config));
            let generator = DocGenerator::new(
                retriever,
                provider,
                catalog,
                tokenizer,
                DocGenConfig {
                    max_context_tokens: config.docgen.max_context_tokens,
                    reserved_tokens: config.docgen.reserved_tokens,
                },
            );

            let target = symbol.map_or(DocTarget::File, DocTarget::Symbol);
            let doc = generator.generate(&project, &file, &target).await?;

            println!("{}", doc.content);
            tracing::info!(
                id = %doc.document_id,
                context_chunks = doc.context_chunks,
                prompt_tokens = doc.prompt_tokens,
                completion_tokens = doc.completion_tokens,
                "documentation generated"
            );
        }
        Command::Search {
            project,
            query,
            top_k,
        } => {
            let mut retrieval = retrieval_config(&config);
            retrieval.top_k = top_k;
            let retriever = Retriever::new(store, provider, retrieval);

            let hits = retriever.retrieve(&query, &project).await?;
            for hit in hits {
                let label = hit.name.as_deref().unwrap_or(&hit.kind);
                println!(
                    "{:.3}  {}:{}-{}  {}",
                    hit.score, hit.file_path, hit.start_line, hit.end_line, label
                );
            }
        }
        Command::Remove { project } => {
            let indexer = Indexer::new(
                store,
                catalog,
                provider,
                tokenizer,
                indexer_config(&config),
            );
            indexer.remove_project(&project).await?;
            println!("removed project {project}");
        }
    }

    Ok(())
}

fn indexer_config(config: &Config) -> IndexerConfig {
    let mut chunker = ChunkerConfig::default();
    chunker.window.chunk_size_tokens = config.index.chunk_size_tokens;
    chunker.window.overlap_hint = config.index.overlap_tokens;

    IndexerConfig {
        chunker,
        embed_batch_size: config.index.embed_batch_size,
        concurrency: config.index.concurrency,
        ..IndexerConfig::default()
    }
}

fn retrieval_config(config: &Config) -> RetrievalConfig {
    RetrievalConfig {
        top_k: config.docgen.top_k,
        score_threshold: config.docgen.score_threshold,
        ..RetrievalConfig::default()
    }
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
