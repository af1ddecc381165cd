use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use ragloop::core::config::EmbeddingProvider;
use ragloop::core::logging;
use ragloop::llm::OpenAiClient;
use ragloop::rag::{
    load_documents, Embedder, EmbeddingIndex, HashingEmbedder, SqliteRagStore, TextSplitter,
    VectorIndex,
};
use ragloop::{AppConfig, AppPaths, ConfigService, RagPipeline};

#[derive(Parser)]
#[command(author, version, about = "Ask questions against a local document collection")]
struct Args {
    /// Path to a config.yml (overrides RAGLOOP_CONFIG_PATH)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Load documents and rebuild the embedding index
    Ingest {
        /// Directory of documents (defaults to app.documents_dir)
        #[arg(long)]
        docs: Option<PathBuf>,
    },
    /// Run one question through plan, retrieve, answer and reflect
    Ask {
        /// Question text; read from stdin when omitted
        question: Option<String>,
        /// Rebuild the index before answering
        #[arg(long)]
        reindex: bool,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration with secrets redacted
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let paths = AppPaths::discover();
    paths
        .ensure_dirs()
        .with_context(|| format!("Failed to create {}", paths.user_data_dir.display()))?;
    logging::init(&paths);

    let service = ConfigService::new(Arc::new(paths)).with_config_path(args.config);
    let config = service.load().context("Failed to load configuration")?;

    match args.command {
        CliCommand::Config => {
            let value = serde_json::to_value(&config)?;
            let redacted = service.redact_sensitive_values(&value);
            print!("{}", serde_yaml::to_string(&redacted)?);
        }
        CliCommand::Ingest { docs } => {
            let index = open_index(&config).await?;
            let dir = docs.unwrap_or_else(|| config.app.documents_dir.clone());
            let stats = ingest(index.as_ref(), &config, &dir).await?;
            println!(
                "Indexed {} documents into {} chunks",
                stats.documents, stats.chunks
            );
        }
        CliCommand::Ask {
            question,
            reindex,
            json,
        } => {
            let question = match question {
                Some(q) => q,
                None => prompt_question()?,
            };

            let index = open_index(&config).await?;
            if reindex || !index.is_built().await? {
                let stats = ingest(index.as_ref(), &config, &config.app.documents_dir).await?;
                tracing::info!(
                    "Index built ({} documents, {} chunks)",
                    stats.documents,
                    stats.chunks
                );
            }

            let completion = Arc::new(openai_client(&config)?);
            let pipeline = RagPipeline::new(index, completion, config.pipeline_options())?;
            let output = pipeline.run(&question).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("Answer:\n{}\n", output.answer);
                println!("Reflection:\n{}", output.reflection);
            }
        }
    }

    Ok(())
}

async fn open_index(config: &AppConfig) -> anyhow::Result<Arc<VectorIndex>> {
    let embedder: Arc<dyn Embedder> = match config.embedding.provider {
        EmbeddingProvider::OpenAi => Arc::new(openai_client(config)?),
        EmbeddingProvider::Hashing => Arc::new(HashingEmbedder::new(config.embedding.dimensions)),
    };

    let store = SqliteRagStore::open(&config.app.index_path)
        .await
        .with_context(|| format!("Failed to open index at {}", config.app.index_path.display()))?;

    let index = VectorIndex::new(embedder, Arc::new(store))
        .with_splitter(TextSplitter::new(config.splitter_config()))
        .with_embed_batch_size(config.retrieval.embed_batch_size);
    Ok(Arc::new(index))
}

async fn ingest(
    index: &VectorIndex,
    config: &AppConfig,
    dir: &std::path::Path,
) -> anyhow::Result<ragloop::rag::IndexStats> {
    let documents = load_documents(dir, &config.retrieval.document_extensions)?;
    let stats = index
        .build(&documents)
        .await
        .with_context(|| format!("Failed to index {}", dir.display()))?;
    Ok(stats)
}

fn openai_client(config: &AppConfig) -> anyhow::Result<OpenAiClient> {
    config.check_api_key()?;
    Ok(OpenAiClient::new(config.openai_options())?)
}

fn prompt_question() -> anyhow::Result<String> {
    eprint!("Question: ");
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read question from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
