use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use manual_qa_core::{
    ingest_folder, AnswerPipeline, CharacterNgramEmbedder, ChunkerConfig, CompletionOptions,
    ConversationStore, LopdfExtractor, OpenAiCompatClient, QdrantStore, RemoteEmbedder,
    RetrievalOptions, RetrievalSelector, SqliteConversationStore, VectorIndex,
    WholeDocumentOptions, WholeDocumentSelector, DEFAULT_EMBEDDING_DIMENSIONS,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "manual-qa", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Qdrant base URL
    #[arg(long, env = "QDRANT_URL", default_value = "http://localhost:6333")]
    qdrant_url: String,

    /// Qdrant collection holding the chunk vectors
    #[arg(long, env = "QDRANT_COLLECTION", default_value = "manual_chunks")]
    qdrant_collection: String,

    /// SQLite file for the conversation log
    #[arg(long, env = "CONVERSATIONS_DB", default_value = "conversas.db")]
    db_path: PathBuf,

    /// Folder of PDF manuals, used by the whole-document selector
    #[arg(long, env = "PDF_FOLDER", default_value = "pdfs")]
    pdf_folder: PathBuf,

    /// Base URL of the OpenAI-compatible completion API
    #[arg(
        long,
        env = "COMPLETION_URL",
        default_value = "https://api.groq.com/openai/v1"
    )]
    completion_url: String,

    /// Chat model identifier
    #[arg(
        long,
        env = "COMPLETION_MODEL",
        default_value = "llama-3.3-70b-versatile"
    )]
    completion_model: String,

    /// API key for the completion endpoint
    #[arg(long, env = "COMPLETION_API_KEY", hide_env_values = true)]
    completion_api_key: Option<String>,

    /// Base URL of an OpenAI-compatible embeddings API; when absent a local
    /// deterministic embedder is used instead
    #[arg(long, env = "EMBEDDING_URL")]
    embedding_url: Option<String>,

    /// Sentence-embedding model identifier
    #[arg(long, env = "EMBEDDING_MODEL", default_value = "all-MiniLM-L6-v2")]
    embedding_model: String,

    /// Embedding vector dimensionality
    #[arg(long, default_value_t = DEFAULT_EMBEDDING_DIMENSIONS)]
    embedding_dimensions: usize,

    /// Context selection policy
    #[arg(long, value_enum, default_value = "retrieval")]
    selector: SelectorMode,

    /// Number of chunks retrieved per question
    #[arg(long, default_value = "3")]
    top_k: usize,

    /// Chunk window size in characters
    #[arg(long, default_value = "1000")]
    chunk_window: usize,

    /// Sampling temperature for generated answers
    #[arg(long, default_value = "0.7")]
    temperature: f32,

    /// Token budget for generated answers
    #[arg(long, default_value = "1024")]
    max_tokens: u32,

    /// Timeout in seconds applied to every outbound call
    #[arg(long, default_value = "30")]
    request_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SelectorMode {
    /// Embed the question and retrieve the most similar chunks.
    Retrieval,
    /// Hand the model whole documents, truncated to a fixed budget.
    WholeDocument,
}

#[derive(Subcommand)]
enum Command {
    /// Extract, chunk, embed and index every PDF in a folder.
    Ingest {
        /// Folder scanned recursively for .pdf files.
        #[arg(long)]
        folder: PathBuf,
    },
    /// Answer one question against the indexed manuals.
    Ask {
        question: String,
        /// User identifier stored with the conversation.
        #[arg(long)]
        user: Option<String>,
    },
    /// Print the conversation history, newest first.
    History,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.request_timeout_secs);

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "manual-qa boot"
    );

    match cli.command {
        Command::Ingest { folder } => {
            let index = QdrantStore::new(
                cli.qdrant_url.as_str(),
                cli.qdrant_collection.as_str(),
                cli.embedding_dimensions,
                timeout,
            )?;
            index.ensure_collection().await?;

            let config = ChunkerConfig {
                window_chars: cli.chunk_window,
            };

            let report = match &cli.embedding_url {
                Some(url) => {
                    let embedder = RemoteEmbedder::new(
                        url.as_str(),
                        cli.embedding_model.as_str(),
                        cli.embedding_dimensions,
                        timeout,
                    )?;
                    ingest_folder(&folder, &LopdfExtractor, &embedder, &index, config).await?
                }
                None => {
                    let embedder = CharacterNgramEmbedder {
                        dimensions: cli.embedding_dimensions,
                    };
                    ingest_folder(&folder, &LopdfExtractor, &embedder, &index, config).await?
                }
            };

            for skipped in &report.skipped {
                warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped pdf");
            }

            println!(
                "{} documents indexed ({} chunks, {} skipped) at {}",
                report.indexed_documents,
                report.chunk_count,
                report.skipped.len(),
                Utc::now().to_rfc3339()
            );
            println!("index now holds {} chunks", index.count().await?);
        }
        Command::Ask { question, user } => {
            let completion = OpenAiCompatClient::new(
                cli.completion_url.as_str(),
                cli.completion_api_key.clone(),
                CompletionOptions {
                    model: cli.completion_model.clone(),
                    temperature: cli.temperature,
                    max_tokens: cli.max_tokens,
                },
                timeout,
            )?;
            let conversations = SqliteConversationStore::connect(&cli.db_path).await?;

            let answer = match cli.selector {
                SelectorMode::Retrieval => {
                    let index = QdrantStore::new(
                        cli.qdrant_url.as_str(),
                        cli.qdrant_collection.as_str(),
                        cli.embedding_dimensions,
                        timeout,
                    )?;
                    index.ensure_collection().await?;

                    let options = RetrievalOptions {
                        top_k: cli.top_k,
                        ..Default::default()
                    };

                    match &cli.embedding_url {
                        Some(url) => {
                            let embedder = RemoteEmbedder::new(
                                url.as_str(),
                                cli.embedding_model.as_str(),
                                cli.embedding_dimensions,
                                timeout,
                            )?;
                            let selector = RetrievalSelector::new(embedder, index, options);
                            AnswerPipeline::new(selector, completion, conversations)
                                .answer(user.as_deref(), &question)
                                .await
                        }
                        None => {
                            let embedder = CharacterNgramEmbedder {
                                dimensions: cli.embedding_dimensions,
                            };
                            let selector = RetrievalSelector::new(embedder, index, options);
                            AnswerPipeline::new(selector, completion, conversations)
                                .answer(user.as_deref(), &question)
                                .await
                        }
                    }
                }
                SelectorMode::WholeDocument => {
                    let selector = WholeDocumentSelector::new(
                        cli.pdf_folder.clone(),
                        LopdfExtractor,
                        WholeDocumentOptions::default(),
                    );
                    AnswerPipeline::new(selector, completion, conversations)
                        .answer(user.as_deref(), &question)
                        .await
                }
            };

            println!("{answer}");
        }
        Command::History => {
            let conversations = SqliteConversationStore::connect(&cli.db_path).await?;

            for record in conversations.list_all().await? {
                println!("[{}] {}", record.timestamp.to_rfc3339(), record.user);
                println!("  Q: {}", record.question);
                println!("  A: {}", record.answer);
            }
        }
    }

    Ok(())
}
