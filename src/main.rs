use anyhow::Context as _;
use clap::{Parser, Subcommand};
use docchat::{
    config::Config,
    embedding::GeminiEmbeddingClient,
    llm::GeminiChatClient,
    logging,
    pipeline::{IngestionPipeline, QueryPipeline},
    shell,
    store::PgVectorStore,
};

/// Ask questions about a PDF, answered strictly from the document.
#[derive(Parser)]
#[command(name = "docchat", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load, chunk, embed, and store the configured PDF.
    Ingest,
    /// Answer questions about the ingested document interactively.
    Chat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = Config::from_env().context("configuration is incomplete")?;
    logging::init_tracing();
    tracing::debug!(
        collection = %config.collection_name,
        pdf_path = %config.pdf_path,
        embedding_model = %config.embedding_model,
        chat_model = %config.chat_model,
        "Loaded configuration"
    );

    match cli.command {
        Command::Ingest => ingest(&config).await,
        Command::Chat => chat(&config).await,
    }
}

async fn ingest(config: &Config) -> anyhow::Result<()> {
    let embedding = GeminiEmbeddingClient::new(&config.google_api_key, &config.embedding_model);
    let store = PgVectorStore::connect(&config.database_url, &config.collection_name)
        .await
        .context("failed to connect to the vector store")?;

    let pipeline = IngestionPipeline::new(&embedding, &store);
    let stored = pipeline
        .ingest(&config.pdf_path)
        .await
        .context("ingestion failed")?;

    println!("Stored {stored} chunks from {}", config.pdf_path);
    Ok(())
}

async fn chat(config: &Config) -> anyhow::Result<()> {
    let embedding = GeminiEmbeddingClient::new(&config.google_api_key, &config.embedding_model);
    let store = PgVectorStore::connect(&config.database_url, &config.collection_name)
        .await
        .context("failed to connect to the vector store")?;
    let chat_client = GeminiChatClient::new(&config.google_api_key, &config.chat_model);

    let pipeline = QueryPipeline::new(&embedding, &store, &chat_client);

    if let Err(error) = pipeline.check_ready().await {
        tracing::error!(error = %error, "Readiness check failed");
        eprintln!("Não conseguimos inicializar corretamente. Verifique os logs de erro.");
        std::process::exit(1);
    }

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    shell::run(&pipeline, stdin.lock(), stdout.lock()).await?;
    Ok(())
}
