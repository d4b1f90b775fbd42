//! Replay object notifications outside the function runtime
//!
//! Run with: cargo run -p doc-pipeline --features cli --bin doc-pipeline-replay -- --help

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use doc_pipeline::config::LocalConfig;
use doc_pipeline::providers::ollama::OllamaInvoker;
use doc_pipeline::{BackendProvider, DocumentDispatcher, NotificationBatch, PipelineConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "doc-pipeline-replay")]
#[command(about = "Run object notifications through the document pipeline", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, short, env = "PIPELINE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured backend
    #[arg(long, value_enum)]
    backend: Option<Backend>,

    /// Table receiving processed records
    #[arg(long, env = "TABLE_NAME")]
    table: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Process a notification event read from a JSON file
    Event {
        /// Path to the event JSON
        path: PathBuf,
    },

    /// Process a single object as if one notification had arrived for it
    Object {
        #[arg(long)]
        bucket: String,

        /// Object key, URL-encoded as it would appear in a notification
        #[arg(long)]
        key: String,
    },

    /// Check that the local inference endpoint is reachable
    Health,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Backend {
    Aws,
    Local,
}

impl From<Backend> for BackendProvider {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Aws => BackendProvider::Aws,
            Backend::Local => BackendProvider::Local,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doc_pipeline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = PipelineConfig::load(cli.config.as_deref())?;
    if let Some(backend) = cli.backend {
        config.backend = backend.into();
    }

    let batch = match cli.command {
        Commands::Health => return health(&config.local).await,
        Commands::Event { path } => {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read event file {}", path.display()))?;
            serde_json::from_str::<NotificationBatch>(&raw)
                .with_context(|| format!("Invalid notification event in {}", path.display()))?
        }
        Commands::Object { bucket, key } => NotificationBatch::from_objects([(bucket, key)]),
    };

    let dispatcher = DocumentDispatcher::from_config(&config).await?;
    let outcome = dispatcher.process_batch(&cli.table, &batch).await?;

    println!("Batch {}: {} record(s) written", outcome.batch_id, outcome.written.len());
    for written in &outcome.written {
        println!("  {}  {}", written.timestamp, written.document_id);
    }

    Ok(())
}

async fn health(config: &LocalConfig) -> Result<()> {
    let invoker = OllamaInvoker::new(config)?;
    if invoker.health_check().await {
        println!("Ollama is running at {}", config.ollama_url);
        Ok(())
    } else {
        anyhow::bail!(
            "Ollama not available at {}; start it with `ollama serve` and pull {}",
            config.ollama_url,
            config.ollama_model
        )
    }
}
