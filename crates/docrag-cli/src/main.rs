//! docrag CLI - serve a document question-answering API.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use docrag_core::{AppConfig, ProviderKind, Result};

/// docrag - Retrieval-augmented answers over your company documents
#[derive(Parser)]
#[command(name = "docrag")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: ~/.config/docrag/config.toml, then ./docrag.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the collection and serve the HTTP API
    Serve {
        /// Address to listen on
        #[arg(short, long)]
        bind: Option<String>,

        /// Folder preloaded at startup
        #[arg(short, long)]
        documents: Option<PathBuf>,

        /// Provider: azure, openai or offline
        #[arg(short, long)]
        provider: Option<ProviderKind>,
    },

    /// Print the effective configuration with secrets redacted
    Config,
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// File, then environment. `provider` decides which credential variables are read.
fn load_config(path: Option<&Path>, provider: Option<ProviderKind>) -> Result<AppConfig> {
    let mut config = match path {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_default()?,
    };
    config.apply_env_with_provider(provider)?;
    Ok(config)
}

async fn serve(
    mut config: AppConfig,
    bind: Option<String>,
    documents: Option<PathBuf>,
) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind_address = bind;
    }
    if let Some(documents) = documents {
        config.store.documents_path = documents;
    }
    config.validate()?;

    let embedder = docrag_embed::from_config(&config.provider)?;
    let chat = docrag_llm::from_config(&config.provider)?;
    info!(
        provider = ?config.provider.kind,
        embedder = embedder.model(),
        chat = chat.model(),
        "Providers configured"
    );

    docrag_server::run(config, embedder, chat).await
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let provider = match &cli.command {
        Commands::Serve { provider, .. } => *provider,
        Commands::Config => None,
    };

    let config = match load_config(cli.config.as_deref(), provider) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Serve {
            bind, documents, ..
        } => serve(config, bind, documents).await,
        Commands::Config => config.to_toml_redacted().map(|toml| print!("{toml}")),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(code = e.error_code(), "{}", e);
            ExitCode::FAILURE
        }
    }
}
