//! docrag-server - HTTP service
//!
//! Boots the collection once, then serves it over axum:
//!
//! - `GET /health`, `GET /stats`
//! - `POST /ask` - plain chat with conversation history
//! - `POST /ask-langchain` - history-aware chat tagged `method: "langchain"`
//! - `POST /ask-rag` - answer from the top-k retrieved chunks
//! - `POST /ask-validated` - generate/validate loop
//! - `POST /upload-document` - multipart `.txt` / `.docx` upload
//! - `/`, `/ui`, `/static/*` - static UI

mod bootstrap;
mod error;
mod ingest;
mod routes;
mod state;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use tokio::signal;
use tracing::{error, info};

use docrag_chunk::RecursiveChunker;
use docrag_core::{AppConfig, ChatModel, Embedder, Result};

pub use bootstrap::{initialize_store, preload_folder, Bootstrap, PreloadOutcome};
pub use error::ApiError;
pub use ingest::{ingest_document, IngestReport};
pub use routes::{
    router, ChatResponse, ConversationResponse, PromptRequest, RagResponse, UploadResponse,
    ValidatedResponse,
};
pub use state::AppState;

/// Initialize the store, then serve until Ctrl+C or SIGTERM.
///
/// Returns early with the error if the empty collection cannot be created;
/// nothing is bound in that case.
pub async fn run(
    config: AppConfig,
    embedder: Arc<dyn Embedder>,
    chat: Arc<dyn ChatModel>,
) -> Result<()> {
    let chunker = Arc::new(RecursiveChunker::new());
    let boot = initialize_store(&config, embedder, chunker.as_ref()).await?;

    let addr = config.server.bind_address.clone();
    let state = AppState::new(config, boot.collection, chat, chunker);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("docrag listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{offline_config, DownEmbedder};
    use docrag_llm::OfflineChat;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_run_refuses_to_start_without_embedder() {
        let dir = TempDir::new().unwrap();
        let mut config = offline_config(dir.path());
        config.server.bind_address = "127.0.0.1:1".to_string();

        let result = run(config, Arc::new(DownEmbedder), Arc::new(OfflineChat::new())).await;

        assert!(matches!(
            result,
            Err(docrag_core::RagError::Embedding { .. })
        ));
    }
}
