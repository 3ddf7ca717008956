//! Test doubles and helpers for the server tests.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use docrag_chunk::RecursiveChunker;
use docrag_core::{AppConfig, Embedder, RagError, Result};
use docrag_embed::HashEmbedder;
use docrag_llm::OfflineChat;

use crate::bootstrap::initialize_store;
use crate::state::AppState;

/// Embedder whose provider is unreachable.
pub struct DownEmbedder;

#[async_trait]
impl Embedder for DownEmbedder {
    async fn embed_documents(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Err(RagError::embedding("connection refused"))
    }

    async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RagError::embedding("connection refused"))
    }

    fn model(&self) -> &str {
        "down"
    }
}

/// Answers the dimension probe, then fails every document batch.
pub struct DocumentsOnlyDown;

#[async_trait]
impl Embedder for DocumentsOnlyDown {
    async fn embed_documents(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Err(RagError::embedding("rate limited"))
    }

    async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0, 0.0])
    }

    fn model(&self) -> &str {
        "documents-only-down"
    }
}

/// Offline configuration preloading `folder`.
pub fn offline_config(folder: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.provider.kind = docrag_core::ProviderKind::Offline;
    config.store.documents_path = folder.to_path_buf();
    config
}

/// Boot a state on the offline providers, as the service does at startup.
pub async fn offline_state(folder: &Path) -> AppState {
    let config = offline_config(folder);
    let chunker = Arc::new(RecursiveChunker::new());
    let boot = initialize_store(&config, Arc::new(HashEmbedder::new()), chunker.as_ref())
        .await
        .unwrap();
    AppState::new(config, boot.collection, Arc::new(OfflineChat::new()), chunker)
}
