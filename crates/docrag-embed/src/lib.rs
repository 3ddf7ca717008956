//! docrag-embed - Embedding providers
//!
//! This crate provides the embedders behind the vector collection:
//!
//! - [`OpenAiEmbedder`] calls an Azure OpenAI or OpenAI `/embeddings` endpoint
//! - [`HashEmbedder`] is an offline feature-hashing embedder for development

mod hash;
mod openai;

use std::sync::Arc;

pub use hash::HashEmbedder;
pub use openai::OpenAiEmbedder;

// Re-export the Embedder trait for convenience
pub use docrag_core::Embedder;

use docrag_core::{ProviderConfig, ProviderKind, Result};

/// Build the embedder selected by the provider configuration.
pub fn from_config(config: &ProviderConfig) -> Result<Arc<dyn Embedder>> {
    match config.kind {
        ProviderKind::Azure | ProviderKind::OpenAi => {
            Ok(Arc::new(OpenAiEmbedder::from_config(config)?))
        }
        ProviderKind::Offline => Ok(Arc::new(HashEmbedder::new())),
    }
}
