//! docrag-llm - Chat model providers
//!
//! [`OpenAiChat`] talks to Azure OpenAI or OpenAI chat completions;
//! [`OfflineChat`] answers extractively without a network.

mod offline;
mod openai;

use std::sync::Arc;

pub use offline::OfflineChat;
pub use openai::OpenAiChat;

pub use docrag_core::{ChatModel, ChatOptions};

use docrag_core::{ProviderConfig, ProviderKind, Result};

/// Build the chat model selected by the provider configuration.
pub fn from_config(config: &ProviderConfig) -> Result<Arc<dyn ChatModel>> {
    match config.kind {
        ProviderKind::Azure | ProviderKind::OpenAi => Ok(Arc::new(OpenAiChat::from_config(config)?)),
        ProviderKind::Offline => Ok(Arc::new(OfflineChat::new())),
    }
}
