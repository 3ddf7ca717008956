use std::sync::Arc;

use docrag_core::{AppConfig, ChatModel, ChunkConfig, Chunker};
use docrag_query::{QueryConfig, QueryEngine, Validator, ValidatorConfig};
use docrag_store::VectorCollection;

/// Shared handler state. The collection is owned by the engine.
#[derive(Clone)]
pub struct AppState {
    pub engine: QueryEngine,
    pub validator: Validator,
    pub chunker: Arc<dyn Chunker>,
    pub chunk_config: ChunkConfig,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        collection: VectorCollection,
        chat: Arc<dyn ChatModel>,
        chunker: Arc<dyn Chunker>,
    ) -> Self {
        let engine = QueryEngine::new(
            collection,
            chat.clone(),
            QueryConfig {
                top_k: config.search.top_k,
                temperature: config.provider.temperature,
            },
        );
        let validator = Validator::new(
            chat,
            ValidatorConfig {
                max_attempts: config.validation.max_attempts,
                answer_temperature: config.provider.temperature,
                validator_temperature: config.provider.validator_temperature,
            },
        );

        Self {
            engine,
            validator,
            chunker,
            chunk_config: config.chunking.to_chunk_config(),
            config: Arc::new(config),
        }
    }

    pub fn collection(&self) -> &VectorCollection {
        self.engine.collection()
    }
}
