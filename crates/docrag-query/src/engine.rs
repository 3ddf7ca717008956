//! Retrieval-augmented answering over the vector collection.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use docrag_core::{ChatMessage, ChatModel, ChatOptions, Result, SearchResult};
use docrag_store::VectorCollection;

use crate::prompt::{rag_prompt, INSUFFICIENT_CONTEXT_ANSWER};

/// Configuration for answering.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Number of chunks retrieved per question.
    pub top_k: u32,

    /// Sampling temperature for answers.
    pub temperature: f32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            temperature: 0.7,
        }
    }
}

/// A grounded answer together with the context it was built from.
#[derive(Debug, Clone)]
pub struct RagAnswer {
    /// Model answer, or the fixed insufficient-information answer.
    pub answer: String,

    /// Retrieved chunk texts, best first.
    pub context: Vec<String>,

    /// Retrieved chunks with scores and sources.
    pub results: Vec<SearchResult>,

    /// Wall-clock time spent answering.
    pub latency_ms: u64,
}

/// Answers questions against one collection with one chat model.
#[derive(Clone)]
pub struct QueryEngine {
    collection: VectorCollection,
    chat: Arc<dyn ChatModel>,
    config: QueryConfig,
}

impl QueryEngine {
    /// Create a new query engine.
    pub fn new(collection: VectorCollection, chat: Arc<dyn ChatModel>, config: QueryConfig) -> Self {
        Self {
            collection,
            chat,
            config,
        }
    }

    /// The collection this engine retrieves from.
    pub fn collection(&self) -> &VectorCollection {
        &self.collection
    }

    /// Retrieve the top-k chunks for `question` and answer from them.
    ///
    /// An empty retrieval is a normal outcome: the model is not called and
    /// the fixed insufficient-information answer is returned.
    pub async fn answer(&self, question: &str) -> Result<RagAnswer> {
        let start = Instant::now();

        info!("Answering: {:?}", question);

        let results = self
            .collection
            .similarity_search(question, self.config.top_k)
            .await?;
        let context: Vec<String> = results.iter().map(|r| r.chunk.content.clone()).collect();

        debug!("Retrieved {} chunks", context.len());

        let answer = if context.is_empty() {
            INSUFFICIENT_CONTEXT_ANSWER.to_string()
        } else {
            let prompt = rag_prompt(&context, question);
            self.chat
                .complete(
                    &[ChatMessage::user(prompt)],
                    &ChatOptions::with_temperature(self.config.temperature),
                )
                .await?
        };

        let latency_ms = start.elapsed().as_millis() as u64;

        info!(
            "Answer completed in {}ms from {} chunks",
            latency_ms,
            context.len()
        );

        Ok(RagAnswer {
            answer,
            context,
            results,
            latency_ms,
        })
    }

    /// Plain conversational reply: `history` followed by `prompt`, no retrieval.
    pub async fn chat(&self, history: &[ChatMessage], prompt: &str) -> Result<String> {
        let mut messages = history.to_vec();
        messages.push(ChatMessage::user(prompt));

        self.chat
            .complete(&messages, &ChatOptions::with_temperature(self.config.temperature))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{collection, ScriptedChat};
    use docrag_core::{ChunkData, Document, DocumentFormat, DocumentOrigin, RagError, Role};

    async fn add(collection: &VectorCollection, source: &str, text: &str) {
        let doc = Document::new(
            collection.name(),
            source,
            text,
            DocumentFormat::Text,
            DocumentOrigin::Upload,
        );
        let chunk = ChunkData {
            content: text.to_string(),
            length: text.chars().count(),
            start_index: Some(0),
        };
        collection.add_document(doc, vec![chunk]).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_store_skips_model() {
        let chat = Arc::new(ScriptedChat::new(vec![]));
        let engine = QueryEngine::new(collection().await, chat.clone(), QueryConfig::default());

        let answer = engine.answer("Hello").await.unwrap();

        assert!(answer.context.is_empty());
        assert_eq!(answer.answer, INSUFFICIENT_CONTEXT_ANSWER);
        assert!(chat.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_answer_uses_retrieved_context() {
        let chat = Arc::new(ScriptedChat::new(vec!["You uploaded a test document."]));
        let collection = collection().await;
        add(&collection, "test.txt", "Test Document for Upload").await;
        let engine = QueryEngine::new(collection, chat.clone(), QueryConfig::default());

        let answer = engine.answer("What was uploaded?").await.unwrap();

        assert_eq!(answer.answer, "You uploaded a test document.");
        assert_eq!(answer.context, vec!["Test Document for Upload".to_string()]);
        assert_eq!(answer.results[0].source, "test.txt");

        let prompts = chat.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Context:\nTest Document for Upload"));
        assert!(prompts[0].contains("Question: What was uploaded?"));
    }

    #[tokio::test]
    async fn test_top_k_limits_context() {
        let chat = Arc::new(ScriptedChat::new(vec!["ok"]));
        let collection = collection().await;
        for i in 0..5 {
            add(&collection, &format!("doc{i}.txt"), &format!("policy number {i}")).await;
        }
        let config = QueryConfig {
            top_k: 2,
            ..Default::default()
        };
        let engine = QueryEngine::new(collection, chat, config);

        let answer = engine.answer("policy").await.unwrap();
        assert_eq!(answer.context.len(), 2);
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let chat = Arc::new(ScriptedChat::failing());
        let collection = collection().await;
        add(&collection, "a.txt", "alpha beta").await;
        let engine = QueryEngine::new(collection, chat, QueryConfig::default());

        let err = engine.answer("alpha").await.unwrap_err();
        assert!(matches!(err, RagError::Llm { .. }));
    }

    #[tokio::test]
    async fn test_chat_appends_prompt_to_history() {
        let chat = Arc::new(ScriptedChat::new(vec!["Paris"]));
        let engine = QueryEngine::new(collection().await, chat.clone(), QueryConfig::default());

        let history = vec![
            ChatMessage::user("Hi"),
            ChatMessage::assistant("Hello! How can I help?"),
        ];
        let reply = engine.chat(&history, "Capital of France?").await.unwrap();
        assert_eq!(reply, "Paris");

        let calls = chat.calls();
        assert_eq!(calls[0].len(), 3);
        assert_eq!(calls[0][2].role, Role::User);
        assert_eq!(calls[0][2].content, "Capital of France?");
    }
}
