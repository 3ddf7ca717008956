//! Core traits defining the interfaces between components.

use async_trait::async_trait;
use ulid::Ulid;

use crate::error::Result;
use crate::types::{ChatMessage, Chunk, Collection, Document, Stats};

/// Storage layer trait.
#[async_trait]
pub trait Store: Send + Sync {
    // Collection operations
    async fn create_collection(&self, collection: Collection) -> Result<()>;
    async fn get_collection(&self, name: &str) -> Result<Option<Collection>>;

    // Document operations

    /// Insert a document and its embedded chunks in one transaction.
    async fn insert_document(&self, doc: Document, chunks: &[Chunk]) -> Result<()>;
    async fn get_document(&self, id: Ulid) -> Result<Option<Document>>;

    // Chunk operations
    async fn get_chunk(&self, id: Ulid) -> Result<Option<Chunk>>;

    /// Cosine-similarity search within one collection, best first.
    async fn vector_search(
        &self,
        embedding: &[f32],
        k: u32,
        collection: &str,
    ) -> Result<Vec<(Ulid, f32)>>;

    // Stats
    async fn get_stats(&self, collection: &str) -> Result<Stats>;
}

/// Embedding model trait.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of document texts.
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query text.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Model or deployment name, for logs.
    fn model(&self) -> &str;
}

/// Sampling options for a chat completion.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Sampling temperature; provider default when `None`.
    pub temperature: Option<f32>,
}

impl ChatOptions {
    pub fn with_temperature(temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
        }
    }
}

/// Chat-completion model trait.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete the conversation and return the assistant reply.
    async fn complete(&self, messages: &[ChatMessage], options: &ChatOptions) -> Result<String>;

    /// Model or deployment name, for logs.
    fn model(&self) -> &str;
}

/// Chunking configuration.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Maximum chunk length, measured by the chunker's length function.
    pub chunk_size: usize,

    /// Overlap carried from the end of one chunk into the next.
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

/// Chunking strategy trait.
pub trait Chunker: Send + Sync {
    /// Split text into chunks.
    fn chunk(&self, text: &str, config: &ChunkConfig) -> Result<Vec<ChunkData>>;
}

/// Raw chunk data before ID assignment.
#[derive(Debug, Clone)]
pub struct ChunkData {
    /// Chunk text content.
    pub content: String,

    /// Length according to the chunker's length function.
    pub length: usize,

    /// Character offset in the source text, when it could be located.
    pub start_index: Option<usize>,
}
