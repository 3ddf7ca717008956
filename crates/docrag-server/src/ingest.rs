//! Shared decode → chunk → embed → insert path for uploads and preload.

use std::time::Instant;

use tracing::info;

use docrag_chunk::extract_text;
use docrag_core::{ChunkConfig, Chunker, Document, DocumentFormat, DocumentOrigin, Result};
use docrag_store::VectorCollection;

/// What one ingested file produced.
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// File name or relative path.
    pub source: String,

    /// Decoded format.
    pub format: DocumentFormat,

    /// Chunks inserted into the collection.
    pub chunks: usize,
}

/// Decode `bytes` named `source`, chunk it and add it to `collection`.
///
/// The collection is unchanged when any step fails.
pub async fn ingest_document(
    collection: &VectorCollection,
    chunker: &dyn Chunker,
    chunk_config: &ChunkConfig,
    source: &str,
    bytes: &[u8],
    origin: DocumentOrigin,
) -> Result<IngestReport> {
    let start = Instant::now();

    let extracted = extract_text(source, bytes)?;
    let chunks = chunker.chunk(&extracted.text, chunk_config)?;

    let doc = Document::new(
        collection.name(),
        source,
        &extracted.text,
        extracted.format,
        origin,
    );
    let hash = doc.content_hash_hex();
    let created = collection.add_document(doc, chunks).await?;

    info!(
        source,
        origin = origin.as_str(),
        format = %extracted.format,
        chunks = created,
        content_hash = &hash[..12],
        latency_ms = start.elapsed().as_millis() as u64,
        "Ingested document"
    );

    Ok(IngestReport {
        source: source.to_string(),
        format: extracted.format,
        chunks: created,
    })
}
