//! A named vector collection over a store and an embedder.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use docrag_core::{
    Chunk, ChunkData, Collection, Document, Embedder, RagError, Result, SearchResult, Stats, Store,
};

/// Text embedded once at creation to learn the vector dimension.
const DIMENSION_PROBE: &str = "dimension probe";

/// The single queryable collection: owns the embedding step for writes and reads.
#[derive(Clone)]
pub struct VectorCollection {
    store: Arc<dyn Store>,
    embedder: Arc<dyn Embedder>,
    info: Collection,
}

impl std::fmt::Debug for VectorCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorCollection")
            .field("name", &self.info.name)
            .field("dimension", &self.info.dimension)
            .field("embedder", &self.embedder.model())
            .finish()
    }
}

impl VectorCollection {
    /// Create a new, empty collection named `name`.
    ///
    /// Embeds a probe string first, so an unreachable or misconfigured
    /// embedder fails here rather than on the first upload.
    pub async fn create(
        store: Arc<dyn Store>,
        embedder: Arc<dyn Embedder>,
        name: &str,
    ) -> Result<Self> {
        let probe = embedder.embed_query(DIMENSION_PROBE).await?;
        if probe.is_empty() {
            return Err(RagError::embedding("embedder returned an empty vector"));
        }

        let info = Collection::new(name, probe.len());
        store.create_collection(info.clone()).await?;

        info!(
            collection = %info.name,
            dimension = info.dimension,
            model = embedder.model(),
            "Created collection"
        );

        Ok(Self {
            store,
            embedder,
            info,
        })
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Embedding dimension.
    pub fn dimension(&self) -> usize {
        self.info.dimension
    }

    /// Embed `chunks` and store them under `doc`. Returns the number of chunks stored.
    ///
    /// Nothing is written unless every chunk embeds successfully.
    pub async fn add_document(&self, doc: Document, chunks: Vec<ChunkData>) -> Result<usize> {
        if chunks.is_empty() {
            return Err(RagError::EmptyDocument {
                filename: doc.source.clone(),
            });
        }

        let start = Instant::now();
        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let embeddings = self.embedder.embed_documents(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(RagError::embedding(format!(
                "expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let mut records = Vec::with_capacity(chunks.len());
        for (i, (data, embedding)) in chunks.into_iter().zip(embeddings).enumerate() {
            self.check_dimension(&embedding)?;
            records.push(
                Chunk::new(
                    doc.id,
                    i as u32,
                    &data.content,
                    data.start_index.map(|s| s as u64),
                )
                .with_embedding(embedding),
            );
        }

        let count = records.len();
        let source = doc.source.clone();
        self.store.insert_document(doc, &records).await?;

        debug!(
            source = %source,
            chunks = count,
            latency_ms = start.elapsed().as_millis() as u64,
            "Added document"
        );

        Ok(count)
    }

    /// Top-`k` chunks most similar to `query`, best first.
    pub async fn similarity_search(&self, query: &str, k: u32) -> Result<Vec<SearchResult>> {
        let start = Instant::now();

        let embedding = self.embedder.embed_query(query).await?;
        self.check_dimension(&embedding)?;

        let hits = self
            .store
            .vector_search(&embedding, k, &self.info.name)
            .await?;

        let mut results = Vec::with_capacity(hits.len());
        for (chunk_id, score) in hits {
            let chunk = match self.store.get_chunk(chunk_id).await? {
                Some(c) => c,
                None => continue,
            };

            let source = match self.store.get_document(chunk.doc_id).await? {
                Some(d) => d.source,
                None => continue,
            };

            results.push(SearchResult {
                rank: results.len() as u32 + 1,
                score,
                chunk,
                source,
            });
        }

        debug!(
            results = results.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Similarity search completed"
        );

        Ok(results)
    }

    /// Document and chunk counts.
    pub async fn stats(&self) -> Result<Stats> {
        self.store.get_stats(&self.info.name).await
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.info.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.info.dimension,
                actual: embedding.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SqliteStore;
    use async_trait::async_trait;
    use docrag_core::{DocumentFormat, DocumentOrigin};

    /// Two-dimensional embedder: counts of "apple" and "pear".
    struct FruitEmbedder;

    #[async_trait]
    impl Embedder for FruitEmbedder {
        async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| fruit_vector(t)).collect())
        }

        async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
            Ok(fruit_vector(text))
        }

        fn model(&self) -> &str {
            "fruit"
        }
    }

    fn fruit_vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        vec![
            lower.matches("apple").count() as f32 + 0.01,
            lower.matches("pear").count() as f32 + 0.01,
        ]
    }

    struct DownEmbedder;

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

    fn chunk_data(content: &str) -> ChunkData {
        ChunkData {
            content: content.to_string(),
            length: content.chars().count(),
            start_index: Some(0),
        }
    }

    async fn collection() -> VectorCollection {
        let store = Arc::new(SqliteStore::open_memory().unwrap());
        VectorCollection::create(store, Arc::new(FruitEmbedder), "company_docs")
            .await
            .unwrap()
    }

    fn document(source: &str) -> Document {
        Document::new(
            "company_docs",
            source,
            "body",
            DocumentFormat::Text,
            DocumentOrigin::Upload,
        )
    }

    #[tokio::test]
    async fn test_create_learns_dimension() {
        let collection = collection().await;
        assert_eq!(collection.dimension(), 2);
        assert_eq!(collection.name(), "company_docs");

        let stats = collection.stats().await.unwrap();
        assert_eq!(stats.documents, 0);
        assert_eq!(stats.chunks, 0);
    }

    #[tokio::test]
    async fn test_create_fails_when_embedder_down() {
        let store = Arc::new(SqliteStore::open_memory().unwrap());
        let result = VectorCollection::create(store, Arc::new(DownEmbedder), "company_docs").await;
        assert!(matches!(result, Err(RagError::Embedding { .. })));
    }

    #[tokio::test]
    async fn test_search_empty_collection() {
        let collection = collection().await;
        let results = collection.similarity_search("Hello", 3).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_add_and_search() {
        let collection = collection().await;

        let added = collection
            .add_document(
                document("fruit.txt"),
                vec![chunk_data("apple apple apple"), chunk_data("pear pear")],
            )
            .await
            .unwrap();
        assert_eq!(added, 2);

        let results = collection.similarity_search("pear", 3).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].rank, 1);
        assert_eq!(results[0].chunk.content, "pear pear");
        assert_eq!(results[0].source, "fruit.txt");

        let top_one = collection.similarity_search("apple", 1).await.unwrap();
        assert_eq!(top_one.len(), 1);
        assert_eq!(top_one[0].chunk.content, "apple apple apple");
    }

    #[tokio::test]
    async fn test_add_rejects_empty_chunks() {
        let collection = collection().await;
        let err = collection
            .add_document(document("empty.txt"), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::EmptyDocument { .. }));
        assert_eq!(collection.stats().await.unwrap().documents, 0);
    }
}
