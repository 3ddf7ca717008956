//! SQLite-based storage implementation.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};
use ulid::Ulid;

use docrag_core::{Chunk, Collection, Document, RagError, Result, Stats, Store};

use crate::schema::SCHEMA;
use crate::vector::{bytes_to_vec, cosine_similarity, vec_to_bytes};

/// SQLite-based store implementation.
///
/// The whole index lives in an in-memory database owned by the process.
/// Vector search is a full scan ranked by a `cosine_similarity` SQL function
/// registered on the connection.
pub struct SqliteStore {
    /// Connection wrapped in blocking Mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a fresh in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| RagError::database(format!("Failed to open in-memory database: {}", e)))?;

        Self::init(conn)
    }

    /// Initialize the store with a connection.
    fn init(conn: Connection) -> Result<Self> {
        Self::configure_connection(&conn)?;
        Self::register_functions(&conn)?;

        conn.execute_batch(SCHEMA)
            .map_err(|e| RagError::database(format!("Failed to initialize schema: {}", e)))?;

        info!("In-memory database opened");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Configure SQLite connection.
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            "#,
        )
        .map_err(|e| RagError::database(format!("Failed to configure connection: {}", e)))?;

        Ok(())
    }

    /// Register `cosine_similarity(blob, blob)` on the connection.
    fn register_functions(conn: &Connection) -> Result<()> {
        conn.create_scalar_function(
            "cosine_similarity",
            2,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                let a: Vec<u8> = ctx.get(0)?;
                let b: Vec<u8> = ctx.get(1)?;
                Ok(cosine_similarity(&bytes_to_vec(&a), &bytes_to_vec(&b)) as f64)
            },
        )
        .map_err(|e| RagError::database(format!("Failed to register functions: {}", e)))
    }

    /// Execute a blocking operation on the connection.
    fn with_conn<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R>,
    {
        let conn = self.conn.lock().map_err(|e| RagError::database(e.to_string()))?;
        f(&conn)
    }
}

#[async_trait]
impl Store for SqliteStore {
    // Collection operations

    async fn create_collection(&self, collection: Collection) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO collections (name, dimension, created_at) VALUES (?1, ?2, ?3)",
                params![
                    collection.name,
                    collection.dimension as i64,
                    collection.created_at as i64,
                ],
            )
            .map_err(|e| {
                if e.to_string().contains("UNIQUE constraint") {
                    RagError::CollectionExists {
                        name: collection.name.clone(),
                    }
                } else {
                    RagError::database(format!("Failed to create collection: {}", e))
                }
            })?;

            debug!("Created collection: {}", collection.name);
            Ok(())
        })
    }

    async fn get_collection(&self, name: &str) -> Result<Option<Collection>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT name, dimension, created_at FROM collections WHERE name = ?1")
                .map_err(|e| RagError::database(e.to_string()))?;

            let result = stmt
                .query_row(params![name], |row| {
                    Ok(Collection {
                        name: row.get(0)?,
                        dimension: row.get::<_, i64>(1)? as usize,
                        created_at: row.get::<_, i64>(2)? as u64,
                    })
                })
                .optional()
                .map_err(|e| RagError::database(e.to_string()))?;

            Ok(result)
        })
    }

    // Document operations

    async fn insert_document(&self, doc: Document, chunks: &[Chunk]) -> Result<()> {
        let metadata = serde_json::to_string(&doc.metadata)?;

        self.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| RagError::database(e.to_string()))?;

            tx.execute(
                r#"
                INSERT INTO documents (id, collection, source, content_hash, format,
                                       origin, metadata, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    doc.id.to_string(),
                    doc.collection,
                    doc.source,
                    doc.content_hash.as_slice(),
                    doc.format.label(),
                    doc.origin.as_str(),
                    metadata,
                    doc.created_at as i64,
                ],
            )
            .map_err(|e| RagError::database(format!("Failed to insert document: {}", e)))?;

            {
                let mut stmt = tx
                    .prepare(
                        r#"
                        INSERT INTO chunks (id, doc_id, chunk_index, content, start_index, embedding)
                        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                        "#,
                    )
                    .map_err(|e| RagError::database(e.to_string()))?;

                for chunk in chunks {
                    stmt.execute(params![
                        chunk.id.to_string(),
                        chunk.doc_id.to_string(),
                        chunk.chunk_index,
                        chunk.content,
                        chunk.start_index.map(|i| i as i64),
                        vec_to_bytes(&chunk.embedding),
                    ])
                    .map_err(|e| RagError::database(format!("Failed to insert chunk: {}", e)))?;
                }
            }

            tx.commit()
                .map_err(|e| RagError::database(e.to_string()))?;

            debug!("Inserted document {} with {} chunks", doc.id, chunks.len());
            Ok(())
        })
    }

    async fn get_document(&self, id: Ulid) -> Result<Option<Document>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT id, collection, source, content_hash, format,
                           origin, metadata, created_at
                    FROM documents WHERE id = ?1
                    "#,
                )
                .map_err(|e| RagError::database(e.to_string()))?;

            let result = stmt
                .query_row(params![id.to_string()], Self::row_to_document)
                .optional()
                .map_err(|e| RagError::database(e.to_string()))?;

            Ok(result)
        })
    }

    // Chunk operations

    async fn get_chunk(&self, id: Ulid) -> Result<Option<Chunk>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT id, doc_id, chunk_index, content, start_index, embedding
                    FROM chunks WHERE id = ?1
                    "#,
                )
                .map_err(|e| RagError::database(e.to_string()))?;

            let result = stmt
                .query_row(params![id.to_string()], Self::row_to_chunk)
                .optional()
                .map_err(|e| RagError::database(e.to_string()))?;

            Ok(result)
        })
    }

    // Search operations

    async fn vector_search(
        &self,
        embedding: &[f32],
        k: u32,
        collection: &str,
    ) -> Result<Vec<(Ulid, f32)>> {
        let embedding_bytes = vec_to_bytes(embedding);

        self.with_conn(|conn| {
            // Ties keep insertion order
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT c.id, cosine_similarity(c.embedding, ?1) AS score
                    FROM chunks c
                    JOIN documents d ON d.id = c.doc_id
                    WHERE d.collection = ?2
                    ORDER BY score DESC, c.rowid ASC
                    LIMIT ?3
                    "#,
                )
                .map_err(|e| RagError::database(e.to_string()))?;

            let rows = stmt
                .query_map(params![embedding_bytes, collection, k], |row| {
                    let id_str: String = row.get(0)?;
                    let score: f64 = row.get(1)?;
                    Ok((id_str, score as f32))
                })
                .map_err(|e| RagError::database(e.to_string()))?;

            let mut results = Vec::new();
            for row in rows {
                let (id_str, score) = row.map_err(|e| RagError::database(e.to_string()))?;
                let id = Ulid::from_string(&id_str)
                    .map_err(|e| RagError::database(format!("Corrupt chunk id {}: {}", id_str, e)))?;
                results.push((id, score));
            }

            Ok(results)
        })
    }

    // Stats

    async fn get_stats(&self, collection: &str) -> Result<Stats> {
        let info = self
            .get_collection(collection)
            .await?
            .ok_or_else(|| RagError::CollectionNotFound {
                name: collection.to_string(),
            })?;

        self.with_conn(|conn| {
            let documents: u64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM documents WHERE collection = ?1",
                    params![collection],
                    |row| row.get(0),
                )
                .map_err(|e| RagError::database(e.to_string()))?;

            let chunks: u64 = conn
                .query_row(
                    r#"
                    SELECT COUNT(*) FROM chunks c
                    JOIN documents d ON d.id = c.doc_id
                    WHERE d.collection = ?1
                    "#,
                    params![collection],
                    |row| row.get(0),
                )
                .map_err(|e| RagError::database(e.to_string()))?;

            Ok(Stats {
                collection: info.name,
                documents,
                chunks,
                dimension: info.dimension,
            })
        })
    }
}

// Helper methods
impl SqliteStore {
    /// Convert a row to a Document.
    fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<Document> {
        let id_str: String = row.get(0)?;
        let content_hash: Vec<u8> = row.get(3)?;
        let format_str: String = row.get(4)?;
        let origin_str: String = row.get(5)?;
        let metadata_str: String = row.get(6)?;

        Ok(Document {
            id: parse_ulid(0, &id_str)?,
            collection: row.get(1)?,
            source: row.get(2)?,
            content_hash: content_hash.try_into().unwrap_or([0u8; 32]),
            format: format_str.parse().map_err(|e| conversion_error(4, e))?,
            origin: match origin_str.as_str() {
                "upload" => docrag_core::DocumentOrigin::Upload,
                _ => docrag_core::DocumentOrigin::Preload,
            },
            metadata: serde_json::from_str(&metadata_str).unwrap_or_default(),
            created_at: row.get::<_, i64>(7)? as u64,
        })
    }

    /// Convert a row to a Chunk.
    fn row_to_chunk(row: &rusqlite::Row<'_>) -> rusqlite::Result<Chunk> {
        let id_str: String = row.get(0)?;
        let doc_id_str: String = row.get(1)?;
        let embedding: Vec<u8> = row.get(5)?;

        Ok(Chunk {
            id: parse_ulid(0, &id_str)?,
            doc_id: parse_ulid(1, &doc_id_str)?,
            chunk_index: row.get(2)?,
            content: row.get(3)?,
            start_index: row.get::<_, Option<i64>>(4)?.map(|i| i as u64),
            embedding: bytes_to_vec(&embedding),
        })
    }
}

fn parse_ulid(column: usize, s: &str) -> rusqlite::Result<Ulid> {
    Ulid::from_string(s).map_err(|e| conversion_error(column, e))
}

fn conversion_error<E>(column: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
}
