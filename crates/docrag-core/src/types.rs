//! Core domain types for the RAG service.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use ulid::Ulid;

/// Document format, decided from the file name and driving text extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// UTF-8 plain text (`.txt`).
    Text,
    /// Word-processor document (`.docx`, `.doc`).
    Word,
}

impl DocumentFormat {
    /// Detect the format from a file extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "txt" => Some(Self::Text),
            "docx" | "doc" => Some(Self::Word),
            _ => None,
        }
    }

    /// Detect the format from a file name or path.
    pub fn from_filename(name: &str) -> Option<Self> {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Label reported to API clients.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Word => "word",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for DocumentFormat {
    type Err = crate::error::RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "word" => Ok(Self::Word),
            other => Err(crate::error::RagError::invalid_argument(format!(
                "unknown document format: {other}"
            ))),
        }
    }
}

/// How a document entered the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentOrigin {
    /// Loaded from the documents folder at boot.
    Preload,
    /// Uploaded over HTTP.
    Upload,
}

impl DocumentOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preload => "preload",
            Self::Upload => "upload",
        }
    }
}

/// A document record. The raw bytes are not retained after chunking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier (ULID).
    pub id: Ulid,

    /// Collection this document belongs to.
    pub collection: String,

    /// Source file name (or path relative to the documents folder).
    pub source: String,

    /// Blake3 hash of the extracted text.
    #[serde(with = "serde_hash")]
    pub content_hash: [u8; 32],

    /// Decoded format.
    pub format: DocumentFormat,

    /// Preload or upload.
    pub origin: DocumentOrigin,

    /// Extra metadata attached to every chunk of this document.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,

    /// Creation timestamp (Unix millis).
    pub created_at: u64,
}

impl Document {
    /// Create a new document record for the extracted `text`.
    pub fn new(
        collection: &str,
        source: &str,
        text: &str,
        format: DocumentFormat,
        origin: DocumentOrigin,
    ) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), serde_json::Value::from(source));
        if origin == DocumentOrigin::Upload {
            metadata.insert("uploaded".to_string(), serde_json::Value::Bool(true));
        }

        Self {
            id: Ulid::new(),
            collection: collection.to_string(),
            source: source.to_string(),
            content_hash: *blake3::hash(text.as_bytes()).as_bytes(),
            format,
            origin,
            metadata,
            created_at: now_millis(),
        }
    }

    /// Hex form of the content hash, for logs.
    pub fn content_hash_hex(&self) -> String {
        hex::encode(self.content_hash)
    }
}

/// A chunk of a document together with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique identifier (ULID).
    pub id: Ulid,

    /// Parent document ID.
    pub doc_id: Ulid,

    /// Index within the document (0-based).
    pub chunk_index: u32,

    /// Chunk text content.
    pub content: String,

    /// Character offset of the chunk in the extracted text, when it could be located.
    pub start_index: Option<u64>,

    /// Embedding vector.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
}

impl Chunk {
    /// Create a new chunk without an embedding.
    pub fn new(doc_id: Ulid, chunk_index: u32, content: &str, start_index: Option<u64>) -> Self {
        Self {
            id: Ulid::new(),
            doc_id,
            chunk_index,
            content: content.to_string(),
            start_index,
            embedding: Vec::new(),
        }
    }

    /// Attach an embedding.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }
}

/// A named collection bound to an embedding dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    /// Collection name (unique identifier).
    pub name: String,

    /// Dimension of every embedding stored in this collection.
    pub dimension: usize,

    /// Creation timestamp (Unix millis).
    pub created_at: u64,
}

impl Collection {
    /// Create a new collection.
    pub fn new(name: &str, dimension: usize) -> Self {
        Self {
            name: name.to_string(),
            dimension,
            created_at: now_millis(),
        }
    }
}

/// A search result with score and chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Result rank (1-indexed).
    pub rank: u32,

    /// Cosine similarity (higher is better).
    pub score: f32,

    /// The matched chunk.
    pub chunk: Chunk,

    /// Source document name.
    pub source: String,
}

/// Statistics about a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stats {
    /// Collection name.
    pub collection: String,

    /// Number of documents.
    pub documents: u64,

    /// Number of chunks.
    pub chunks: u64,

    /// Embedding dimension.
    pub dimension: usize,
}

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Current time in Unix milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Hex (de)serialization for content hashes.
mod serde_hash {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        hex::encode(value).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex = String::deserialize(deserializer)?;
        let bytes = hex::decode(&hex).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("invalid hash length"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(DocumentFormat::from_extension("txt"), Some(DocumentFormat::Text));
        assert_eq!(DocumentFormat::from_extension("DOCX"), Some(DocumentFormat::Word));
        assert_eq!(DocumentFormat::from_extension("doc"), Some(DocumentFormat::Word));
        assert_eq!(DocumentFormat::from_extension("pdf"), None);
    }

    #[test]
    fn test_format_from_filename() {
        assert_eq!(DocumentFormat::from_filename("notes/test.txt"), Some(DocumentFormat::Text));
        assert_eq!(DocumentFormat::from_filename("Report.docx"), Some(DocumentFormat::Word));
        assert_eq!(DocumentFormat::from_filename("no_extension"), None);
    }

    #[test]
    fn test_upload_document_metadata() {
        let doc = Document::new(
            "company_docs",
            "test.txt",
            "Test Document for Upload",
            DocumentFormat::Text,
            DocumentOrigin::Upload,
        );
        assert_eq!(doc.metadata["source"], "test.txt");
        assert_eq!(doc.metadata["uploaded"], true);
        assert_eq!(doc.content_hash_hex().len(), 64);
    }

    #[test]
    fn test_preload_document_not_marked_uploaded() {
        let doc = Document::new(
            "company_docs",
            "handbook.txt",
            "text",
            DocumentFormat::Text,
            DocumentOrigin::Preload,
        );
        assert!(!doc.metadata.contains_key("uploaded"));
    }

    #[test]
    fn test_chat_message_serde() {
        let msg: ChatMessage = serde_json::from_str(r#"{"role":"assistant","content":"hi"}"#).unwrap();
        assert_eq!(msg, ChatMessage::assistant("hi"));
    }
}
