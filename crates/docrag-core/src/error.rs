//! Error types for the RAG service.

use thiserror::Error;

/// Result type alias using RagError.
pub type Result<T> = std::result::Result<T, RagError>;

/// Errors that can occur in the RAG service.
#[derive(Error, Debug)]
pub enum RagError {
    /// Collection not found.
    #[error("Collection not found: {name}")]
    CollectionNotFound { name: String },

    /// Collection already exists.
    #[error("Collection already exists: {name}")]
    CollectionExists { name: String },

    /// Invalid argument provided.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The file extension is not one of the accepted document formats.
    #[error("Unsupported document format: {filename}")]
    UnsupportedFormat { filename: String },

    /// Text content is not valid UTF-8.
    #[error("Invalid text encoding in {filename}")]
    Encoding { filename: String },

    /// Document could be decoded but holds no text.
    #[error("No text content found in {filename}")]
    EmptyDocument { filename: String },

    /// Failed to decode a document into text.
    #[error("Failed to decode {filename}: {reason}")]
    Decode { filename: String, reason: String },

    /// Embedding dimension does not match the collection.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Database error.
    #[error("Database error: {message}")]
    Database { message: String },

    /// Embedding provider error.
    #[error("Embedding error: {message}")]
    Embedding { message: String },

    /// Chat model error.
    #[error("Language model error: {message}")]
    Llm { message: String },

    /// Chunking error.
    #[error("Chunking error: {message}")]
    Chunking { message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Internal error (unexpected).
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl RagError {
    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// Create an embedding error.
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
        }
    }

    /// Create a language model error.
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
        }
    }

    /// Create a chunking error.
    pub fn chunking(message: impl Into<String>) -> Self {
        Self::Chunking {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a decode error for the named file.
    pub fn decode(filename: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            filename: filename.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the error was caused by the caller's input rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument { .. }
                | Self::UnsupportedFormat { .. }
                | Self::Encoding { .. }
                | Self::EmptyDocument { .. }
                | Self::Decode { .. }
        )
    }

    /// Get the stable error code used in API responses and logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::CollectionNotFound { .. } => "COLLECTION_NOT_FOUND",
            Self::CollectionExists { .. } => "COLLECTION_EXISTS",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            Self::Encoding { .. } => "ENCODING_ERROR",
            Self::EmptyDocument { .. } => "EMPTY_DOCUMENT",
            Self::Decode { .. } => "DECODE_ERROR",
            Self::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            Self::Database { .. } => "DATABASE_ERROR",
            Self::Embedding { .. } => "EMBEDDING_ERROR",
            Self::Llm { .. } => "LLM_ERROR",
            Self::Chunking { .. } => "CHUNKING_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Config { .. } => "CONFIG_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}
