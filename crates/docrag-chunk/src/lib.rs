//! docrag-chunk - Text extraction and chunking
//!
//! This crate turns uploaded or preloaded files into text and splits that
//! text into overlapping chunks for embedding.
//!
//! # Example
//!
//! ```rust
//! use docrag_chunk::{extract_text, Chunker, ChunkConfig, RecursiveChunker};
//!
//! let extracted = extract_text("notes.txt", b"Hello world").unwrap();
//! let chunks = RecursiveChunker::new()
//!     .chunk(&extracted.text, &ChunkConfig::default())
//!     .unwrap();
//! assert_eq!(chunks.len(), 1);
//! ```

mod extract;
mod recursive;

pub use extract::{extract_text, ExtractedText};
pub use recursive::RecursiveChunker;

// Re-export types for convenience
pub use docrag_core::{ChunkConfig, ChunkData, Chunker, DocumentFormat};
