//! docrag-store - In-memory SQLite storage and the vector collection
//!
//! This crate holds documents, chunks and their embeddings in an in-memory
//! SQLite database and ranks chunks by cosine similarity.

mod collection;
mod schema;
mod sqlite;
mod vector;

pub use collection::VectorCollection;
pub use sqlite::SqliteStore;
pub use vector::cosine_similarity;

// Re-export schema for testing
pub use schema::SCHEMA;
