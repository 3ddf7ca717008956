//! docrag-core - Core types and traits for the document RAG service
//!
//! This crate provides the foundational types, traits, configuration and
//! error handling shared by the storage, provider, query and server crates.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::{RagError, Result};
pub use traits::*;
pub use types::*;
