//! docrag-query - Retrieval-augmented answering
//!
//! This crate turns questions into answers over the vector collection:
//!
//! - [`QueryEngine`] retrieves the top-k chunks and asks the chat model to
//!   answer from them, short-circuiting when nothing is retrieved
//! - [`Validator`] runs a generate/validate loop with validator feedback
//!
//! # Example
//!
//! ```rust,ignore
//! use docrag_query::{QueryConfig, QueryEngine};
//!
//! let engine = QueryEngine::new(collection, chat, QueryConfig::default());
//! let answer = engine.answer("What is the vacation policy?").await?;
//! println!("{} ({} chunks)", answer.answer, answer.context.len());
//! ```

mod engine;
mod prompt;
mod validate;

#[cfg(test)]
mod testing;

pub use engine::{QueryConfig, QueryEngine, RagAnswer};
pub use prompt::{rag_prompt, retry_prompt, validation_prompt, INSUFFICIENT_CONTEXT_ANSWER};
pub use validate::{ValidatedAnswer, ValidationAttempt, ValidationStatus, Validator, ValidatorConfig};
