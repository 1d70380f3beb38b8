//! Retrieval-augmented answering over the product knowledge base.
//!
//! This module provides:
//! - `RagEngine`: the full question pipeline (reformulate, retrieve,
//!   synthesize, remember)
//! - `IntentClassifier`: small-talk short-circuiting ahead of retrieval
//! - `DocumentStore` / `SqliteDocumentStore`: vector-searchable storage
//!   for product documents
//! - `prompts`: the fixed prompt templates and debug formatting

pub mod engine;
pub mod intent;
pub mod prompts;
pub mod sqlite;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
#[cfg(test)]
mod tests;

pub use engine::{RagAnswer, RagEngine};
pub use intent::{Intent, IntentClassifier};
pub use sqlite::SqliteDocumentStore;
pub use store::{DocumentMatch, DocumentStore, StoredDocument};
