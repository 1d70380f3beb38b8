//! DocumentStore trait: abstract interface for the product knowledge base.
//!
//! Provides a clean abstraction over vector-capable storage for the answer
//! pipeline. The primary implementation is `SqliteDocumentStore` in the
//! `sqlite` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

/// A stored, embeddable product document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    /// Stable identifier; the owning product's external id.
    pub doc_id: String,
    /// Named collection the document belongs to.
    pub collection: String,
    /// Denormalized text shown to the model.
    pub content: String,
    /// Structured metadata (product id, name, brand, price, urls).
    pub metadata: Option<serde_json::Value>,
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMatch {
    pub document: StoredDocument,
    /// Similarity score (higher = better).
    pub score: f32,
}

/// Abstract trait for knowledge-base storage backends.
///
/// Implementations should support:
/// - Vector similarity search
/// - Collection-scoped document management
/// - Idempotent upserts keyed by document id within a collection
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert or replace a document with its embedding vector.
    async fn upsert(&self, document: StoredDocument, embedding: Vec<f32>) -> Result<(), ApiError>;

    /// Insert or replace multiple documents in one transaction.
    async fn upsert_batch(
        &self,
        items: Vec<(StoredDocument, Vec<f32>)>,
    ) -> Result<(), ApiError>;

    /// Search for documents similar to the query embedding.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        collection: Option<&str>,
    ) -> Result<Vec<DocumentMatch>, ApiError>;

    /// Get the total document count (optionally filtered by collection).
    async fn count(&self, collection: Option<&str>) -> Result<usize, ApiError>;

    /// Delete all documents in a collection, returning how many went away.
    async fn clear_collection(&self, collection: &str) -> Result<usize, ApiError>;
}
