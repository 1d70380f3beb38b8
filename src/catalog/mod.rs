//! Product catalog: relational storage plus the CSV ingestion pipeline
//! that feeds both the catalog and the document knowledge base.

pub mod ingest;
pub mod store;
pub mod types;

pub use ingest::{build_document, IngestPipeline, IngestReport};
pub use store::CatalogStore;
pub use types::{Product, ProductVariant};
