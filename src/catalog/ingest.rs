//! CSV catalog ingestion pipeline.
//!
//! Reads raw catalog rows, groups them into products with variants,
//! inserts new products in one transaction and indexes a document per
//! product into the knowledge base. The pipeline never returns an error
//! to the caller; failures are recorded on the returned report and the
//! catalog is left in a consistent state (either the whole batch landed
//! or none of it did).

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use super::store::CatalogStore;
use super::types::{
    display_price, CatalogRow, NewProduct, NewVariant, Product, ProductVariant, DEFAULT_STOCK,
};
use crate::core::config::IngestPolicy;
use crate::core::errors::ApiError;
use crate::llm::LlmProvider;
use crate::rag::{DocumentStore, StoredDocument};

const EMBED_BATCH_SIZE: usize = 32;

/// Outcome of one ingestion run. `error` is set when the run stopped
/// early; counts reflect whatever completed before that point.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub products_created: usize,
    pub products_skipped: usize,
    pub variants_created: usize,
    pub documents_indexed: usize,
    pub error: Option<String>,
}

pub struct IngestPipeline {
    catalog: Arc<CatalogStore>,
    documents: Option<Arc<dyn DocumentStore>>,
    provider: Option<Arc<dyn LlmProvider>>,
    embedding_model: String,
    collection: String,
    policy: IngestPolicy,
}

impl IngestPipeline {
    pub fn new(
        catalog: Arc<CatalogStore>,
        documents: Option<Arc<dyn DocumentStore>>,
        provider: Option<Arc<dyn LlmProvider>>,
        embedding_model: String,
        collection: String,
        policy: IngestPolicy,
    ) -> Self {
        Self {
            catalog,
            documents,
            provider,
            embedding_model,
            collection,
            policy,
        }
    }

    /// Run the full pipeline for one CSV file.
    pub async fn run(&self, path: &Path) -> IngestReport {
        let mut report = IngestReport::default();
        info!("starting catalog ingestion for {}", path.display());

        let rows = match self.read_rows(path, &mut report) {
            Ok(rows) => rows,
            Err(err) => {
                warn!("catalog ingestion could not read {}: {}", path.display(), err);
                report.error = Some(err.to_string());
                return report;
            }
        };

        let groups = group_rows(rows);
        let mut new_products = Vec::new();

        for (uniq_id, group) in groups {
            match self.catalog.exists(&uniq_id).await {
                Ok(true) => {
                    report.products_skipped += 1;
                    continue;
                }
                Ok(false) => {}
                Err(err) => {
                    warn!("catalog lookup for '{}' failed: {}", uniq_id, err);
                    report.error = Some(err.to_string());
                    return report;
                }
            }
            new_products.push(build_product(uniq_id, group));
        }

        let created = if new_products.is_empty() {
            Vec::new()
        } else {
            match self.catalog.insert_products(new_products).await {
                Ok(created) => created,
                Err(err) => {
                    warn!("catalog insert failed, batch rolled back: {}", err);
                    report.error = Some(err.to_string());
                    return report;
                }
            }
        };

        report.products_created = created.len();
        report.variants_created = created.iter().map(|(_, variants)| variants.len()).sum();

        self.index_documents(&created, &mut report).await;

        info!(
            "catalog ingestion finished: {} rows read, {} dropped, {} products created, {} skipped, {} variants, {} documents indexed",
            report.rows_read,
            report.rows_dropped,
            report.products_created,
            report.products_skipped,
            report.variants_created,
            report.documents_indexed
        );
        report
    }

    fn read_rows(&self, path: &Path, report: &mut IngestReport) -> Result<Vec<CatalogRow>, ApiError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(ApiError::internal)?;

        let mut rows = Vec::new();
        for record in reader.deserialize::<CatalogRow>() {
            report.rows_read += 1;
            let row = match record {
                Ok(row) => row,
                Err(err) => {
                    warn!("skipping malformed catalog row: {}", err);
                    report.rows_dropped += 1;
                    continue;
                }
            };

            if row.product_id.trim().is_empty()
                || row.product_name.trim().is_empty()
                || row.description.trim().is_empty()
            {
                report.rows_dropped += 1;
                continue;
            }
            rows.push(row);
        }
        Ok(rows)
    }

    /// Embed and upsert documents for the created products. Failures here
    /// are logged and leave the products committed but unindexed; a later
    /// re-run with the replace policy can rebuild the collection.
    async fn index_documents(
        &self,
        created: &[(Product, Vec<ProductVariant>)],
        report: &mut IngestReport,
    ) {
        let (Some(documents), Some(provider)) = (self.documents.as_ref(), self.provider.as_ref())
        else {
            warn!("document indexing skipped: knowledge base is not available");
            return;
        };

        let to_index: Vec<StoredDocument> = match self.policy {
            IngestPolicy::Append => created
                .iter()
                .map(|(product, variants)| build_document(&self.collection, product, variants))
                .collect(),
            IngestPolicy::Replace => {
                let all = match self.catalog.all_with_variants().await {
                    Ok(all) => all,
                    Err(err) => {
                        warn!("collection rebuild skipped, catalog read failed: {}", err);
                        return;
                    }
                };
                all.iter()
                    .map(|(product, variants)| build_document(&self.collection, product, variants))
                    .collect()
            }
        };

        if to_index.is_empty() {
            return;
        }

        let mut embedded = Vec::with_capacity(to_index.len());
        for chunk in to_index.chunks(EMBED_BATCH_SIZE) {
            let inputs: Vec<String> = chunk.iter().map(|doc| doc.content.clone()).collect();
            let embeddings = match provider.embed(&inputs, &self.embedding_model).await {
                Ok(embeddings) => embeddings,
                Err(err) => {
                    warn!(
                        "embedding failed, {} documents left unindexed: {}",
                        to_index.len(),
                        err
                    );
                    return;
                }
            };
            if embeddings.len() != chunk.len() {
                warn!(
                    "embedding count mismatch: {} inputs, {} vectors",
                    chunk.len(),
                    embeddings.len()
                );
                return;
            }
            embedded.extend(chunk.iter().cloned().zip(embeddings));
        }

        // Clearing only after all embeddings are in hand keeps the old
        // collection serving queries if the embedding backend is down.
        if matches!(self.policy, IngestPolicy::Replace) {
            match documents.clear_collection(&self.collection).await {
                Ok(removed) => {
                    info!("cleared {} documents from '{}' for rebuild", removed, self.collection)
                }
                Err(err) => {
                    warn!("could not clear collection '{}': {}", self.collection, err);
                    return;
                }
            }
        }

        let count = embedded.len();
        match documents.upsert_batch(embedded).await {
            Ok(()) => report.documents_indexed = count,
            Err(err) => warn!("document upsert failed: {}", err),
        }
    }
}

/// Collapse raw rows into one product per external id, keeping first-seen
/// order. Each row in a group becomes one variant of that product.
fn group_rows(rows: Vec<CatalogRow>) -> Vec<(String, Vec<CatalogRow>)> {
    let mut order = Vec::new();
    let mut groups: HashMap<String, Vec<CatalogRow>> = HashMap::new();

    for row in rows {
        let key = row.product_id.trim().to_string();
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(row);
    }

    order
        .into_iter()
        .map(|key| {
            let group = groups.remove(&key).unwrap_or_default();
            (key, group)
        })
        .collect()
}

/// Build a product from its group of rows. Display fields come from the
/// first row; image urls are collected across the group; every row
/// contributes one variant.
fn build_product(uniq_id: String, group: Vec<CatalogRow>) -> NewProduct {
    let first = &group[0];

    let brand = {
        let trimmed = first.brand.trim();
        if trimmed.is_empty() {
            "Unknown".to_string()
        } else {
            trimmed.to_string()
        }
    };

    let mut image_urls: Vec<String> = Vec::new();
    for row in &group {
        let url = row.image_url.trim();
        if !url.is_empty() && !image_urls.iter().any(|seen| seen == url) {
            image_urls.push(url.to_string());
        }
    }

    let variants = group
        .iter()
        .map(|row| NewVariant {
            retail_price: row.retail_price.trim().parse::<f64>().unwrap_or(0.0),
            discounted_price: row.discounted_price.trim().parse::<f64>().unwrap_or(0.0),
            stock: DEFAULT_STOCK,
        })
        .collect();

    NewProduct {
        uniq_id,
        name: first.product_name.trim().to_string(),
        category_tree: non_empty_trimmed(&first.category),
        description: first.description.trim().to_string(),
        brand,
        product_url: non_empty_trimmed(&first.product_url),
        image_urls,
        variants,
    }
}

/// Denormalize a product into the embeddable document stored in the
/// knowledge base. The price rides along in the text so the model can
/// quote it.
pub fn build_document(
    collection: &str,
    product: &Product,
    variants: &[ProductVariant],
) -> StoredDocument {
    let price = display_price(variants);

    let content = format!(
        "Product: {}. Brand: {}. Category: {}. Price: ${}. Description: {}",
        product.name,
        product.brand,
        product.category_tree.as_deref().unwrap_or("General"),
        price,
        product.description
    );

    let metadata = serde_json::json!({
        "product_id": product.id,
        "name": product.name,
        "brand": product.brand,
        "price": price,
        "url": product.product_url.as_deref().unwrap_or("#"),
        "image_url": product.image_urls.first().map(String::as_str).unwrap_or("#"),
    });

    StoredDocument {
        doc_id: product.uniq_id.clone(),
        collection: collection.to_string(),
        content,
        metadata: Some(metadata),
    }
}

fn non_empty_trimmed(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
