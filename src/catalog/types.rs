use serde::{Deserialize, Serialize};

/// Stock assigned to every variant at ingestion time; the source data
/// carries no stock column.
pub const DEFAULT_STOCK: i64 = 100;

/// Core, static information about a product. `uniq_id` is the external
/// identifier from the source data and is unique across the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub uniq_id: String,
    pub name: String,
    pub category_tree: Option<String>,
    pub description: String,
    pub brand: String,
    pub product_url: Option<String>,
    pub image_urls: Vec<String>,
}

/// Dynamic, per-offer data for a product: price and stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: i64,
    pub product_id: i64,
    pub retail_price: f64,
    pub discounted_price: f64,
    pub stock: i64,
}

/// A product waiting to be inserted, with its variants.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub uniq_id: String,
    pub name: String,
    pub category_tree: Option<String>,
    pub description: String,
    pub brand: String,
    pub product_url: Option<String>,
    pub image_urls: Vec<String>,
    pub variants: Vec<NewVariant>,
}

#[derive(Debug, Clone)]
pub struct NewVariant {
    pub retail_price: f64,
    pub discounted_price: f64,
    pub stock: i64,
}

/// One raw CSV row. Everything is read as text; missing columns become
/// empty strings and are handled during validation.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogRow {
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub product_url: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub retail_price: String,
    #[serde(default)]
    pub discounted_price: String,
}

/// Price shown to the answer engine: the first variant's retail price, or
/// the "unavailable" sentinel when there is no variant or no usable price.
pub fn display_price(variants: &[ProductVariant]) -> String {
    match variants.first() {
        Some(variant) if variant.retail_price > 0.0 => format!("{}", variant.retail_price),
        _ => "unavailable".to_string(),
    }
}
