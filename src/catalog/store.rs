//! Relational product catalog backed by SQLite.
//!
//! Products are keyed by their external `uniq_id`; variants belong to
//! exactly one product and disappear with it. Batch inserts run in a
//! single transaction so a failed ingestion leaves the catalog unchanged.

use std::collections::HashMap;
use std::path::PathBuf;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::types::{NewProduct, Product, ProductVariant};
use crate::core::config::AppPaths;
use crate::core::errors::ApiError;

#[derive(Clone)]
pub struct CatalogStore {
    pool: SqlitePool,
}

impl CatalogStore {
    pub async fn new(paths: &AppPaths) -> Result<Self, ApiError> {
        Self::with_path(paths.catalog_db_path.clone()).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS products (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                uniq_id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                category_tree TEXT,
                description TEXT NOT NULL,
                brand TEXT NOT NULL,
                product_url TEXT,
                image_urls TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_brand ON products(brand)")
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS product_variants (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                product_id INTEGER NOT NULL,
                retail_price REAL NOT NULL DEFAULT 0.0,
                discounted_price REAL NOT NULL DEFAULT 0.0,
                stock INTEGER NOT NULL DEFAULT 100,
                FOREIGN KEY(product_id) REFERENCES products(id) ON DELETE CASCADE
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_variants_product_id ON product_variants(product_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    pub async fn exists(&self, uniq_id: &str) -> Result<bool, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE uniq_id = ?1")
            .bind(uniq_id)
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(count > 0)
    }

    /// Insert a batch of products with their variants in one transaction.
    /// Returns the created records hydrated with their assigned row ids.
    /// Any failure rolls back the whole batch.
    pub async fn insert_products(
        &self,
        products: Vec<NewProduct>,
    ) -> Result<Vec<(Product, Vec<ProductVariant>)>, ApiError> {
        if products.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;
        let mut created = Vec::with_capacity(products.len());

        for product in products {
            let image_urls_json =
                serde_json::to_string(&product.image_urls).map_err(ApiError::internal)?;

            let result = sqlx::query(
                "INSERT INTO products (uniq_id, name, category_tree, description, brand, product_url, image_urls)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .bind(&product.uniq_id)
            .bind(&product.name)
            .bind(&product.category_tree)
            .bind(&product.description)
            .bind(&product.brand)
            .bind(&product.product_url)
            .bind(&image_urls_json)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

            let product_id = result.last_insert_rowid();
            let mut variants = Vec::with_capacity(product.variants.len());

            for variant in &product.variants {
                let result = sqlx::query(
                    "INSERT INTO product_variants (product_id, retail_price, discounted_price, stock)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .bind(product_id)
                .bind(variant.retail_price)
                .bind(variant.discounted_price)
                .bind(variant.stock)
                .execute(&mut *tx)
                .await
                .map_err(ApiError::internal)?;

                variants.push(ProductVariant {
                    id: result.last_insert_rowid(),
                    product_id,
                    retail_price: variant.retail_price,
                    discounted_price: variant.discounted_price,
                    stock: variant.stock,
                });
            }

            created.push((
                Product {
                    id: product_id,
                    uniq_id: product.uniq_id,
                    name: product.name,
                    category_tree: product.category_tree,
                    description: product.description,
                    brand: product.brand,
                    product_url: product.product_url,
                    image_urls: product.image_urls,
                },
                variants,
            ));
        }

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(created)
    }

    pub async fn product_by_uniq_id(&self, uniq_id: &str) -> Result<Option<Product>, ApiError> {
        let row = sqlx::query(
            "SELECT id, uniq_id, name, category_tree, description, brand, product_url, image_urls
             FROM products
             WHERE uniq_id = ?1",
        )
        .bind(uniq_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(row.as_ref().map(Self::row_to_product))
    }

    /// The whole catalog with variants grouped per product, insertion order
    /// preserved. Used when rebuilding the document collection.
    pub async fn all_with_variants(
        &self,
    ) -> Result<Vec<(Product, Vec<ProductVariant>)>, ApiError> {
        let product_rows = sqlx::query(
            "SELECT id, uniq_id, name, category_tree, description, brand, product_url, image_urls
             FROM products
             ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        let variant_rows = sqlx::query(
            "SELECT id, product_id, retail_price, discounted_price, stock
             FROM product_variants
             ORDER BY product_id ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        let mut variants_by_product: HashMap<i64, Vec<ProductVariant>> = HashMap::new();
        for row in &variant_rows {
            let variant = Self::row_to_variant(row);
            variants_by_product
                .entry(variant.product_id)
                .or_default()
                .push(variant);
        }

        Ok(product_rows
            .iter()
            .map(|row| {
                let product = Self::row_to_product(row);
                let variants = variants_by_product.remove(&product.id).unwrap_or_default();
                (product, variants)
            })
            .collect())
    }

    pub async fn count_products(&self) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(count as usize)
    }

    pub async fn count_variants(&self) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product_variants")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(count as usize)
    }

    fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Product {
        let image_urls_json: String = row.get("image_urls");
        let image_urls =
            serde_json::from_str::<Vec<String>>(&image_urls_json).unwrap_or_default();

        Product {
            id: row.get("id"),
            uniq_id: row.get("uniq_id"),
            name: row.get("name"),
            category_tree: row.get("category_tree"),
            description: row.get("description"),
            brand: row.get("brand"),
            product_url: row.get("product_url"),
            image_urls,
        }
    }

    fn row_to_variant(row: &sqlx::sqlite::SqliteRow) -> ProductVariant {
        ProductVariant {
            id: row.get("id"),
            product_id: row.get("product_id"),
            retail_price: row.get("retail_price"),
            discounted_price: row.get("discounted_price"),
            stock: row.get("stock"),
        }
    }
}
