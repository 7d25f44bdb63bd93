//! # Product Repository
//!
//! Database operations for products — the narrow interface the (out of
//! scope) catalog management layer uses.
//!
//! ## Ground Rules
//! - `profit_margin_cents` is rewritten from selling − cost on EVERY write;
//!   a caller-supplied margin is ignored.
//! - `current_stock` is owned by the inventory ledger. The update here
//!   deliberately does not touch it; sending a product through `update()`
//!   can never corrupt the movement audit trail.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use duka_core::Product;

/// Every product column, in the order the struct declares them.
/// Shared by the SELECT queries below.
const PRODUCT_COLUMNS: &str = "id, business_id, sku, name, description, category_id, barcode, \
     cost_price_cents, selling_price_cents, profit_margin_cents, \
     current_stock, minimum_stock, maximum_stock, status, created_at, updated_at";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1"
        ))
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists a business's products, sorted by name.
    pub async fn list_for_business(&self, business_id: &str) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE business_id = ?1 ORDER BY name"
        ))
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Inserts a new product.
    ///
    /// ## Arguments
    /// * `product` - Product to insert (id should be generated beforehand)
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product with the derived margin applied
    /// * `Err(DbError::UniqueViolation)` - SKU or barcode already exists
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(sku = %product.sku, "Inserting product");

        let mut stored = product.clone();
        stored.profit_margin_cents = stored.computed_profit_margin_cents();

        sqlx::query(
            r#"
            INSERT INTO products (
                id, business_id, sku, name, description, category_id, barcode,
                cost_price_cents, selling_price_cents, profit_margin_cents,
                current_stock, minimum_stock, maximum_stock,
                status, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7,
                ?8, ?9, ?10,
                ?11, ?12, ?13,
                ?14, ?15, ?16
            )
            "#,
        )
        .bind(&stored.id)
        .bind(&stored.business_id)
        .bind(&stored.sku)
        .bind(&stored.name)
        .bind(&stored.description)
        .bind(&stored.category_id)
        .bind(&stored.barcode)
        .bind(stored.cost_price_cents)
        .bind(stored.selling_price_cents)
        .bind(stored.profit_margin_cents)
        .bind(stored.current_stock)
        .bind(stored.minimum_stock)
        .bind(stored.maximum_stock)
        .bind(stored.status)
        .bind(stored.created_at)
        .bind(stored.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(stored)
    }

    /// Updates an existing product's catalog fields.
    ///
    /// Recomputes the profit margin from the new prices. Does NOT touch
    /// `current_stock` — stock changes go through the ledger only.
    ///
    /// ## Returns
    /// * `Ok(())` - Update successful
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let now = Utc::now();
        let margin = product.computed_profit_margin_cents();

        let result = sqlx::query(
            r#"
            UPDATE products SET
                sku = ?2,
                name = ?3,
                description = ?4,
                category_id = ?5,
                barcode = ?6,
                cost_price_cents = ?7,
                selling_price_cents = ?8,
                profit_margin_cents = ?9,
                minimum_stock = ?10,
                maximum_stock = ?11,
                status = ?12,
                updated_at = ?13
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category_id)
        .bind(&product.barcode)
        .bind(product.cost_price_cents)
        .bind(product.selling_price_cents)
        .bind(margin)
        .bind(product.minimum_stock)
        .bind(product.maximum_stock)
        .bind(product.status)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Counts a business's products (for diagnostics).
    pub async fn count(&self, business_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE business_id = ?1")
                .bind(business_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

/// Fetches a product inside an open transaction.
/// Used by the commit engine so its reads see its own writes.
pub(crate) async fn get_by_id_on(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(product)
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
