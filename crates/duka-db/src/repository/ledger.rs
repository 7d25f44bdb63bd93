//! # Inventory Ledger
//!
//! The single authority for product stock quantity and its audit trail.
//!
//! ## Movement Application
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    apply_movement (one transaction)                     │
//! │                                                                         │
//! │  1. SELECT current_stock FROM products WHERE id = ?                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. new = current + delta                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. UPDATE products SET current_stock = new                            │
//! │     WHERE id = ? AND current_stock = current   ← compare-and-swap      │
//! │       │                                                                 │
//! │       ├── 0 rows? A concurrent writer raced us → StockConflict,        │
//! │       │   whole transaction rolls back, caller retries                 │
//! │       ▼                                                                 │
//! │  4. INSERT stock_movements (previous, new, delta, ...)                 │
//! │                                                                         │
//! │  The (previous, new) pair can therefore never disagree with the        │
//! │  product row it was derived from — no dirty reads.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Negative Stock
//! Oversell is NOT rejected. Stock going negative is a business signal the
//! owner needs to see (it means shelf inventory didn't match the system),
//! and every such write is observable through `low_stock_products` and the
//! movement trail.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use duka_core::{MovementType, Product, StockMovement};

/// Repository for stock levels and the movement audit trail.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Applies a stock movement as its own transaction.
    ///
    /// Reads current stock, writes the product row and the movement row as
    /// one atomic unit. Used directly for purchases, adjustments, returns
    /// and damage write-offs; sale movements go through the commit engine,
    /// which calls the in-transaction variant instead.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - unknown product
    /// * `DbError::StockConflict` - concurrent writer raced past our read
    pub async fn apply_movement(
        &self,
        product_id: &str,
        movement_type: MovementType,
        quantity_delta: i64,
        reference: &str,
        notes: Option<&str>,
        created_by: &str,
    ) -> DbResult<StockMovement> {
        let mut tx = self.pool.begin().await?;

        let movement = apply_movement_on(
            &mut tx,
            product_id,
            movement_type,
            quantity_delta,
            reference,
            notes,
            created_by,
        )
        .await?;

        tx.commit().await?;
        Ok(movement)
    }

    /// Products at or below their minimum stock threshold.
    ///
    /// Read-only; reflects current state at call time. Most-depleted first,
    /// so oversold (negative) products top the list.
    pub async fn low_stock_products(&self, business_id: &str) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, business_id, sku, name, description, category_id, barcode,
                   cost_price_cents, selling_price_cents, profit_margin_cents,
                   current_stock, minimum_stock, maximum_stock, status, created_at, updated_at
            FROM products
            WHERE business_id = ?1 AND current_stock <= minimum_stock
            ORDER BY current_stock
            "#,
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Movement history for a product, newest first.
    pub async fn movements_for_product(
        &self,
        product_id: &str,
        limit: u32,
    ) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, product_id, movement_type, quantity,
                   previous_quantity, new_quantity,
                   reference, notes, created_by, created_at
            FROM stock_movements
            WHERE product_id = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#,
        )
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }
}

/// Applies a movement inside an already-open transaction.
///
/// This is the one code path that mutates `products.current_stock`. The
/// conditional UPDATE is the lost-update guard: if another writer changed
/// the stock after our read, zero rows match and the caller's transaction
/// rolls back with `StockConflict`.
pub(crate) async fn apply_movement_on(
    conn: &mut SqliteConnection,
    product_id: &str,
    movement_type: MovementType,
    quantity_delta: i64,
    reference: &str,
    notes: Option<&str>,
    created_by: &str,
) -> DbResult<StockMovement> {
    let now = Utc::now();

    let previous: i64 = sqlx::query_scalar("SELECT current_stock FROM products WHERE id = ?1")
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Product", product_id))?;

    let new_quantity = previous + quantity_delta;

    let result = sqlx::query(
        r#"
        UPDATE products
        SET current_stock = ?2, updated_at = ?3
        WHERE id = ?1 AND current_stock = ?4
        "#,
    )
    .bind(product_id)
    .bind(new_quantity)
    .bind(now)
    .bind(previous)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        warn!(product_id = %product_id, "Stock changed underneath us, aborting");
        return Err(DbError::StockConflict {
            product_id: product_id.to_string(),
        });
    }

    let movement = StockMovement {
        id: Uuid::new_v4().to_string(),
        product_id: product_id.to_string(),
        movement_type,
        quantity: quantity_delta,
        previous_quantity: previous,
        new_quantity,
        reference: reference.to_string(),
        notes: notes.map(|n| n.to_string()),
        created_by: created_by.to_string(),
        created_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            id, product_id, movement_type, quantity,
            previous_quantity, new_quantity,
            reference, notes, created_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.product_id)
    .bind(movement.movement_type)
    .bind(movement.quantity)
    .bind(movement.previous_quantity)
    .bind(movement.new_quantity)
    .bind(&movement.reference)
    .bind(&movement.notes)
    .bind(&movement.created_by)
    .bind(movement.created_at)
    .execute(&mut *conn)
    .await?;

    debug!(
        product_id = %product_id,
        delta = quantity_delta,
        previous = previous,
        new = new_quantity,
        "Stock movement applied"
    );

    if new_quantity < 0 {
        warn!(product_id = %product_id, stock = new_quantity, "Product oversold into negative stock");
    }

    Ok(movement)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[tokio::test]
    async fn test_movement_updates_stock_and_audit() {
        let db = testutil::test_db().await;
        let product = testutil::seed_product(&db, "FLOUR-2KG", 5000, 8000, 10, 5).await;
        let ledger = db.ledger();

        let movement = ledger
            .apply_movement(&product.id, MovementType::Sale, -2, "RCP-0001", None, "cashier-1")
            .await
            .unwrap();

        assert_eq!(movement.previous_quantity, 10);
        assert_eq!(movement.new_quantity, 8);
        assert_eq!(movement.quantity, -2);

        let fetched = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(fetched.current_stock, 8);
    }

    #[tokio::test]
    async fn test_movement_chain_is_consistent() {
        let db = testutil::test_db().await;
        let product = testutil::seed_product(&db, "SUGAR-1KG", 4000, 6000, 0, 5).await;
        let ledger = db.ledger();

        let deltas = [50, -3, -7, 12, -20];
        for (i, delta) in deltas.iter().enumerate() {
            let movement_type = if *delta >= 0 {
                MovementType::Purchase
            } else {
                MovementType::Sale
            };
            ledger
                .apply_movement(
                    &product.id,
                    movement_type,
                    *delta,
                    &format!("REF-{i}"),
                    None,
                    "manager-1",
                )
                .await
                .unwrap();
        }

        // Final stock equals initial minus/plus every delta
        let fetched = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(fetched.current_stock, deltas.iter().sum::<i64>());

        // The (previous, new) pairs reproduce the exact sequence
        let mut movements = ledger.movements_for_product(&product.id, 50).await.unwrap();
        movements.reverse(); // oldest first
        assert_eq!(movements.len(), deltas.len());

        let mut running = 0;
        for (movement, delta) in movements.iter().zip(deltas.iter()) {
            assert_eq!(movement.previous_quantity, running);
            running += delta;
            assert_eq!(movement.new_quantity, running);
            assert_eq!(movement.new_quantity, movement.previous_quantity + movement.quantity);
        }
    }

    #[tokio::test]
    async fn test_oversell_goes_negative_and_is_observable() {
        let db = testutil::test_db().await;
        let product = testutil::seed_product(&db, "MILK-500ML", 3000, 4500, 3, 5).await;
        let ledger = db.ledger();

        let movement = ledger
            .apply_movement(&product.id, MovementType::Sale, -10, "RCP-0002", None, "cashier-1")
            .await
            .unwrap();
        assert_eq!(movement.new_quantity, -7);

        let low = ledger.low_stock_products(&product.business_id).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].current_stock, -7);
        assert!(low[0].is_out_of_stock());
    }

    #[tokio::test]
    async fn test_low_stock_filters_and_orders() {
        let db = testutil::test_db().await;
        let healthy = testutil::seed_product(&db, "OK-ITEM", 100, 200, 50, 5).await;
        let low = testutil::seed_product(&db, "LOW-ITEM", 100, 200, 4, 5).await;
        let lower = testutil::seed_product(&db, "LOWER-ITEM", 100, 200, 1, 5).await;
        let ledger = db.ledger();

        let result = ledger.low_stock_products(&healthy.business_id).await.unwrap();
        let skus: Vec<_> = result.iter().map(|p| p.sku.as_str()).collect();
        assert_eq!(skus, vec!["LOWER-ITEM", "LOW-ITEM"]);
        assert!(result.iter().all(|p| p.id != healthy.id));
        assert_eq!(result[0].id, lower.id);
        assert_eq!(result[1].id, low.id);
    }

    #[tokio::test]
    async fn test_unknown_product_rejected() {
        let db = testutil::test_db().await;
        let ledger = db.ledger();

        let err = ledger
            .apply_movement("missing", MovementType::Adjustment, 5, "", None, "manager-1")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
