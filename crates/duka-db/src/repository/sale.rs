//! # Sale Repository
//!
//! Database operations for sales and sale items.
//!
//! ## Write Path vs Read Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  WRITES: only through the commit engine's transaction                   │
//! │     SaleCommitEngine ──► insert_sale_on / insert_item_on (in-tx)       │
//! │                                                                         │
//! │  READS: anywhere                                                       │
//! │     get_by_id / get_by_receipt / get_items / list_for_business         │
//! │                                                                         │
//! │  Sales and their items are append-only: a committed sale is never      │
//! │  mutated. Refunds and reversals are NEW sales and NEW movements.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use duka_core::{Sale, SaleItem};

const SALE_COLUMNS: &str = "id, business_id, transaction_id, receipt_number, \
     customer_name, customer_phone, \
     subtotal_cents, tax_cents, discount_cents, total_cents, \
     amount_paid_cents, change_given_cents, \
     status, payment_status, payment_method, \
     cashier_id, shift_id, \
     is_offline_sale, sync_status, offline_id, \
     created_at, updated_at, synced_at";

const ITEM_COLUMNS: &str = "id, sale_id, product_id, product_name, quantity, \
     unit_price_cents, cost_price_cents, total_price_cents, profit_cents";

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale =
            sqlx::query_as::<_, Sale>(&format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(sale)
    }

    /// Gets a sale by its business-scoped receipt number.
    pub async fn get_by_receipt(
        &self,
        business_id: &str,
        receipt_number: &str,
    ) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE business_id = ?1 AND receipt_number = ?2"
        ))
        .bind(business_id)
        .bind(receipt_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets all items for a sale, in receipt order.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY rowid"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists a business's sales, newest first.
    pub async fn list_for_business(&self, business_id: &str, limit: u32) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE business_id = ?1 \
             ORDER BY created_at DESC, rowid DESC LIMIT ?2"
        ))
        .bind(business_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }
}

/// Checks whether a receipt number is already taken for a business.
/// Runs inside the commit transaction, before any write.
pub(crate) async fn receipt_exists_on(
    conn: &mut SqliteConnection,
    business_id: &str,
    receipt_number: &str,
) -> DbResult<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sales WHERE business_id = ?1 AND receipt_number = ?2",
    )
    .bind(business_id)
    .bind(receipt_number)
    .fetch_one(conn)
    .await?;

    Ok(count > 0)
}

/// Inserts the sale header inside the commit transaction.
pub(crate) async fn insert_sale_on(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, receipt_number = %sale.receipt_number, "Inserting sale");

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, business_id, transaction_id, receipt_number,
            customer_name, customer_phone,
            subtotal_cents, tax_cents, discount_cents, total_cents,
            amount_paid_cents, change_given_cents,
            status, payment_status, payment_method,
            cashier_id, shift_id,
            is_offline_sale, sync_status, offline_id,
            created_at, updated_at, synced_at
        ) VALUES (
            ?1, ?2, ?3, ?4,
            ?5, ?6,
            ?7, ?8, ?9, ?10,
            ?11, ?12,
            ?13, ?14, ?15,
            ?16, ?17,
            ?18, ?19, ?20,
            ?21, ?22, ?23
        )
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.business_id)
    .bind(&sale.transaction_id)
    .bind(&sale.receipt_number)
    .bind(&sale.customer_name)
    .bind(&sale.customer_phone)
    .bind(sale.subtotal_cents)
    .bind(sale.tax_cents)
    .bind(sale.discount_cents)
    .bind(sale.total_cents)
    .bind(sale.amount_paid_cents)
    .bind(sale.change_given_cents)
    .bind(sale.status)
    .bind(sale.payment_status)
    .bind(sale.payment_method)
    .bind(&sale.cashier_id)
    .bind(&sale.shift_id)
    .bind(sale.is_offline_sale)
    .bind(sale.sync_status)
    .bind(&sale.offline_id)
    .bind(sale.created_at)
    .bind(sale.updated_at)
    .bind(sale.synced_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Inserts one line item inside the commit transaction.
///
/// ## Snapshot Pattern
/// Product details (name, unit price, cost price) were copied onto the item
/// by the engine. This preserves the sale history even if product details
/// change later.
pub(crate) async fn insert_item_on(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_items (
            id, sale_id, product_id, product_name, quantity,
            unit_price_cents, cost_price_cents, total_price_cents, profit_cents
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(&item.product_id)
    .bind(&item.product_name)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .bind(item.cost_price_cents)
    .bind(item.total_price_cents)
    .bind(item.profit_cents)
    .execute(conn)
    .await?;

    Ok(())
}

/// Sums cash-tendered takings attributed to a shift.
/// Used by the shift register when deriving expected cash at close.
pub(crate) async fn cash_total_for_shift_on(
    conn: &mut SqliteConnection,
    shift_id: &str,
) -> DbResult<i64> {
    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(amount_paid_cents), 0)
        FROM sales
        WHERE shift_id = ?1 AND payment_method = 'cash'
        "#,
    )
    .bind(shift_id)
    .fetch_one(conn)
    .await?;

    Ok(total)
}
