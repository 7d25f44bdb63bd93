//! # Sale Commit Engine
//!
//! The atomic unit of work that turns a validated cart into a persisted
//! sale plus all side effects — or nothing at all.
//!
//! ## Commit Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      commit_sale(cashier, draft)                        │
//! │                                                                         │
//! │  BEFORE ANY WRITE                                                      │
//! │  ├── 1. cashier assigned to a business?   → CashierUnassigned          │
//! │  ├── 2. draft.validate()                  → Validation                 │
//! │  │                                                                      │
//! │  │  ┌──────────────── ONE TRANSACTION ─────────────────┐               │
//! │  ├──│ 3. receipt free for this business? → DuplicateReceipt            │
//! │  ├──│ 4. resolve cashier's open shift (attribution)    │               │
//! │  ├──│ 5. freeze prices from products, derive totals    │               │
//! │  ├──│ 6. INSERT sale header + items                    │               │
//! │  ├──│ 7. one ledger movement per product line (CAS)    │               │
//! │  │  │      └── StockConflict? → WHOLE transaction      │               │
//! │  │  │          rolls back, no partial sale exists      │               │
//! │  │  └────────────────────── COMMIT ────────────────────┘               │
//! │  │                                                                      │
//! │  AFTER COMMIT (best-effort, cannot fail the sale)                      │
//! │  ├── 8. LowStock event per product at/below minimum                    │
//! │  └── 9. NewSale event for real-time subscribers                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Retry Contract
//! `StockConflict` rolls the whole commit back, so nothing is persisted
//! under the receipt number — but callers should retry with a FRESH receipt
//! number anyway: receipt numbers are business identifiers, and a verbatim
//! retry racing a concurrent duplicate is ambiguous. The engine promises
//! nothing about verbatim retries.
//!
//! ## Derived, Never Trusted
//! subtotal, total, change, payment status, item totals and item profit are
//! all recomputed here from the frozen prices. The draft's own figures for
//! these are ignored.

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::notify::EventNotifier;
use crate::repository::{ledger, product, sale, shift};
use duka_core::{
    Cashier, Money, MovementType, NotificationEvent, PaymentStatus, Product, Sale, SaleDraft,
    SaleItem, SaleStatus, SaleSummary, SyncStatus,
};

/// A persisted sale with its computed line items.
/// This is the shape the HTTP layer serializes back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct CommittedSale {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

/// Orchestrates cart validation, persistence, stock decrement, shift
/// attribution and event emission.
#[derive(Debug, Clone)]
pub struct SaleCommitEngine {
    pool: SqlitePool,
    notifier: EventNotifier,
}

impl SaleCommitEngine {
    /// Creates a new engine over the given pool and notifier.
    pub fn new(pool: SqlitePool, notifier: EventNotifier) -> Self {
        SaleCommitEngine { pool, notifier }
    }

    /// Commits a sale.
    ///
    /// See the module docs for the full sequence. On ANY error the caller
    /// observes either a complete sale or no trace of one — no partial
    /// header, no partial items, no partial stock decrement.
    pub async fn commit_sale(
        &self,
        cashier: &Cashier,
        draft: SaleDraft,
    ) -> DbResult<CommittedSale> {
        let business_id = cashier
            .business_id
            .clone()
            .ok_or_else(|| DbError::CashierUnassigned {
                cashier_id: cashier.id.clone(),
            })?;

        draft.validate()?;

        debug!(
            receipt_number = %draft.receipt_number,
            lines = draft.lines.len(),
            "Committing sale"
        );

        let mut tx = self.pool.begin().await?;

        if sale::receipt_exists_on(&mut tx, &business_id, &draft.receipt_number).await? {
            return Err(DbError::DuplicateReceipt {
                receipt_number: draft.receipt_number.clone(),
            });
        }

        // Attribute the sale to the cashier's open drawer, if any
        let shift_id = shift::active_shift_id_on(&mut tx, &cashier.id).await?;

        let sale_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        // Freeze prices and resolve product lines
        let mut items: Vec<SaleItem> = Vec::with_capacity(draft.lines.len());
        let mut decrements: Vec<(Product, i64)> = Vec::new();

        for line in &draft.lines {
            match &line.product_id {
                Some(product_id) => {
                    let product = product::get_by_id_on(&mut tx, product_id)
                        .await?
                        .filter(|p| p.business_id == business_id)
                        .ok_or_else(|| DbError::not_found("Product", product_id))?;

                    // An explicit unit price on the line wins (negotiated
                    // price); the cost price always comes from the product
                    let unit_price_cents = line
                        .unit_price_cents
                        .unwrap_or(product.selling_price_cents);

                    items.push(SaleItem::new(
                        Uuid::new_v4().to_string(),
                        sale_id.clone(),
                        Some(product.id.clone()),
                        product.name.clone(),
                        line.quantity,
                        unit_price_cents,
                        product.cost_price_cents,
                    ));
                    decrements.push((product, line.quantity));
                }
                None => {
                    // validate() already required name and unit price here
                    let name = line.name.clone().unwrap_or_default();
                    let unit_price_cents = line.unit_price_cents.unwrap_or(0);

                    items.push(SaleItem::new(
                        Uuid::new_v4().to_string(),
                        sale_id.clone(),
                        None,
                        name,
                        line.quantity,
                        unit_price_cents,
                        0,
                    ));
                }
            }
        }

        // Derived money figures
        let subtotal: i64 = items.iter().map(|i| i.total_price_cents).sum();
        let total = Money::from_cents(subtotal) + Money::from_cents(draft.tax_cents)
            - Money::from_cents(draft.discount_cents);
        let change = (Money::from_cents(draft.amount_paid_cents) - total).clamp_non_negative();

        let payment_status = if draft.amount_paid_cents >= total.cents() {
            PaymentStatus::Paid
        } else if draft.amount_paid_cents > 0 {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Pending
        };

        let sale = Sale {
            id: sale_id.clone(),
            business_id: business_id.clone(),
            transaction_id: Uuid::new_v4().to_string(),
            receipt_number: draft.receipt_number.clone(),
            customer_name: draft.customer_name.clone(),
            customer_phone: draft.customer_phone.clone(),
            subtotal_cents: subtotal,
            tax_cents: draft.tax_cents,
            discount_cents: draft.discount_cents,
            total_cents: total.cents(),
            amount_paid_cents: draft.amount_paid_cents,
            change_given_cents: change.cents(),
            status: SaleStatus::Completed,
            payment_status,
            payment_method: draft.payment_method,
            cashier_id: cashier.id.clone(),
            shift_id,
            is_offline_sale: draft.is_offline_sale,
            sync_status: SyncStatus::Synced,
            offline_id: draft.offline_id.clone(),
            created_at: now,
            updated_at: now,
            synced_at: draft.is_offline_sale.then_some(now),
        };

        sale::insert_sale_on(&mut tx, &sale).await?;
        for item in &items {
            sale::insert_item_on(&mut tx, item).await?;
        }

        // Stock decrements share the sale's transaction: if any movement
        // fails, the header, the items and every prior movement unwind
        let mut low_stock: Vec<(Product, i64)> = Vec::new();
        for (product, quantity) in &decrements {
            let movement = ledger::apply_movement_on(
                &mut tx,
                &product.id,
                MovementType::Sale,
                -*quantity,
                &draft.receipt_number,
                None,
                &cashier.id,
            )
            .await?;

            if movement.new_quantity <= product.minimum_stock {
                low_stock.push((product.clone(), movement.new_quantity));
            }
        }

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            receipt_number = %sale.receipt_number,
            total = %sale.total(),
            items = items.len(),
            shift_id = ?sale.shift_id,
            "Sale committed"
        );

        // Best-effort side effects, strictly after commit. The notifier
        // cannot fail, so a missing consumer never unwinds the sale.
        for (product, current_stock) in low_stock {
            self.notifier.notify(NotificationEvent::LowStock {
                business_id: business_id.clone(),
                product_id: product.id,
                product_name: product.name,
                current_stock,
                minimum_stock: product.minimum_stock,
            });
        }

        self.notifier.notify(NotificationEvent::NewSale {
            business_id,
            sale: SaleSummary {
                receipt_number: sale.receipt_number.clone(),
                total_cents: sale.total_cents,
                created_at: sale.created_at,
            },
        });

        Ok(CommittedSale { sale, items })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
