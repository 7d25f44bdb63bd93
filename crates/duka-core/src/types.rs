//! # Domain Types
//!
//! Core domain types used throughout Duka POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │     Shift       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  sku (business) │   │  receipt_number │   │  shift_number   │       │
//! │  │  current_stock  │   │  total_amount   │   │  expected_cash  │       │
//! │  └────────┬────────┘   └────────┬────────┘   └─────────────────┘       │
//! │           │                     │                                       │
//! │  ┌────────▼────────┐   ┌────────▼────────┐                             │
//! │  │  StockMovement  │   │    SaleItem     │                             │
//! │  │  (append-only)  │   │  (snapshots)    │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (sku, receipt_number, shift_number) - human-readable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// Lifecycle status of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    /// Available for sale.
    Active,
    /// No longer sold; kept for sale history.
    Discontinued,
    /// Flagged out of stock by the catalog.
    OutOfStock,
}

impl Default for ProductStatus {
    fn default() -> Self {
        ProductStatus::Active
    }
}

/// A product available for sale.
///
/// Stock is mutated only through the inventory ledger's movement operation;
/// everything else treats `current_stock` as read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business this product belongs to.
    pub business_id: String,

    /// Stock Keeping Unit - business identifier, unique.
    pub sku: String,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    /// Optional description for product details.
    pub description: Option<String>,

    /// Category reference (owned by the catalog, not resolved here).
    pub category_id: Option<String>,

    /// Barcode (EAN-13, UPC-A, etc.).
    pub barcode: Option<String>,

    /// Buying price in cents.
    pub cost_price_cents: i64,

    /// Selling price in cents.
    pub selling_price_cents: i64,

    /// Selling minus cost, in cents. Recomputed on every price change by the
    /// product repository; never accepted from a caller.
    pub profit_margin_cents: i64,

    /// Current stock level. May be negative after an oversell.
    pub current_stock: i64,

    /// Low stock threshold.
    pub minimum_stock: i64,

    /// Max capacity.
    pub maximum_stock: i64,

    /// Lifecycle status.
    pub status: ProductStatus,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the selling price as a Money type.
    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_cents(self.selling_price_cents)
    }

    /// Returns the cost price as a Money type.
    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }

    /// Selling minus cost. This is the authoritative formula; the stored
    /// `profit_margin_cents` column is kept in step by the repository.
    #[inline]
    pub fn computed_profit_margin_cents(&self) -> i64 {
        self.selling_price_cents - self.cost_price_cents
    }

    /// Checks if stock is at or below the configured minimum.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.minimum_stock
    }

    /// Checks if stock is exhausted (zero or oversold).
    #[inline]
    pub fn is_out_of_stock(&self) -> bool {
        self.current_stock <= 0
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

/// Why stock changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// Incoming stock from a supplier purchase.
    Purchase,
    /// Outgoing stock sold at the till.
    Sale,
    /// Manual correction after a stock take.
    Adjustment,
    /// Customer return back into stock.
    Return,
    /// Written off as damaged.
    Damage,
}

/// An immutable audit entry for any change to a product's stock quantity.
///
/// ## Append-Only
/// Movement rows are created exactly once per inventory-affecting event and
/// never updated or deleted. Reversals are NEW movements (`Return`/`Damage`),
/// not mutations of old ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub movement_type: MovementType,
    /// Signed delta. Positive for incoming, negative for outgoing.
    pub quantity: i64,
    /// Stock before the movement was applied.
    pub previous_quantity: i64,
    /// Stock after the movement was applied. Always `previous + quantity`.
    pub new_quantity: i64,
    /// Receipt number, purchase order, or other business reference.
    pub reference: String,
    pub notes: Option<String>,
    /// Who applied the movement (cashier or manager id).
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale
// =============================================================================

/// The status of a sale transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Sale has been paid and finalized.
    Completed,
    /// Awaiting settlement.
    Pending,
    /// Reversed by a later refund sale.
    Refunded,
    /// Abandoned before settlement.
    Cancelled,
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Completed
    }
}

/// How much of the sale has been settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Partial,
    Pending,
    Failed,
}

/// How the customer tendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash. The only method that affects shift reconciliation.
    Cash,
    /// M-Pesa and friends.
    MobileMoney,
    /// Card payment on external terminal.
    Card,
    /// Direct bank transfer.
    BankTransfer,
}

/// Offline-sync state of a sale created in the PWA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Synced,
    Pending,
    Failed,
}

impl Default for SyncStatus {
    fn default() -> Self {
        SyncStatus::Synced
    }
}

/// A completed or pending point-of-sale transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    pub business_id: String,
    /// Globally unique machine identifier, generated at commit.
    pub transaction_id: String,
    /// Human receipt number, unique per business, supplied by the caller.
    pub receipt_number: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub amount_paid_cents: i64,
    pub change_given_cents: i64,
    pub status: SaleStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub cashier_id: String,
    /// The shift the sale was rung up under, when the cashier had one open.
    pub shift_id: Option<String>,
    pub is_offline_sale: bool,
    pub sync_status: SyncStatus,
    pub offline_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub synced_at: Option<DateTime<Utc>>,
}

impl Sale {
    /// Returns the grand total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Whether the paid amount covers the total.
    #[inline]
    pub fn is_fully_paid(&self) -> bool {
        self.amount_paid_cents >= self.total_cents
    }

    /// Outstanding balance, floored at zero.
    #[inline]
    pub fn balance_due_cents(&self) -> i64 {
        (Money::from_cents(self.total_cents) - Money::from_cents(self.amount_paid_cents))
            .clamp_non_negative()
            .cents()
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
///
/// Uses the snapshot pattern to freeze product data at time of sale: name,
/// unit price and cost price are copied in, so later catalog edits never
/// rewrite history. `total_price_cents` and `profit_cents` are ALWAYS derived
/// from quantity/unit price/cost price — construct through [`SaleItem::new`]
/// and they can never drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    /// Product reference, absent for free-text lines.
    pub product_id: Option<String>,
    /// Product name at time of sale (frozen).
    pub product_name: String,
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// Cost price in cents at time of sale (frozen; 0 for free-text lines).
    pub cost_price_cents: i64,
    /// quantity × unit_price. Derived, never caller-supplied.
    pub total_price_cents: i64,
    /// (unit_price − cost_price) × quantity. Derived, never caller-supplied.
    pub profit_cents: i64,
}

impl SaleItem {
    /// Builds a line item, deriving total and profit from the inputs.
    pub fn new(
        id: String,
        sale_id: String,
        product_id: Option<String>,
        product_name: String,
        quantity: i64,
        unit_price_cents: i64,
        cost_price_cents: i64,
    ) -> Self {
        let unit_price = Money::from_cents(unit_price_cents);
        let cost_price = Money::from_cents(cost_price_cents);
        let total_price = unit_price.multiply_quantity(quantity);
        let profit = (unit_price - cost_price).multiply_quantity(quantity);

        SaleItem {
            id,
            sale_id,
            product_id,
            product_name,
            quantity,
            unit_price_cents,
            cost_price_cents,
            total_price_cents: total_price.cents(),
            profit_cents: profit.cents(),
        }
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }
}

// =============================================================================
// Shift
// =============================================================================

/// A cashier's time-bounded cash-drawer session.
///
/// ## Lifecycle
/// ```text
/// open() ──► is_active = true ──► close() ──► is_active = false (terminal)
/// ```
/// A closed shift never reopens; only the reconciliation stamp may be set,
/// at most once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Shift {
    pub id: String,
    pub business_id: String,
    pub cashier_id: String,
    /// Time-derived identifier, unique per cashier.
    pub shift_number: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_active: bool,
    /// Opening float in the drawer.
    pub starting_cash_cents: i64,
    /// starting_cash + Σ cash-tendered sales. Derived at close, never
    /// supplied by a caller.
    pub expected_cash_cents: i64,
    /// Counted drawer contents, entered at close.
    pub actual_cash_cents: i64,
    /// actual − expected. Negative means the drawer came up short.
    pub difference_cents: i64,
    pub reconciled_by: Option<String>,
    pub reconciled_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Shift {
    /// Whether the drawer balanced exactly at close.
    #[inline]
    pub fn is_balanced(&self) -> bool {
        !self.is_active && self.difference_cents == 0
    }
}

// =============================================================================
// Cashier
// =============================================================================

/// A cashier account, as the core sees it.
///
/// The `current_shift_*` fields are a denormalized mirror of the cashier's
/// open Shift row for fast UI reads. The shift register writes them in the
/// same transaction as the authoritative Shift row; nothing else may set
/// them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Cashier {
    pub id: String,
    /// Business the cashier works for. An unassigned cashier cannot sell.
    pub business_id: Option<String>,
    pub email: String,
    pub current_shift_open: bool,
    pub current_shift_start: Option<DateTime<Utc>>,
    pub current_shift_float_cents: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sale_item_derives_total_and_profit() {
        let item = SaleItem::new(
            "item-1".to_string(),
            "sale-1".to_string(),
            Some("prod-1".to_string()),
            "Maize Flour 2kg".to_string(),
            2,
            8000, // unit KES 80.00
            5000, // cost KES 50.00
        );

        assert_eq!(item.total_price_cents, 16000);
        assert_eq!(item.profit_cents, 6000);
        assert_eq!(item.total_price().cents(), 16000);
    }

    #[test]
    fn test_sale_item_identities_hold_for_any_inputs() {
        for (qty, unit, cost) in [(1, 0, 0), (3, 12345, 6789), (7, 99, 100), (999, 1, 0)] {
            let item = SaleItem::new(
                "i".to_string(),
                "s".to_string(),
                None,
                "x".to_string(),
                qty,
                unit,
                cost,
            );
            assert_eq!(item.total_price_cents, qty * unit);
            assert_eq!(item.profit_cents, (unit - cost) * qty);
        }
    }

    #[test]
    fn test_sale_balance_helpers() {
        let mut sale = sample_sale();
        sale.total_cents = 16000;
        sale.amount_paid_cents = 16000;
        assert!(sale.is_fully_paid());
        assert_eq!(sale.balance_due_cents(), 0);

        sale.amount_paid_cents = 10000;
        assert!(!sale.is_fully_paid());
        assert_eq!(sale.balance_due_cents(), 6000);

        // Overpayment never produces a negative balance
        sale.amount_paid_cents = 20000;
        assert_eq!(sale.balance_due_cents(), 0);
    }

    #[test]
    fn test_product_stock_flags() {
        let mut product = sample_product();
        product.current_stock = 10;
        product.minimum_stock = 10;
        assert!(product.is_low_stock());
        assert!(!product.is_out_of_stock());

        product.current_stock = -2;
        assert!(product.is_out_of_stock());
    }

    #[test]
    fn test_profit_margin_formula() {
        let mut product = sample_product();
        product.cost_price_cents = 5000;
        product.selling_price_cents = 8000;
        assert_eq!(product.computed_profit_margin_cents(), 3000);
        assert_eq!(
            (product.selling_price() - product.cost_price()).cents(),
            3000
        );
    }

    fn sample_product() -> Product {
        Product {
            id: "prod-1".to_string(),
            business_id: "biz-1".to_string(),
            sku: "FLOUR-2KG".to_string(),
            name: "Maize Flour 2kg".to_string(),
            description: None,
            category_id: None,
            barcode: None,
            cost_price_cents: 5000,
            selling_price_cents: 8000,
            profit_margin_cents: 3000,
            current_stock: 10,
            minimum_stock: 5,
            maximum_stock: 1000,
            status: ProductStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sample_sale() -> Sale {
        Sale {
            id: "sale-1".to_string(),
            business_id: "biz-1".to_string(),
            transaction_id: "txn-1".to_string(),
            receipt_number: "RCP-0001".to_string(),
            customer_name: None,
            customer_phone: None,
            subtotal_cents: 16000,
            tax_cents: 0,
            discount_cents: 0,
            total_cents: 16000,
            amount_paid_cents: 16000,
            change_given_cents: 0,
            status: SaleStatus::Completed,
            payment_status: PaymentStatus::Paid,
            payment_method: PaymentMethod::Cash,
            cashier_id: "cashier-1".to_string(),
            shift_id: None,
            is_offline_sale: false,
            sync_status: SyncStatus::Synced,
            offline_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            synced_at: None,
        }
    }
}
