//! # Sale Draft (Cart) Types
//!
//! The wire-shaped cart a client submits to the sale commit engine, plus the
//! pure validation that runs before any write.
//!
//! ## Draft Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Sale Draft Lifecycle                               │
//! │                                                                         │
//! │  POST /sales/ payload                                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SaleDraft::validate()  ← THIS MODULE (pure, no I/O)                   │
//! │       │                                                                 │
//! │       ├── bad shape? → ValidationError, nothing written                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SaleCommitEngine::commit_sale()  (duka-db)                            │
//! │       └── freezes prices, derives totals, decrements stock             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Price Freezing
//! A line that references a product does NOT need a unit price — the engine
//! freezes the product's selling price at commit time. A free-text line
//! (no product reference) must carry both a name and a unit price.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::PaymentMethod;
use crate::validation::{
    validate_amount_cents, validate_price_cents, validate_product_name, validate_quantity,
    validate_receipt_number,
};
use crate::MAX_CART_LINES;

/// One line of a submitted cart.
///
/// ## Variants by shape
/// - Product line: `product_id` set, `name`/`unit_price_cents` optional
///   (the engine snapshots them from the product; an explicit unit price
///   overrides the catalog price, e.g. for a negotiated discount).
/// - Free-text line: `product_id` empty; `name` and `unit_price_cents`
///   required. No stock movement is recorded for these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    /// Product reference; empty for free-text lines.
    pub product_id: Option<String>,

    /// Display name; required when there is no product reference.
    pub name: Option<String>,

    /// Units sold. Must be positive.
    pub quantity: i64,

    /// Unit price override in cents; required for free-text lines.
    pub unit_price_cents: Option<i64>,
}

impl CartLine {
    /// Builds a line referencing a catalog product at its current price.
    pub fn for_product(product_id: impl Into<String>, quantity: i64) -> Self {
        CartLine {
            product_id: Some(product_id.into()),
            name: None,
            quantity,
            unit_price_cents: None,
        }
    }

    /// Builds a free-text line (no product, no stock movement).
    pub fn free_text(name: impl Into<String>, quantity: i64, unit_price_cents: i64) -> Self {
        CartLine {
            product_id: None,
            name: Some(name.into()),
            quantity,
            unit_price_cents: Some(unit_price_cents),
        }
    }

    /// Validates one line in isolation.
    fn validate(&self) -> CoreResult<()> {
        validate_quantity(self.quantity)?;

        if let Some(price) = self.unit_price_cents {
            validate_price_cents(price)?;
        }

        if self.product_id.is_none() {
            // Free-text lines must be self-describing
            let name = self.name.as_deref().unwrap_or("");
            validate_product_name(name)?;

            if self.unit_price_cents.is_none() {
                return Err(crate::error::ValidationError::Required {
                    field: "unit_price".to_string(),
                }
                .into());
            }
        }

        Ok(())
    }
}

/// A complete cart submission, as accepted by the sale commit engine.
///
/// Totals here are INPUTS the engine re-derives or cross-checks: the
/// subtotal is always recomputed from the frozen line prices, the change is
/// always recomputed from amount paid vs total. Tax and discount amounts are
/// taken as given (the terminal computes them against its configured rates).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleDraft {
    /// Caller-supplied human receipt number, unique per business.
    pub receipt_number: String,

    /// Optional walk-in customer details.
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,

    /// The cart lines, in receipt order.
    pub lines: Vec<CartLine>,

    /// Tax applied to the whole sale, in cents.
    pub tax_cents: i64,

    /// Discount applied to the whole sale, in cents.
    pub discount_cents: i64,

    /// What the customer handed over, in cents.
    pub amount_paid_cents: i64,

    /// How the customer tendered.
    pub payment_method: PaymentMethod,

    /// Offline-sync metadata (set by the PWA sync layer).
    pub is_offline_sale: bool,
    pub offline_id: Option<String>,
}

impl SaleDraft {
    /// A minimal cash draft, mainly for tests and simple terminals.
    pub fn cash(receipt_number: impl Into<String>, lines: Vec<CartLine>) -> Self {
        SaleDraft {
            receipt_number: receipt_number.into(),
            customer_name: None,
            customer_phone: None,
            lines,
            tax_cents: 0,
            discount_cents: 0,
            amount_paid_cents: 0,
            payment_method: PaymentMethod::Cash,
            is_offline_sale: false,
            offline_id: None,
        }
    }

    /// Validates the whole draft. Pure; runs before any write.
    pub fn validate(&self) -> CoreResult<()> {
        validate_receipt_number(&self.receipt_number)?;

        if self.lines.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        if self.lines.len() > MAX_CART_LINES {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_LINES,
            });
        }

        for line in &self.lines {
            line.validate()?;
        }

        validate_amount_cents("tax_amount", self.tax_cents)?;
        validate_amount_cents("discount_amount", self.discount_cents)?;
        validate_amount_cents("amount_paid", self.amount_paid_cents)?;

        Ok(())
    }

    /// Total units across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_product_draft() {
        let draft = SaleDraft::cash("RCP-0001", vec![CartLine::for_product("prod-1", 2)]);
        assert!(draft.validate().is_ok());
        assert_eq!(draft.total_quantity(), 2);
    }

    #[test]
    fn test_valid_free_text_draft() {
        let draft = SaleDraft::cash("RCP-0002", vec![CartLine::free_text("Delivery fee", 1, 5000)]);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_empty_cart_rejected() {
        let draft = SaleDraft::cash("RCP-0003", vec![]);
        assert!(matches!(draft.validate(), Err(CoreError::EmptyCart)));
    }

    #[test]
    fn test_missing_receipt_rejected() {
        let draft = SaleDraft::cash("  ", vec![CartLine::for_product("prod-1", 1)]);
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let draft = SaleDraft::cash("RCP-0004", vec![CartLine::for_product("prod-1", 0)]);
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_free_text_without_price_rejected() {
        let line = CartLine {
            product_id: None,
            name: Some("Delivery fee".to_string()),
            quantity: 1,
            unit_price_cents: None,
        };
        let draft = SaleDraft::cash("RCP-0005", vec![line]);
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_free_text_without_name_rejected() {
        let line = CartLine {
            product_id: None,
            name: None,
            quantity: 1,
            unit_price_cents: Some(5000),
        };
        let draft = SaleDraft::cash("RCP-0006", vec![line]);
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_negative_tax_rejected() {
        let mut draft = SaleDraft::cash("RCP-0007", vec![CartLine::for_product("prod-1", 1)]);
        draft.tax_cents = -1;
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_cart_too_large_rejected() {
        let lines = (0..=crate::MAX_CART_LINES)
            .map(|i| CartLine::for_product(format!("prod-{i}"), 1))
            .collect();
        let draft = SaleDraft::cash("RCP-0008", lines);
        assert!(matches!(
            draft.validate(),
            Err(CoreError::CartTooLarge { .. })
        ));
    }
}
