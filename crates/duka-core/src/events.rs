//! # Notification Events
//!
//! The closed set of events the core emits toward the notification
//! collaborators (push fan-out, live dashboards). Each variant carries typed
//! fields — there are no free-form JSON maps at this boundary.
//!
//! ## Delivery Contract
//! Events are fire-and-forget: emission happens strictly AFTER the commit
//! transaction, may be dropped if no consumer is attached, and can never
//! fail or block the operation that produced them. Transports (FCM, web
//! sockets) live outside this workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Compact sale payload for real-time subscribers.
///
/// Mirrors what a live dashboard needs to render a ticker row; the full
/// sale is fetched separately if the subscriber wants details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleSummary {
    pub receipt_number: String,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// Everything the engine and shift register can announce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// A sale decremented a product to or below its minimum stock.
    LowStock {
        business_id: String,
        product_id: String,
        product_name: String,
        current_stock: i64,
        minimum_stock: i64,
    },

    /// A sale committed; pushed to the per-business real-time topic.
    NewSale {
        business_id: String,
        sale: SaleSummary,
    },

    /// A cashier opened a cash-drawer session.
    ShiftOpened {
        business_id: String,
        shift_id: String,
        shift_number: String,
        cashier_id: String,
        starting_cash_cents: i64,
    },

    /// A cashier closed a cash-drawer session.
    ShiftClosed {
        business_id: String,
        shift_id: String,
        shift_number: String,
        cashier_id: String,
        expected_cash_cents: i64,
        actual_cash_cents: i64,
        difference_cents: i64,
    },
}

impl NotificationEvent {
    /// The business topic this event belongs to.
    pub fn business_id(&self) -> &str {
        match self {
            NotificationEvent::LowStock { business_id, .. }
            | NotificationEvent::NewSale { business_id, .. }
            | NotificationEvent::ShiftOpened { business_id, .. }
            | NotificationEvent::ShiftClosed { business_id, .. } => business_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_tag() {
        let event = NotificationEvent::LowStock {
            business_id: "biz-1".to_string(),
            product_id: "prod-1".to_string(),
            product_name: "Maize Flour 2kg".to_string(),
            current_stock: 3,
            minimum_stock: 5,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "low_stock");
        assert_eq!(json["current_stock"], 3);
    }

    #[test]
    fn test_new_sale_payload_shape() {
        let event = NotificationEvent::NewSale {
            business_id: "biz-1".to_string(),
            sale: SaleSummary {
                receipt_number: "RCP-0001".to_string(),
                total_cents: 16000,
                created_at: Utc::now(),
            },
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "new_sale");
        assert_eq!(json["sale"]["receipt_number"], "RCP-0001");
        assert_eq!(event.business_id(), "biz-1");
    }
}
