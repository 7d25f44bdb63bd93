//! Shared fixtures for duka-db tests: in-memory databases and seeded rows.

use chrono::Utc;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use crate::notify::EventNotifier;
use crate::pool::{Database, DbConfig};
use crate::repository::product::generate_product_id;
use duka_core::{Cashier, NotificationEvent, Product, ProductStatus};

pub(crate) const BUSINESS_ID: &str = "biz-1";

/// Routes tracing output through the test harness when RUST_LOG is set.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Fresh in-memory database with migrations applied, events dropped.
pub(crate) async fn test_db() -> Database {
    init_tracing();
    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database")
}

/// Fresh in-memory database plus the receiving end of its event channel.
pub(crate) async fn test_db_with_events() -> (Database, UnboundedReceiver<NotificationEvent>) {
    let (notifier, rx) = EventNotifier::channel();
    let db = test_db().await.with_notifier(notifier);
    (db, rx)
}

/// A product under [`BUSINESS_ID`] with the given prices and stock levels.
pub(crate) fn product(
    sku: &str,
    cost_price_cents: i64,
    selling_price_cents: i64,
    current_stock: i64,
    minimum_stock: i64,
) -> Product {
    let now = Utc::now();
    Product {
        id: generate_product_id(),
        business_id: BUSINESS_ID.to_string(),
        sku: sku.to_string(),
        name: format!("Test {sku}"),
        description: None,
        category_id: None,
        barcode: None,
        cost_price_cents,
        selling_price_cents,
        profit_margin_cents: selling_price_cents - cost_price_cents,
        current_stock,
        minimum_stock,
        maximum_stock: 1000,
        status: ProductStatus::Active,
        created_at: now,
        updated_at: now,
    }
}

pub(crate) async fn seed_product(
    db: &Database,
    sku: &str,
    cost_price_cents: i64,
    selling_price_cents: i64,
    current_stock: i64,
    minimum_stock: i64,
) -> Product {
    db.products()
        .insert(&product(
            sku,
            cost_price_cents,
            selling_price_cents,
            current_stock,
            minimum_stock,
        ))
        .await
        .expect("seed product")
}

/// A cashier with a unique email, optionally assigned to a business.
pub(crate) fn cashier(business_id: Option<&str>) -> Cashier {
    let id = Uuid::new_v4().to_string();
    Cashier {
        email: format!("cashier-{id}@duka.test"),
        id,
        business_id: business_id.map(|b| b.to_string()),
        current_shift_open: false,
        current_shift_start: None,
        current_shift_float_cents: 0,
    }
}

pub(crate) async fn seed_cashier(db: &Database, business_id: Option<&str>) -> Cashier {
    let cashier = cashier(business_id);
    db.cashiers().insert(&cashier).await.expect("seed cashier");
    cashier
}
