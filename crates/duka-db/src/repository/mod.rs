//! # Repository Module
//!
//! Database repository implementations for Duka POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  Caller (engine, HTTP layer, tests)                                    │
//! │       │                                                                 │
//! │       │  db.ledger().low_stock_products("biz-1")                       │
//! │       ▼                                                                 │
//! │  LedgerRepository                                                      │
//! │  ├── apply_movement(...)                                               │
//! │  ├── low_stock_products(...)                                           │
//! │  └── movements_for_product(...)                                        │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Multi-entity transactions (the sale commit, shift open/close) call    │
//! │  the repositories' `*_on(conn)` helpers against ONE open transaction   │
//! │  so everything commits or rolls back together.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog glue (insert/update/get)
//! - [`ledger::LedgerRepository`] - Stock movements and low-stock reads
//! - [`sale::SaleRepository`] - Sale reads; writes go through the engine
//! - [`shift::ShiftRepository`] - Shift open/close state machine
//! - [`cashier::CashierRepository`] - Accounts glue

pub mod cashier;
pub mod ledger;
pub mod product;
pub mod sale;
pub mod shift;
