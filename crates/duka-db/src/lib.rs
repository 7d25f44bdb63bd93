//! # duka-db: Database Layer for Duka POS
//!
//! This crate provides persistence and the sale commit transaction for the
//! Duka POS backend. It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Duka POS Data Flow                               │
//! │                                                                         │
//! │  HTTP layer (POST /sales/, /shifts/open/, ...)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     duka-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌──────────────┐   │   │
//! │  │   │   Database    │   │  Repositories  │   │    Engine    │   │   │
//! │  │   │   (pool.rs)   │   │  product/sale  │   │ (engine.rs)  │   │   │
//! │  │   │               │◄──│  ledger/shift  │◄──│ commit_sale  │   │   │
//! │  │   │ SqlitePool    │   │  cashier       │   │ one txn      │   │   │
//! │  │   └───────────────┘   └────────────────┘   └──────┬───────┘   │   │
//! │  │                                                    │           │   │
//! │  │   ┌──────────────┐     ┌──────────────┐           │           │   │
//! │  │   │  Migrations  │     │   Notifier   │◄──────────┘           │   │
//! │  │   │  (embedded)  │     │  (notify.rs) │  post-commit events   │   │
//! │  │   └──────────────┘     └──────────────┘                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (WAL mode, foreign keys on)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and conflict error types
//! - [`repository`] - Repository implementations
//! - [`engine`] - The sale commit engine
//! - [`notify`] - Fire-and-forget event dispatch
//!
//! ## Usage
//!
//! ```rust,ignore
//! use duka_db::{Database, DbConfig, EventNotifier};
//!
//! let (notifier, events) = EventNotifier::channel();
//! let db = Database::new(DbConfig::new("./duka.db")).await?.with_notifier(notifier);
//!
//! // Commit a sale
//! let committed = db.sale_engine().commit_sale(&cashier, draft).await?;
//!
//! // Drain events in a background task
//! tokio::spawn(async move {
//!     let mut events = events;
//!     while let Some(event) = events.recv().await {
//!         // hand to push fan-out / websocket bridge
//!     }
//! });
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod engine;
pub mod error;
pub mod migrations;
pub mod notify;
pub mod pool;
pub mod repository;

#[cfg(test)]
pub(crate) mod testutil;

// =============================================================================
// Re-exports
// =============================================================================

pub use engine::{CommittedSale, SaleCommitEngine};
pub use error::{DbError, DbResult};
pub use notify::EventNotifier;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::cashier::CashierRepository;
pub use repository::ledger::LedgerRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
pub use repository::shift::ShiftRepository;
