//! # Database Error Types
//!
//! Error types for database operations and the sale commit engine.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  HTTP layer (outside this workspace) maps to status codes:             │
//! │    Validation / DuplicateReceipt / Shift*  → 400                       │
//! │    StockConflict (retryable)               → 409                       │
//! │    everything else                         → 5xx                       │
//! │                                                                         │
//! │  Inside the commit boundary, ANY error forces full rollback:           │
//! │  the caller observes either a complete sale or nothing at all.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use duka_core::error::{CoreError, ValidationError};

/// Database and commit-engine errors.
///
/// These errors wrap sqlx errors and carry the conflict taxonomy the
/// engine's callers dispatch on.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting duplicate SKU or barcode
    /// - Any UNIQUE index violation not mapped to a richer variant
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// The receipt number is already taken for this business.
    /// Rejected before any write; the caller must pick a new number.
    #[error("Receipt number '{receipt_number}' already exists for this business")]
    DuplicateReceipt { receipt_number: String },

    /// The cashier already has an open shift.
    #[error("Cashier {cashier_id} already has an open shift")]
    ShiftAlreadyOpen { cashier_id: String },

    /// The shift is not open (already closed, or never existed as open).
    #[error("Shift {shift_id} is not open")]
    ShiftNotOpen { shift_id: String },

    /// The cashier is not assigned to a business and cannot sell.
    #[error("Cashier {cashier_id} is not assigned to a business")]
    CashierUnassigned { cashier_id: String },

    /// A concurrent writer changed a product's stock between our read and
    /// our conditional write. The whole transaction was rolled back; the
    /// commit is safe to retry with a fresh receipt number.
    #[error("Concurrent stock update on product {product_id}, retry the commit")]
    StockConflict { product_id: String },

    /// Input rejected before any write (bad cart shape, bad amounts).
    #[error(transparent)]
    Validation(#[from] CoreError),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Whether retrying the whole operation can succeed.
    ///
    /// Only concurrency conflicts are retryable; state conflicts
    /// (duplicate receipt, shift already open) need corrected input first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::StockConflict { .. })
    }
}

/// Lets field validators bubble straight into DbError via `?`.
impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Validation(CoreError::from(err))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite error messages for constraints:
                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>"
                // FK constraint: "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
