//! # Cashier Repository
//!
//! Narrow glue for the (out of scope) accounts module: create and look up
//! cashier rows.
//!
//! The `current_shift_*` mirror columns are NOT writable here. They are a
//! derived read-model of the authoritative `shifts` row, and only the shift
//! register mutates them — inside the same transaction as the shift row
//! itself, so the two can never disagree.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use duka_core::Cashier;

const CASHIER_COLUMNS: &str = "id, business_id, email, \
     current_shift_open, current_shift_start, current_shift_float_cents";

/// Repository for cashier rows.
#[derive(Debug, Clone)]
pub struct CashierRepository {
    pool: SqlitePool,
}

impl CashierRepository {
    /// Creates a new CashierRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CashierRepository { pool }
    }

    /// Inserts a cashier. The shift mirror always starts cleared.
    pub async fn insert(&self, cashier: &Cashier) -> DbResult<()> {
        debug!(id = %cashier.id, email = %cashier.email, "Inserting cashier");

        sqlx::query(
            r#"
            INSERT INTO cashiers (
                id, business_id, email,
                current_shift_open, current_shift_start, current_shift_float_cents
            ) VALUES (?1, ?2, ?3, 0, NULL, 0)
            "#,
        )
        .bind(&cashier.id)
        .bind(&cashier.business_id)
        .bind(&cashier.email)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a cashier by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Cashier>> {
        let cashier = sqlx::query_as::<_, Cashier>(&format!(
            "SELECT {CASHIER_COLUMNS} FROM cashiers WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(cashier)
    }
}

/// Sets the shift mirror when a shift opens. Shift-register use only.
pub(crate) async fn set_shift_mirror_on(
    conn: &mut SqliteConnection,
    cashier_id: &str,
    start: DateTime<Utc>,
    float_cents: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE cashiers
        SET current_shift_open = 1, current_shift_start = ?2, current_shift_float_cents = ?3
        WHERE id = ?1
        "#,
    )
    .bind(cashier_id)
    .bind(start)
    .bind(float_cents)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Cashier", cashier_id));
    }

    Ok(())
}

/// Clears the shift mirror when a shift closes. Shift-register use only.
pub(crate) async fn clear_shift_mirror_on(
    conn: &mut SqliteConnection,
    cashier_id: &str,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE cashiers
        SET current_shift_open = 0, current_shift_start = NULL, current_shift_float_cents = 0
        WHERE id = ?1
        "#,
    )
    .bind(cashier_id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Cashier", cashier_id));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = testutil::test_db().await;
        let repo = db.cashiers();

        let cashier = testutil::cashier(Some("biz-1"));
        repo.insert(&cashier).await.unwrap();

        let fetched = repo.get_by_id(&cashier.id).await.unwrap().unwrap();
        assert_eq!(fetched.email, cashier.email);
        assert!(!fetched.current_shift_open);
        assert_eq!(fetched.current_shift_float_cents, 0);

        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }
}
