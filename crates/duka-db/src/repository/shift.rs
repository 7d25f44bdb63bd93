//! # Shift Register
//!
//! Enforces the cash-drawer state machine per cashier and computes
//! reconciliation at close.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Shift Lifecycle                                   │
//! │                                                                         │
//! │            open(cashier, starting_cash)                                │
//! │  (no shift) ───────────────────────────► Open (is_active = 1)          │
//! │       ▲                                    │                            │
//! │       │   another open() while Open        │ close(actual_cash)         │
//! │       │   → ShiftAlreadyOpen               ▼                            │
//! │       │                                  Closed (terminal)              │
//! │       │                                    │                            │
//! │       └── a NEW shift may be opened        │ close() again              │
//! │           once the old one is Closed       → ShiftNotOpen               │
//! │                                                                         │
//! │  "At most one Open shift per cashier" is a PARTIAL UNIQUE INDEX,       │
//! │  not an application check: two racing opens cannot both win.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The Cashier Mirror
//! The cashier row carries `current_shift_open/start/float` for fast UI
//! reads. Both open() and close() write the mirror in the SAME transaction
//! as the shift row. It is a cache of the shift table, never a second
//! source of truth.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::notify::EventNotifier;
use crate::repository::{cashier, sale};
use duka_core::validation::validate_amount_cents;
use duka_core::{Cashier, Money, NotificationEvent, Shift, ValidationError};

const SHIFT_COLUMNS: &str = "id, business_id, cashier_id, shift_number, \
     start_time, end_time, is_active, \
     starting_cash_cents, expected_cash_cents, actual_cash_cents, difference_cents, \
     reconciled_by, reconciled_at, notes, created_at";

/// How many shift-number candidates to try before giving up.
/// Collisions need two shifts for one cashier within the same second, so
/// the second candidate already carries the suffix that breaks the tie.
const SHIFT_NUMBER_ATTEMPTS: u32 = 5;

/// Repository enforcing the shift state machine.
#[derive(Debug, Clone)]
pub struct ShiftRepository {
    pool: SqlitePool,
    notifier: EventNotifier,
}

impl ShiftRepository {
    /// Creates a new ShiftRepository.
    pub fn new(pool: SqlitePool, notifier: EventNotifier) -> Self {
        ShiftRepository { pool, notifier }
    }

    /// Opens a shift for a cashier.
    ///
    /// ## Errors
    /// * `DbError::CashierUnassigned` - cashier has no business
    /// * `DbError::ShiftAlreadyOpen` - an Open shift already exists
    ///
    /// The shift number is derived from the start timestamp
    /// (`SHIFT-YYYYMMDD-HHMMSS`); a same-second collision for the same
    /// cashier retries with a monotonic `-N` suffix instead of failing.
    pub async fn open(&self, cashier: &Cashier, starting_cash_cents: i64) -> DbResult<Shift> {
        let business_id = cashier
            .business_id
            .clone()
            .ok_or_else(|| DbError::CashierUnassigned {
                cashier_id: cashier.id.clone(),
            })?;

        validate_amount_cents("starting_cash", starting_cash_cents)?;

        let now = Utc::now();
        let base_number = format!("SHIFT-{}", now.format("%Y%m%d-%H%M%S"));

        let mut tx = self.pool.begin().await?;

        // Fast-path check; the partial unique index below is the backstop
        // against a concurrent open racing this read.
        if active_shift_id_on(&mut tx, &cashier.id).await?.is_some() {
            return Err(DbError::ShiftAlreadyOpen {
                cashier_id: cashier.id.clone(),
            });
        }

        let shift = Shift {
            id: Uuid::new_v4().to_string(),
            business_id: business_id.clone(),
            cashier_id: cashier.id.clone(),
            shift_number: base_number.clone(),
            start_time: now,
            end_time: None,
            is_active: true,
            starting_cash_cents,
            expected_cash_cents: 0,
            actual_cash_cents: 0,
            difference_cents: 0,
            reconciled_by: None,
            reconciled_at: None,
            notes: None,
            created_at: now,
        };

        let mut attempt: u32 = 1;
        loop {
            let candidate = if attempt == 1 {
                base_number.clone()
            } else {
                format!("{base_number}-{attempt}")
            };

            match insert_shift_on(&mut tx, &shift, &candidate).await {
                Ok(()) => break,
                Err(DbError::UniqueViolation { field, .. }) => {
                    if field.contains("shift_number") {
                        // Same cashier, same second: bump the suffix
                        attempt += 1;
                        if attempt > SHIFT_NUMBER_ATTEMPTS {
                            return Err(DbError::Internal(format!(
                                "could not allocate a unique shift number after {SHIFT_NUMBER_ATTEMPTS} attempts (base {base_number})"
                            )));
                        }
                        debug!(candidate = %candidate, "Shift number collision, retrying with suffix");
                        continue;
                    }
                    // The one-active-per-cashier index fired: we lost a race
                    return Err(DbError::ShiftAlreadyOpen {
                        cashier_id: cashier.id.clone(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        let shift_number = if attempt == 1 {
            base_number
        } else {
            format!("{base_number}-{attempt}")
        };

        // Mirror travels with the shift row, atomically
        cashier::set_shift_mirror_on(&mut tx, &cashier.id, now, starting_cash_cents).await?;

        tx.commit().await?;

        let opened = Shift {
            shift_number: shift_number.clone(),
            ..shift
        };

        info!(
            shift_id = %opened.id,
            shift_number = %shift_number,
            cashier_id = %cashier.id,
            starting_cash = %Money::from_cents(starting_cash_cents),
            "Shift opened"
        );

        self.notifier.notify(NotificationEvent::ShiftOpened {
            business_id,
            shift_id: opened.id.clone(),
            shift_number,
            cashier_id: cashier.id.clone(),
            starting_cash_cents,
        });

        Ok(opened)
    }

    /// Closes an Open shift and derives its reconciliation figures.
    ///
    /// Expected cash is ALWAYS derived here — starting cash plus the sum of
    /// cash-tendered sales attributed to the shift — never supplied by the
    /// caller. A closed shift never reopens.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - unknown shift
    /// * `DbError::ShiftNotOpen` - shift is already closed
    pub async fn close(
        &self,
        shift_id: &str,
        actual_cash_cents: i64,
        reconcile: bool,
        reconciled_by: Option<&str>,
    ) -> DbResult<Shift> {
        validate_amount_cents("actual_cash", actual_cash_cents)?;

        if reconcile && reconciled_by.is_none() {
            return Err(ValidationError::Required {
                field: "reconciled_by".to_string(),
            }
            .into());
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let mut shift = get_by_id_on(&mut tx, shift_id)
            .await?
            .ok_or_else(|| DbError::not_found("Shift", shift_id))?;

        if !shift.is_active {
            return Err(DbError::ShiftNotOpen {
                shift_id: shift_id.to_string(),
            });
        }

        let cash_sales = sale::cash_total_for_shift_on(&mut tx, shift_id).await?;
        let expected = Money::from_cents(shift.starting_cash_cents) + Money::from_cents(cash_sales);
        let difference = Money::from_cents(actual_cash_cents) - expected;

        shift.end_time = Some(now);
        shift.is_active = false;
        shift.actual_cash_cents = actual_cash_cents;
        shift.expected_cash_cents = expected.cents();
        shift.difference_cents = difference.cents();
        if reconcile && shift.reconciled_at.is_none() {
            shift.reconciled_by = reconciled_by.map(|r| r.to_string());
            shift.reconciled_at = Some(now);
        }

        // The is_active guard makes a concurrent double-close lose cleanly
        let result = sqlx::query(
            r#"
            UPDATE shifts SET
                end_time = ?2,
                is_active = 0,
                expected_cash_cents = ?3,
                actual_cash_cents = ?4,
                difference_cents = ?5,
                reconciled_by = ?6,
                reconciled_at = ?7
            WHERE id = ?1 AND is_active = 1
            "#,
        )
        .bind(shift_id)
        .bind(shift.end_time)
        .bind(shift.expected_cash_cents)
        .bind(shift.actual_cash_cents)
        .bind(shift.difference_cents)
        .bind(&shift.reconciled_by)
        .bind(shift.reconciled_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::ShiftNotOpen {
                shift_id: shift_id.to_string(),
            });
        }

        cashier::clear_shift_mirror_on(&mut tx, &shift.cashier_id).await?;

        tx.commit().await?;

        info!(
            shift_id = %shift.id,
            shift_number = %shift.shift_number,
            expected = %expected,
            actual = %Money::from_cents(actual_cash_cents),
            difference = %difference,
            "Shift closed"
        );

        self.notifier.notify(NotificationEvent::ShiftClosed {
            business_id: shift.business_id.clone(),
            shift_id: shift.id.clone(),
            shift_number: shift.shift_number.clone(),
            cashier_id: shift.cashier_id.clone(),
            expected_cash_cents: shift.expected_cash_cents,
            actual_cash_cents: shift.actual_cash_cents,
            difference_cents: shift.difference_cents,
        });

        Ok(shift)
    }

    /// Stamps reconciliation on a closed shift, at most once.
    ///
    /// Idempotent: re-reconciling an already reconciled shift returns it
    /// unchanged (the original stamp wins).
    pub async fn reconcile(&self, shift_id: &str, reconciled_by: &str) -> DbResult<Shift> {
        let mut tx = self.pool.begin().await?;

        let shift = get_by_id_on(&mut tx, shift_id)
            .await?
            .ok_or_else(|| DbError::not_found("Shift", shift_id))?;

        if shift.is_active {
            return Err(DbError::ShiftNotOpen {
                shift_id: shift_id.to_string(),
            });
        }

        if shift.reconciled_at.is_some() {
            return Ok(shift);
        }

        let now = Utc::now();
        sqlx::query(
            "UPDATE shifts SET reconciled_by = ?2, reconciled_at = ?3 \
             WHERE id = ?1 AND reconciled_at IS NULL",
        )
        .bind(shift_id)
        .bind(reconciled_by)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(shift_id = %shift_id, reconciled_by = %reconciled_by, "Shift reconciled");

        Ok(Shift {
            reconciled_by: Some(reconciled_by.to_string()),
            reconciled_at: Some(now),
            ..shift
        })
    }

    /// The cashier's Open shift, if any.
    pub async fn active_for_cashier(&self, cashier_id: &str) -> DbResult<Option<Shift>> {
        let shift = sqlx::query_as::<_, Shift>(&format!(
            "SELECT {SHIFT_COLUMNS} FROM shifts WHERE cashier_id = ?1 AND is_active = 1"
        ))
        .bind(cashier_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }

    /// Gets a shift by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Shift>> {
        let shift = sqlx::query_as::<_, Shift>(&format!(
            "SELECT {SHIFT_COLUMNS} FROM shifts WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }
}

/// The cashier's Open shift id, inside an open transaction.
/// Used by the commit engine to attribute sales to the shift.
pub(crate) async fn active_shift_id_on(
    conn: &mut SqliteConnection,
    cashier_id: &str,
) -> DbResult<Option<String>> {
    let id: Option<String> =
        sqlx::query_scalar("SELECT id FROM shifts WHERE cashier_id = ?1 AND is_active = 1")
            .bind(cashier_id)
            .fetch_optional(conn)
            .await?;

    Ok(id)
}

async fn get_by_id_on(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Shift>> {
    let shift =
        sqlx::query_as::<_, Shift>(&format!("SELECT {SHIFT_COLUMNS} FROM shifts WHERE id = ?1"))
            .bind(id)
            .fetch_optional(conn)
            .await?;

    Ok(shift)
}

async fn insert_shift_on(
    conn: &mut SqliteConnection,
    shift: &Shift,
    shift_number: &str,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO shifts (
            id, business_id, cashier_id, shift_number,
            start_time, end_time, is_active,
            starting_cash_cents, expected_cash_cents, actual_cash_cents, difference_cents,
            reconciled_by, reconciled_at, notes, created_at
        ) VALUES (
            ?1, ?2, ?3, ?4,
            ?5, NULL, 1,
            ?6, 0, 0, 0,
            NULL, NULL, ?7, ?8
        )
        "#,
    )
    .bind(&shift.id)
    .bind(&shift.business_id)
    .bind(&shift.cashier_id)
    .bind(shift_number)
    .bind(shift.start_time)
    .bind(shift.starting_cash_cents)
    .bind(&shift.notes)
    .bind(shift.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[tokio::test]
    async fn test_open_sets_mirror_and_emits_event() {
        let (db, mut rx) = testutil::test_db_with_events().await;
        let cashier = testutil::seed_cashier(&db, Some("biz-1")).await;

        let shift = db.shifts().open(&cashier, 100_000).await.unwrap();
        assert!(shift.is_active);
        assert!(shift.shift_number.starts_with("SHIFT-"));
        assert_eq!(shift.starting_cash_cents, 100_000);

        let mirrored = db.cashiers().get_by_id(&cashier.id).await.unwrap().unwrap();
        assert!(mirrored.current_shift_open);
        assert_eq!(mirrored.current_shift_float_cents, 100_000);
        assert!(mirrored.current_shift_start.is_some());

        match rx.try_recv().unwrap() {
            NotificationEvent::ShiftOpened {
                shift_id,
                starting_cash_cents,
                ..
            } => {
                assert_eq!(shift_id, shift.id);
                assert_eq!(starting_cash_cents, 100_000);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_second_open_rejected() {
        let db = testutil::test_db().await;
        let cashier = testutil::seed_cashier(&db, Some("biz-1")).await;

        db.shifts().open(&cashier, 50_000).await.unwrap();
        let err = db.shifts().open(&cashier, 50_000).await.unwrap_err();
        assert!(matches!(err, DbError::ShiftAlreadyOpen { .. }));
    }

    #[tokio::test]
    async fn test_unassigned_cashier_cannot_open() {
        let db = testutil::test_db().await;
        let cashier = testutil::seed_cashier(&db, None).await;

        let err = db.shifts().open(&cashier, 0).await.unwrap_err();
        assert!(matches!(err, DbError::CashierUnassigned { .. }));
    }

    #[tokio::test]
    async fn test_close_derives_figures_and_clears_mirror() {
        let db = testutil::test_db().await;
        let cashier = testutil::seed_cashier(&db, Some("biz-1")).await;

        let shift = db.shifts().open(&cashier, 100_000).await.unwrap();
        // No sales attributed: expected == starting cash
        let closed = db.shifts().close(&shift.id, 99_500, false, None).await.unwrap();

        assert!(!closed.is_active);
        assert!(closed.end_time.is_some());
        assert_eq!(closed.expected_cash_cents, 100_000);
        assert_eq!(closed.actual_cash_cents, 99_500);
        assert_eq!(closed.difference_cents, -500); // drawer came up short
        assert!(!closed.is_balanced());

        let mirrored = db.cashiers().get_by_id(&cashier.id).await.unwrap().unwrap();
        assert!(!mirrored.current_shift_open);
        assert!(mirrored.current_shift_start.is_none());
        assert_eq!(mirrored.current_shift_float_cents, 0);

        // The stored row matches what close() returned
        let stored = db.shifts().get_by_id(&shift.id).await.unwrap().unwrap();
        assert!(!stored.is_active);
        assert_eq!(stored.difference_cents, -500);
    }

    #[tokio::test]
    async fn test_close_twice_rejected() {
        let db = testutil::test_db().await;
        let cashier = testutil::seed_cashier(&db, Some("biz-1")).await;

        let shift = db.shifts().open(&cashier, 0).await.unwrap();
        db.shifts().close(&shift.id, 0, false, None).await.unwrap();

        let err = db.shifts().close(&shift.id, 0, false, None).await.unwrap_err();
        assert!(matches!(err, DbError::ShiftNotOpen { .. }));
    }

    #[tokio::test]
    async fn test_new_shift_allowed_after_close() {
        let db = testutil::test_db().await;
        let cashier = testutil::seed_cashier(&db, Some("biz-1")).await;

        let first = db.shifts().open(&cashier, 0).await.unwrap();
        db.shifts().close(&first.id, 0, false, None).await.unwrap();

        let second = db.shifts().open(&cashier, 0).await.unwrap();
        assert_ne!(first.id, second.id);
        // Same-second reopen lands on the suffix path; either way the
        // numbers must differ
        assert_ne!(first.shift_number, second.shift_number);

        let active = db.shifts().active_for_cashier(&cashier.id).await.unwrap().unwrap();
        assert_eq!(active.id, second.id);
    }

    #[tokio::test]
    async fn test_close_with_reconcile_stamps() {
        let db = testutil::test_db().await;
        let cashier = testutil::seed_cashier(&db, Some("biz-1")).await;

        let shift = db.shifts().open(&cashier, 0).await.unwrap();
        let closed = db
            .shifts()
            .close(&shift.id, 0, true, Some("owner-1"))
            .await
            .unwrap();

        assert_eq!(closed.reconciled_by.as_deref(), Some("owner-1"));
        assert!(closed.reconciled_at.is_some());
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let db = testutil::test_db().await;
        let cashier = testutil::seed_cashier(&db, Some("biz-1")).await;

        let shift = db.shifts().open(&cashier, 0).await.unwrap();
        db.shifts().close(&shift.id, 0, false, None).await.unwrap();

        let first = db.shifts().reconcile(&shift.id, "owner-1").await.unwrap();
        assert_eq!(first.reconciled_by.as_deref(), Some("owner-1"));
        assert!(first.reconciled_at.is_some());

        // The original stamp wins
        let second = db.shifts().reconcile(&shift.id, "owner-2").await.unwrap();
        assert_eq!(second.reconciled_by.as_deref(), Some("owner-1"));
        assert!(second.reconciled_at.is_some());
    }

    #[tokio::test]
    async fn test_reconcile_open_shift_rejected() {
        let db = testutil::test_db().await;
        let cashier = testutil::seed_cashier(&db, Some("biz-1")).await;

        let shift = db.shifts().open(&cashier, 0).await.unwrap();
        let err = db.shifts().reconcile(&shift.id, "owner-1").await.unwrap_err();
        assert!(matches!(err, DbError::ShiftNotOpen { .. }));
    }
}
