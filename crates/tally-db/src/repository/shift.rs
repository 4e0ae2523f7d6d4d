//! # Shift Repository
//!
//! Cash shifts and the close transaction.
//!
//! ## Close Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    UPDATE cash_shifts SET <totals>, closed_at                           │
//! │      WHERE id = ? AND closed_at = opened_at   ← still open?            │
//! │    UPDATE sales            SET shift_folio = ?  WHERE branch, unstamped│
//! │    UPDATE credit_payments  SET shift_folio = ?  WHERE branch, unstamped│
//! │    UPDATE layaway_payments SET shift_folio = ?  WHERE branch, unstamped│
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Any failure rolls the whole close back and the shift stays open.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::table_name;
use crate::error::{DbError, DbResult};
use tally_core::{CashShift, DocumentKind};

const SELECT_SHIFT: &str = r#"
    SELECT
        id, folio, branch, register, cashier_id, opening_cents,
        opened_at, closed_at,
        cash_sales_cents, debit_sales_cents, credit_sales_cents,
        transfer_sales_cents, check_sales_cents, total_sales_cents,
        productivity_cents, credits_created_cents, layaways_created_cents,
        credit_cash_cents, layaway_cash_cents,
        expenses_cents, income_cents,
        expected_cash_cents, declared_cash_cents, surplus_cents,
        expense_breakdown, income_breakdown, notes
    FROM cash_shifts
"#;

/// How many records a close stamped, per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StampCounts {
    pub sales: u64,
    pub credit_payments: u64,
    pub layaway_payments: u64,
}

impl StampCounts {
    pub fn total(&self) -> u64 {
        self.sales + self.credit_payments + self.layaway_payments
    }
}

/// Repository for cash shift operations.
#[derive(Debug, Clone)]
pub struct ShiftRepository {
    pool: SqlitePool,
}

impl ShiftRepository {
    /// Creates a new ShiftRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ShiftRepository { pool }
    }

    /// Inserts a freshly opened shift.
    ///
    /// ## Errors
    /// `UniqueViolation` when the folio exists or the branch already has an
    /// open shift.
    pub async fn insert(&self, shift: &CashShift) -> DbResult<()> {
        debug!(id = %shift.id, folio = %shift.folio, branch = shift.branch, "Inserting shift");

        sqlx::query(
            r#"
            INSERT INTO cash_shifts (
                id, folio, branch, register, cashier_id, opening_cents,
                opened_at, closed_at, expense_breakdown, income_breakdown, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&shift.id)
        .bind(shift.folio.as_str())
        .bind(shift.branch)
        .bind(shift.register)
        .bind(&shift.cashier_id)
        .bind(shift.opening_cents)
        .bind(shift.opened_at)
        .bind(shift.closed_at)
        .bind(&shift.expense_breakdown)
        .bind(&shift.income_breakdown)
        .bind(&shift.notes)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a shift by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CashShift>> {
        let shift: Option<CashShift> = sqlx::query_as(&format!("{SELECT_SHIFT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(shift)
    }

    /// The open shift of a branch, if any.
    pub async fn find_open(&self, branch: u8) -> DbResult<Option<CashShift>> {
        let shift: Option<CashShift> = sqlx::query_as(&format!(
            "{SELECT_SHIFT} WHERE branch = ?1 AND closed_at = opened_at \
             ORDER BY opened_at DESC LIMIT 1"
        ))
        .bind(branch)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }

    /// Most recent shifts of a branch, newest first.
    pub async fn list_recent(&self, branch: u8, limit: u32) -> DbResult<Vec<CashShift>> {
        let shifts: Vec<CashShift> = sqlx::query_as(&format!(
            "{SELECT_SHIFT} WHERE branch = ?1 ORDER BY opened_at DESC LIMIT ?2"
        ))
        .bind(branch)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(shifts)
    }

    /// Writes the close of `shift` and stamps every unstamped settled record
    /// of the shift's branch created in `[since, shift.closed_at]`, atomically.
    ///
    /// ## Errors
    /// - `NotFound` when the shift does not exist or is no longer open
    /// - `TransactionFailed` when the commit fails
    pub async fn commit_close(
        &self,
        shift: &CashShift,
        since: DateTime<Utc>,
    ) -> DbResult<StampCounts> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let updated = sqlx::query(
            r#"
            UPDATE cash_shifts SET
                closed_at = ?2,
                cash_sales_cents = ?3,
                debit_sales_cents = ?4,
                credit_sales_cents = ?5,
                transfer_sales_cents = ?6,
                check_sales_cents = ?7,
                total_sales_cents = ?8,
                productivity_cents = ?9,
                credits_created_cents = ?10,
                layaways_created_cents = ?11,
                credit_cash_cents = ?12,
                layaway_cash_cents = ?13,
                expenses_cents = ?14,
                income_cents = ?15,
                expected_cash_cents = ?16,
                declared_cash_cents = ?17,
                surplus_cents = ?18,
                expense_breakdown = ?19,
                income_breakdown = ?20,
                notes = ?21
            WHERE id = ?1 AND closed_at = opened_at
            "#,
        )
        .bind(&shift.id)
        .bind(shift.closed_at)
        .bind(shift.cash_sales_cents)
        .bind(shift.debit_sales_cents)
        .bind(shift.credit_sales_cents)
        .bind(shift.transfer_sales_cents)
        .bind(shift.check_sales_cents)
        .bind(shift.total_sales_cents)
        .bind(shift.productivity_cents)
        .bind(shift.credits_created_cents)
        .bind(shift.layaways_created_cents)
        .bind(shift.credit_cash_cents)
        .bind(shift.layaway_cash_cents)
        .bind(shift.expenses_cents)
        .bind(shift.income_cents)
        .bind(shift.expected_cash_cents)
        .bind(shift.declared_cash_cents)
        .bind(shift.surplus_cents)
        .bind(&shift.expense_breakdown)
        .bind(&shift.income_breakdown)
        .bind(&shift.notes)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Dropping the transaction rolls it back
            return Err(DbError::not_found("Open shift", &shift.id));
        }

        let mut counts = StampCounts::default();
        for kind in DocumentKind::SETTLED {
            let table = table_name(kind);
            let stamped = sqlx::query(&format!(
                r#"
                UPDATE {table} SET shift_folio = ?1
                WHERE branch = ?2
                  AND created_at >= ?3
                  AND created_at <= ?4
                  AND (shift_folio IS NULL OR shift_folio = '')
                "#
            ))
            .bind(shift.folio.as_str())
            .bind(shift.branch)
            .bind(since)
            .bind(shift.closed_at)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            match kind {
                DocumentKind::Sale => counts.sales = stamped,
                DocumentKind::CreditPayment => counts.credit_payments = stamped,
                _ => counts.layaway_payments = stamped,
            }
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            id = %shift.id,
            folio = %shift.folio,
            stamped = counts.total(),
            "Shift closed"
        );
        Ok(counts)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
