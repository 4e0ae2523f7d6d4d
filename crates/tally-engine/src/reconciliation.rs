//! # Reconciliation Engine
//!
//! Shift lifecycle: open, record drawer movements, compute totals, close.
//!
//! ## Close Flow
//! ```text
//! close_shift(id, declared)
//!     │
//!     ├── 1. load shift (OPEN required)
//!     ├── 2. closed_at = now
//!     ├── 3. branch totals over [opened_at, closed_at] ── CloseStep::Totals
//!     ├── 4. round once, serialize breakdowns        ── CloseStep::Summary
//!     └── 5. one transaction:                        ── CloseStep::Commit
//!            UPDATE shift (guarded by closed_at = opened_at)
//!            stamp unstamped sales / abonos of the branch in the same window
//! ```
//! A failure at any step leaves the shift OPEN and nothing stamped, so the
//! caller retries `close_shift`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use tally_core::validation::{
    validate_concept, validate_non_negative_amount, validate_positive_amount, validate_required,
};
use tally_core::{
    AccountKind, CashMovement, CashShift, CloseSummary, FolioKind, Money, MovementKind,
    ShiftActivity, ShiftTotals,
};
use tally_db::{DbError, StampCounts};

use crate::clock::Clock;
use crate::error::{CloseStep, LedgerError, LedgerResult};
use crate::sequence::SequenceAuthority;
use crate::store::LedgerStore;

/// A shift after a successful close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedShift {
    pub shift: CashShift,
    /// Records stamped with the shift folio by this close.
    pub stamped: StampCounts,
}

/// Opens, tracks and closes cash shifts.
#[derive(Clone)]
pub struct ReconciliationEngine {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    sequence: SequenceAuthority,
    register: u8,
    allow_late_movements: bool,
}

impl ReconciliationEngine {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        clock: Arc<dyn Clock>,
        sequence: SequenceAuthority,
        register: u8,
        allow_late_movements: bool,
    ) -> Self {
        ReconciliationEngine {
            store,
            clock,
            sequence,
            register,
            allow_late_movements,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Opens a shift for `branch` with a starting float.
    ///
    /// The open-shift check and the insert run under the folio lease, so two
    /// concurrent opens for one branch cannot both succeed.
    ///
    /// ## Errors
    /// - `Validation` for a negative float or blank user
    /// - `Conflict` when the branch already has an open shift
    pub async fn open_shift(
        &self,
        branch: u8,
        opening: Money,
        user_id: &str,
    ) -> LedgerResult<CashShift> {
        validate_non_negative_amount("opening amount", opening)?;
        validate_required("user", user_id)?;

        let lease = self.sequence.lease(branch, self.register, FolioKind::Close).await?;

        if let Some(open) = self.store.open_shift_for_branch(branch).await? {
            return Err(LedgerError::Conflict(format!(
                "Branch {} already has an open shift: {}",
                branch, open.folio
            )));
        }

        let shift = CashShift::open(
            Uuid::new_v4().to_string(),
            lease.folio().clone(),
            branch,
            self.register,
            user_id.to_string(),
            opening,
            lease.issued_at(),
        );
        self.store.insert_shift(&shift).await?;
        drop(lease);

        info!(
            id = %shift.id,
            folio = %shift.folio,
            branch,
            opening = %opening,
            "Shift opened"
        );
        Ok(shift)
    }

    /// Computes unrounded totals for a shift. Reads only.
    ///
    /// Only documents of the shift's branch count. An open shift counts
    /// everything since `opened_at`; a closed one stops at its `closed_at`.
    pub async fn calculate_totals(
        &self,
        shift_id: &str,
        opened_at: DateTime<Utc>,
    ) -> LedgerResult<ShiftTotals> {
        let shift = self.shift(shift_id).await?;
        let until = (!shift.is_open()).then_some(shift.closed_at);
        self.totals_between(&shift, opened_at, until).await
    }

    /// What a close with `declared` cash would write, without writing it.
    pub async fn preview_close(&self, shift_id: &str, declared: Money) -> LedgerResult<CloseSummary> {
        validate_non_negative_amount("declared cash", declared)?;

        let shift = self.shift(shift_id).await?;
        let until = (!shift.is_open()).then_some(shift.closed_at);
        let totals = self.totals_between(&shift, shift.opened_at, until).await?;
        Ok(totals.close_summary(declared)?)
    }

    /// Closes an open shift against the cash the cashier counted.
    ///
    /// ## Errors
    /// - `Validation` for a negative declared amount
    /// - `NotFound` for an unknown shift
    /// - `ShiftAlreadyClosed` when the shift is closed, including by a
    ///   concurrent close that committed first
    /// - `CloseFailed` naming the step that failed; the shift stays open
    pub async fn close_shift(
        &self,
        shift_id: &str,
        declared: Money,
        notes: Option<String>,
    ) -> LedgerResult<ClosedShift> {
        validate_non_negative_amount("declared cash", declared)?;

        let shift = self.shift(shift_id).await?;
        if !shift.is_open() {
            return Err(LedgerError::ShiftAlreadyClosed {
                folio: shift.folio.to_string(),
            });
        }

        let mut closed_at = self.clock.now_utc();
        if closed_at <= shift.opened_at {
            closed_at = shift.opened_at + Duration::microseconds(1);
        }

        let totals = self
            .totals_between(&shift, shift.opened_at, Some(closed_at))
            .await
            .map_err(|e| LedgerError::close_failed(CloseStep::Totals, e))?;

        if totals.cash_fallbacks > 0 {
            warn!(
                folio = %shift.folio,
                sales = totals.cash_fallbacks,
                "Mixed-tender sales with nothing tendered were booked as cash"
            );
        }

        let summary = totals
            .close_summary(declared)
            .map_err(|e| LedgerError::close_failed(CloseStep::Summary, e.into()))?;

        let notes = notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let mut closed = shift.clone();
        closed.apply_close(&summary, closed_at, notes);

        let stamped = match self.store.commit_close(&closed, shift.opened_at).await {
            Ok(stamped) => stamped,
            Err(DbError::NotFound { .. }) => {
                return Err(LedgerError::ShiftAlreadyClosed {
                    folio: shift.folio.to_string(),
                })
            }
            Err(e) => return Err(LedgerError::close_failed(CloseStep::Commit, e.into())),
        };

        info!(
            folio = %closed.folio,
            expected = %summary.expected_cash,
            declared = %declared,
            surplus = %summary.surplus,
            stamped = stamped.total(),
            "Shift closed"
        );
        Ok(ClosedShift {
            shift: closed,
            stamped,
        })
    }

    // =========================================================================
    // Movements
    // =========================================================================

    /// Records a manual expense or income on a shift.
    ///
    /// ## Errors
    /// - `Validation` for a blank concept, non-positive amount or blank user
    /// - `NotFound` for an unknown shift
    /// - `ShiftAlreadyClosed` when the shift is closed and late movements
    ///   are not allowed
    pub async fn add_movement(
        &self,
        shift_id: &str,
        kind: MovementKind,
        concept: &str,
        amount: Money,
        user_id: &str,
    ) -> LedgerResult<CashMovement> {
        let concept = validate_concept(concept)?;
        validate_positive_amount("amount", amount)?;
        validate_required("user", user_id)?;

        let shift = self.shift(shift_id).await?;
        if !shift.is_open() && !self.allow_late_movements {
            return Err(LedgerError::ShiftAlreadyClosed {
                folio: shift.folio.to_string(),
            });
        }

        let movement = CashMovement {
            id: Uuid::new_v4().to_string(),
            shift_id: shift.id.clone(),
            kind,
            concept,
            amount_cents: amount.cents(),
            user_id: user_id.to_string(),
            created_at: self.clock.now_utc(),
        };
        self.store.insert_movement(&movement).await?;

        info!(
            folio = %shift.folio,
            kind = %kind,
            amount = %amount,
            "Cash movement recorded"
        );
        Ok(movement)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// The open shift of `branch`, if any.
    pub async fn current_shift(&self, branch: u8) -> LedgerResult<Option<CashShift>> {
        Ok(self.store.open_shift_for_branch(branch).await?)
    }

    pub async fn shift(&self, shift_id: &str) -> LedgerResult<CashShift> {
        self.store
            .find_shift(shift_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Shift", shift_id))
    }

    pub async fn movements(&self, shift_id: &str) -> LedgerResult<Vec<CashMovement>> {
        Ok(self.store.shift_movements(shift_id).await?)
    }

    async fn totals_between(
        &self,
        shift: &CashShift,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> LedgerResult<ShiftTotals> {
        let branch = shift.branch;
        let activity = ShiftActivity {
            sales: self.store.sales_between(branch, since, until).await?,
            credits: self
                .store
                .accounts_between(AccountKind::Credit, branch, since, until)
                .await?,
            layaways: self
                .store
                .accounts_between(AccountKind::Layaway, branch, since, until)
                .await?,
            credit_payments: self
                .store
                .payments_between(AccountKind::Credit, branch, since, until)
                .await?,
            layaway_payments: self
                .store
                .payments_between(AccountKind::Layaway, branch, since, until)
                .await?,
            movements: self.store.shift_movements(&shift.id).await?,
        };

        let totals = ShiftTotals::compute(shift.opening(), &activity);
        debug!(
            folio = %shift.folio,
            sales = totals.sale_count,
            expected = %totals.expected_cash,
            "Shift totals computed"
        );
        Ok(totals)
    }
}

impl std::fmt::Debug for ReconciliationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationEngine")
            .field("register", &self.register)
            .field("allow_late_movements", &self.allow_late_movements)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{FixedOffset, TimeZone};
    use tally_core::ShiftStatus;
    use tally_db::{Database, DbConfig};

    async fn engine() -> (ReconciliationEngine, FixedClock) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tz = FixedOffset::west_opt(6 * 3600).unwrap();
        let clock = FixedClock::new(tz.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap());
        let store: Arc<dyn LedgerStore> = Arc::new(db);
        let clock_ref: Arc<dyn Clock> = Arc::new(clock.clone());
        let sequence = SequenceAuthority::new(store.clone(), clock_ref.clone(), 8);
        (
            ReconciliationEngine::new(store, clock_ref, sequence, 1, false),
            clock,
        )
    }

    #[tokio::test]
    async fn test_open_shift_starts_open() {
        let (engine, _clock) = engine().await;
        let shift = engine
            .open_shift(1, Money::from_major_minor(500, 0), "cashier-01")
            .await
            .unwrap();

        assert_eq!(shift.status(), ShiftStatus::Open);
        assert_eq!(shift.folio.as_str(), "010119102026X0001");
        assert_eq!(shift.opening().cents(), 50000);
    }

    #[tokio::test]
    async fn test_negative_float_rejected() {
        let (engine, _clock) = engine().await;
        let err = engine
            .open_shift(1, Money::from_cents(-1), "cashier-01")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[tokio::test]
    async fn test_close_with_no_activity() {
        let (engine, clock) = engine().await;
        let shift = engine
            .open_shift(1, Money::from_major_minor(500, 0), "cashier-01")
            .await
            .unwrap();
        clock.advance(Duration::hours(8));

        let closed = engine
            .close_shift(&shift.id, Money::from_major_minor(500, 0), Some("  ".to_string()))
            .await
            .unwrap();

        assert!(!closed.shift.is_open());
        assert_eq!(closed.shift.expected_cash().cents(), 50000);
        assert_eq!(closed.shift.surplus().cents(), 0);
        assert_eq!(closed.shift.notes, None);
        assert_eq!(closed.stamped.total(), 0);
    }

    #[tokio::test]
    async fn test_close_without_clock_movement_still_closes() {
        let (engine, _clock) = engine().await;
        let shift = engine
            .open_shift(1, Money::zero(), "cashier-01")
            .await
            .unwrap();

        let closed = engine.close_shift(&shift.id, Money::zero(), None).await.unwrap();
        assert!(closed.shift.closed_at > closed.shift.opened_at);
        assert_eq!(engine.current_shift(1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unknown_shift_is_not_found() {
        let (engine, _clock) = engine().await;
        let err = engine
            .close_shift("missing", Money::zero(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }
}
