//! Scenarios: shift reconciliation
//!
//! - mixed tenders are split by the tendered proportions, change ignored
//! - expected cash counts only cash: sales, abonos, income, expenses
//! - closing stamps unstamped settled documents and never overwrites a stamp
//! - overlapping shifts on different branches see only their own documents
//! - a failed commit leaves the shift open and nothing stamped
//! - closed shifts reject re-close and (by default) new movements

mod common;

use chrono::Duration;
use rust_decimal::Decimal;
use std::sync::atomic::Ordering;

use common::{FaultyHarness, Harness};
use tally_core::{AccountKind, Money, MovementKind, Tender, TenderBreakdown};
use tally_engine::{CloseStep, ErrorCode, ErrorResponse, LedgerConfig, LedgerError};

fn pesos(amount: i64) -> Money {
    Money::from_major_minor(amount, 0)
}

fn single(tender: Tender) -> TenderBreakdown {
    TenderBreakdown::Single(tender)
}

// ---------------------------------------------------------------------------
// Totals
// ---------------------------------------------------------------------------

#[tokio::test]
async fn mixed_tender_is_split_proportionally() {
    let h = Harness::new().await;
    let shift = h
        .ledger
        .reconciliation()
        .open_shift(1, Money::zero(), "cashier-01")
        .await
        .unwrap();
    h.clock.advance(Duration::minutes(5));

    let documents = h.ledger.documents();
    documents
        .record_sale(
            "cashier-01",
            pesos(300),
            pesos(300),
            TenderBreakdown::mixed([(Tender::Cash, pesos(100)), (Tender::Debit, pesos(200))]),
        )
        .await
        .unwrap();
    // Overpaid: 400 handed over for 300, change is not subtracted from the split
    documents
        .record_sale(
            "cashier-01",
            pesos(300),
            pesos(400),
            TenderBreakdown::mixed([(Tender::Cash, pesos(200)), (Tender::Debit, pesos(200))]),
        )
        .await
        .unwrap();

    let summary = h
        .ledger
        .reconciliation()
        .preview_close(&shift.id, Money::zero())
        .await
        .unwrap();

    assert_eq!(summary.cash_sales, pesos(250));
    assert_eq!(summary.debit_sales, pesos(350));
    assert_eq!(summary.total_sales, pesos(600));
    assert_eq!(summary.expected_cash, pesos(250));
}

#[tokio::test]
async fn empty_mixed_tender_falls_back_to_cash() {
    let h = Harness::new().await;
    let shift = h
        .ledger
        .reconciliation()
        .open_shift(1, Money::zero(), "cashier-01")
        .await
        .unwrap();

    h.ledger
        .documents()
        .record_sale(
            "cashier-01",
            pesos(100),
            Money::zero(),
            TenderBreakdown::mixed([(Tender::Cash, Money::zero()), (Tender::Debit, Money::zero())]),
        )
        .await
        .unwrap();

    let totals = h
        .ledger
        .reconciliation()
        .calculate_totals(&shift.id, shift.opened_at)
        .await
        .unwrap();
    assert_eq!(totals.sales_by_tender.cash, Decimal::new(100, 0));
    assert_eq!(totals.cash_fallbacks, 1);
}

#[tokio::test]
async fn expected_cash_and_surplus() {
    let h = Harness::new().await;
    let shifts = h.ledger.reconciliation();
    let documents = h.ledger.documents();

    let shift = shifts.open_shift(1, pesos(500), "cashier-01").await.unwrap();
    h.clock.advance(Duration::minutes(10));

    documents
        .record_sale("cashier-01", pesos(1200), pesos(1200), single(Tender::Cash))
        .await
        .unwrap();
    // Card sale: productivity, not drawer cash
    documents
        .record_sale("cashier-01", pesos(400), pesos(400), single(Tender::Credit))
        .await
        .unwrap();

    let credit = documents
        .record_account(AccountKind::Credit, "customer-1", pesos(2000))
        .await
        .unwrap();
    let layaway = documents
        .record_account(AccountKind::Layaway, "customer-2", pesos(1000))
        .await
        .unwrap();
    documents
        .record_account_payment(AccountKind::Credit, &credit.id, pesos(150), single(Tender::Cash), "cashier-01")
        .await
        .unwrap();
    documents
        .record_account_payment(
            AccountKind::Layaway,
            &layaway.id,
            pesos(100),
            TenderBreakdown::mixed([(Tender::Cash, pesos(80)), (Tender::Transfer, pesos(20))]),
            "cashier-01",
        )
        .await
        .unwrap();
    // Electronic abono: no cash
    documents
        .record_account_payment(AccountKind::Credit, &credit.id, pesos(300), single(Tender::Debit), "cashier-01")
        .await
        .unwrap();

    shifts
        .add_movement(&shift.id, MovementKind::Income, "Change fund", pesos(50), "cashier-01")
        .await
        .unwrap();
    shifts
        .add_movement(&shift.id, MovementKind::Expense, "Courier", pesos(30), "cashier-01")
        .await
        .unwrap();

    let exact = shifts.preview_close(&shift.id, pesos(1950)).await.unwrap();
    assert_eq!(exact.expected_cash, pesos(1950));
    assert_eq!(exact.surplus, Money::zero());
    assert_eq!(exact.productivity, pesos(1200 + 400 + 2000 + 1000));
    assert_eq!(exact.credit_cash, pesos(150));
    assert_eq!(exact.layaway_cash, pesos(80));

    let short = shifts.preview_close(&shift.id, pesos(1900)).await.unwrap();
    assert_eq!(short.surplus, pesos(-50));

    h.clock.advance(Duration::hours(8));
    let closed = shifts
        .close_shift(&shift.id, pesos(2000), Some("Counted twice".to_string()))
        .await
        .unwrap();

    assert!(!closed.shift.is_open());
    assert_eq!(closed.shift.surplus(), pesos(50));
    assert_eq!(closed.shift.expected_cash(), pesos(1950));
    assert_eq!(closed.shift.tender_sales(Tender::Credit), pesos(400));
    assert_eq!(closed.shift.notes.as_deref(), Some("Counted twice"));
    assert!(closed.shift.expense_breakdown.contains("Courier"));
    assert!(closed.shift.income_breakdown.contains("Change fund"));

    // Two sales and three abonos; accounts themselves are not stamped
    assert_eq!(closed.stamped.sales, 2);
    assert_eq!(closed.stamped.credit_payments, 2);
    assert_eq!(closed.stamped.layaway_payments, 1);
    let account = h
        .db
        .accounts()
        .get_account(AccountKind::Credit, &credit.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(account.shift_folio, None);

    // What was written is what the store returns
    let stored = shifts.shift(&shift.id).await.unwrap();
    assert_eq!(stored, closed.shift);
}

#[tokio::test]
async fn totals_are_repeatable() {
    let h = Harness::new().await;
    let shifts = h.ledger.reconciliation();
    let shift = shifts.open_shift(1, pesos(500), "cashier-01").await.unwrap();
    h.ledger
        .documents()
        .record_sale(
            "cashier-01",
            pesos(100),
            pesos(100),
            TenderBreakdown::mixed([
                (Tender::Cash, pesos(1)),
                (Tender::Debit, pesos(1)),
                (Tender::Check, pesos(1)),
            ]),
        )
        .await
        .unwrap();

    let first = shifts.calculate_totals(&shift.id, shift.opened_at).await.unwrap();
    let second = shifts.calculate_totals(&shift.id, shift.opened_at).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.sales_by_tender.sum(), first.total_sales);
    assert!(shifts.shift(&shift.id).await.unwrap().is_open());
}

// ---------------------------------------------------------------------------
// Stamping
// ---------------------------------------------------------------------------

#[tokio::test]
async fn overlapping_branches_count_only_their_own_documents() {
    let h = Harness::new().await;
    let shifts = h.ledger.reconciliation();
    let south_till = h.till(2);

    let north = shifts.open_shift(1, Money::zero(), "cashier-01").await.unwrap();
    let south = shifts.open_shift(2, pesos(100), "cashier-02").await.unwrap();
    h.clock.advance(Duration::minutes(30));

    let north_sale = h
        .ledger
        .documents()
        .record_sale("cashier-01", pesos(250), pesos(250), single(Tender::Cash))
        .await
        .unwrap();
    let south_sale = south_till
        .documents()
        .record_sale("cashier-02", pesos(120), pesos(120), single(Tender::Cash))
        .await
        .unwrap();
    let south_credit = south_till
        .documents()
        .record_account(AccountKind::Credit, "customer-7", pesos(600))
        .await
        .unwrap();
    south_till
        .documents()
        .record_account_payment(AccountKind::Credit, &south_credit.id, pesos(40), single(Tender::Cash), "cashier-02")
        .await
        .unwrap();
    h.clock.advance(Duration::hours(1));

    let south_closed = shifts.close_shift(&south.id, pesos(260), None).await.unwrap();
    assert_eq!(south_closed.shift.total_sales_cents, 12000);
    assert_eq!(south_closed.shift.credits_created_cents, 60000);
    assert_eq!(south_closed.shift.expected_cash(), pesos(260));
    assert_eq!(south_closed.shift.surplus(), Money::zero());
    assert_eq!(south_closed.stamped.sales, 1);
    assert_eq!(south_closed.stamped.credit_payments, 1);

    let north_closed = shifts.close_shift(&north.id, pesos(250), None).await.unwrap();
    assert_eq!(north_closed.shift.total_sales_cents, 25000);
    assert_eq!(north_closed.shift.credits_created_cents, 0);
    assert_eq!(north_closed.shift.expected_cash(), pesos(250));
    assert_eq!(north_closed.shift.surplus(), Money::zero());
    assert_eq!(north_closed.stamped.sales, 1);
    assert_eq!(north_closed.stamped.credit_payments, 0);

    let stored = h.db.sales().get_by_id(&north_sale.id).await.unwrap().unwrap();
    assert_eq!(stored.shift_folio, Some(north.folio));
    let stored = h.db.sales().get_by_id(&south_sale.id).await.unwrap().unwrap();
    assert_eq!(stored.shift_folio, Some(south.folio));
}

#[tokio::test]
async fn documents_after_close_wait_for_the_next_shift() {
    let h = Harness::new().await;
    let shifts = h.ledger.reconciliation();

    let morning = shifts.open_shift(1, Money::zero(), "cashier-01").await.unwrap();
    h.clock.advance(Duration::hours(4));
    shifts.close_shift(&morning.id, Money::zero(), None).await.unwrap();

    h.clock.advance(Duration::minutes(1));
    let late = h
        .ledger
        .documents()
        .record_sale("cashier-01", pesos(80), pesos(100), single(Tender::Cash))
        .await
        .unwrap();
    let stored = h.db.sales().get_by_id(&late.id).await.unwrap().unwrap();
    assert_eq!(stored.shift_folio, None);

    h.clock.advance(Duration::minutes(1));
    let evening = shifts.open_shift(1, Money::zero(), "cashier-02").await.unwrap();
    h.clock.advance(Duration::hours(4));
    let closed = shifts.close_shift(&evening.id, pesos(80), None).await.unwrap();

    // The late sale predates the evening shift, so it is neither counted nor stamped
    assert_eq!(closed.stamped.sales, 0);
    assert_eq!(closed.shift.total_sales_cents, 0);
}

// ---------------------------------------------------------------------------
// Failures and state checks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_commit_leaves_shift_open() {
    let h = FaultyHarness::new(LedgerConfig::default()).await;
    let shifts = h.ledger.reconciliation();

    let shift = shifts.open_shift(1, pesos(500), "cashier-01").await.unwrap();
    h.clock.advance(Duration::minutes(5));
    let sale = h
        .ledger
        .documents()
        .record_sale("cashier-01", pesos(100), pesos(100), single(Tender::Cash))
        .await
        .unwrap();
    h.clock.advance(Duration::hours(1));

    h.store.fail_commit.store(true, Ordering::SeqCst);
    let err = shifts.close_shift(&shift.id, pesos(600), None).await.unwrap_err();
    assert_eq!(err.close_step(), Some(CloseStep::Commit));
    assert_eq!(err.code(), ErrorCode::CloseFailed);

    assert!(shifts.current_shift(1).await.unwrap().is_some());
    let stored = h.store.inner.sales().get_by_id(&sale.id).await.unwrap().unwrap();
    assert_eq!(stored.shift_folio, None);

    // Retrying is the recovery path
    h.store.fail_commit.store(false, Ordering::SeqCst);
    let closed = shifts.close_shift(&shift.id, pesos(600), None).await.unwrap();
    assert_eq!(closed.stamped.sales, 1);
    assert_eq!(closed.shift.surplus(), Money::zero());
}

#[tokio::test]
async fn closed_shift_rejects_second_close() {
    let h = Harness::new().await;
    let shifts = h.ledger.reconciliation();
    let shift = shifts.open_shift(1, Money::zero(), "cashier-01").await.unwrap();
    h.clock.advance(Duration::hours(1));
    shifts.close_shift(&shift.id, Money::zero(), None).await.unwrap();

    let err = shifts.close_shift(&shift.id, Money::zero(), None).await.unwrap_err();
    assert!(matches!(err, LedgerError::ShiftAlreadyClosed { .. }));
    assert_eq!(ErrorResponse::from(&err).code, ErrorCode::Conflict);
}

#[tokio::test]
async fn closed_shift_rejects_movements_by_default() {
    let h = Harness::new().await;
    let shifts = h.ledger.reconciliation();
    let shift = shifts.open_shift(1, Money::zero(), "cashier-01").await.unwrap();
    h.clock.advance(Duration::hours(1));
    shifts.close_shift(&shift.id, Money::zero(), None).await.unwrap();

    let err = shifts
        .add_movement(&shift.id, MovementKind::Expense, "Ice", pesos(20), "cashier-01")
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Conflict);
    assert!(shifts.movements(&shift.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn late_movements_allowed_by_config() {
    let mut config = LedgerConfig::default();
    config.reconciliation.allow_late_movements = true;
    let h = Harness::with_config(config).await;
    let shifts = h.ledger.reconciliation();

    let shift = shifts.open_shift(1, Money::zero(), "cashier-01").await.unwrap();
    h.clock.advance(Duration::hours(1));
    shifts.close_shift(&shift.id, Money::zero(), None).await.unwrap();

    let movement = shifts
        .add_movement(&shift.id, MovementKind::Income, "Found under drawer", pesos(10), "supervisor")
        .await
        .unwrap();
    assert_eq!(movement.amount(), pesos(10));
    assert_eq!(shifts.movements(&shift.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn movement_input_is_validated() {
    let h = Harness::new().await;
    let shifts = h.ledger.reconciliation();
    let shift = shifts.open_shift(1, Money::zero(), "cashier-01").await.unwrap();

    let blank = shifts
        .add_movement(&shift.id, MovementKind::Expense, "   ", pesos(5), "cashier-01")
        .await
        .unwrap_err();
    assert_eq!(blank.code(), ErrorCode::Validation);

    let zero = shifts
        .add_movement(&shift.id, MovementKind::Expense, "Tape", Money::zero(), "cashier-01")
        .await
        .unwrap_err();
    assert_eq!(zero.code(), ErrorCode::Validation);

    let missing = shifts
        .add_movement("no-such-shift", MovementKind::Expense, "Tape", pesos(5), "cashier-01")
        .await
        .unwrap_err();
    assert_eq!(missing.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn one_open_shift_per_branch() {
    let h = Harness::new().await;
    let shifts = h.ledger.reconciliation();
    shifts.open_shift(1, Money::zero(), "cashier-01").await.unwrap();

    let err = shifts.open_shift(1, Money::zero(), "cashier-02").await.unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)));

    // Another branch is unaffected
    shifts.open_shift(2, Money::zero(), "cashier-02").await.unwrap();
}

#[tokio::test]
async fn concurrent_opens_admit_one() {
    let h = Harness::new().await;

    let mut tasks = Vec::new();
    for user in ["cashier-01", "cashier-02"] {
        let shifts = h.ledger.reconciliation().clone();
        tasks.push(tokio::spawn(async move {
            shifts.open_shift(3, Money::zero(), user).await
        }));
    }

    let mut opened = 0;
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => opened += 1,
            Err(e) if e.code() == ErrorCode::Conflict => conflicts += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!((opened, conflicts), (1, 1));
}
