//! # Ledger Store
//!
//! The persistence seam the engine runs against. [`Database`] is the SQLite
//! implementation; tests wrap it to inject faults.
//!
//! ```text
//! SequenceAuthority ────┐
//! DocumentRecorder ─────┼──► Arc<dyn LedgerStore> ──► tally_db::Database
//! ReconciliationEngine ─┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tally_core::{
    Account, AccountKind, AccountPayment, CashMovement, CashShift, DocumentKind, Sale,
};
use tally_db::{Database, DbResult, StampCounts};

/// Append, update and lookup operations over ledger records.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    // -------------------------------------------------------------------------
    // Folio lookups
    // -------------------------------------------------------------------------

    /// Folios of `kind` starting with `prefix`, created in `[from, until)`.
    async fn folios_with_prefix(
        &self,
        kind: DocumentKind,
        prefix: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> DbResult<Vec<String>>;

    /// Every folio ever stored for `kind`.
    async fn all_folios(&self, kind: DocumentKind) -> DbResult<Vec<String>>;

    /// True when `folio` exists in any folio-bearing table.
    async fn folio_exists(&self, folio: &str) -> DbResult<bool>;

    // -------------------------------------------------------------------------
    // Shifts and movements
    // -------------------------------------------------------------------------

    async fn open_shift_for_branch(&self, branch: u8) -> DbResult<Option<CashShift>>;

    async fn insert_shift(&self, shift: &CashShift) -> DbResult<()>;

    async fn find_shift(&self, id: &str) -> DbResult<Option<CashShift>>;

    /// Persists a closed shift and stamps unstamped settled records of its
    /// branch created in `[since, shift.closed_at]`, atomically.
    async fn commit_close(&self, shift: &CashShift, since: DateTime<Utc>)
        -> DbResult<StampCounts>;

    async fn insert_movement(&self, movement: &CashMovement) -> DbResult<()>;

    async fn shift_movements(&self, shift_id: &str) -> DbResult<Vec<CashMovement>>;

    // -------------------------------------------------------------------------
    // Documents
    // -------------------------------------------------------------------------

    async fn insert_sale(&self, sale: &Sale) -> DbResult<()>;

    async fn insert_account(&self, account: &Account) -> DbResult<()>;

    async fn find_account(&self, kind: AccountKind, id: &str) -> DbResult<Option<Account>>;

    async fn insert_account_payment(&self, payment: &AccountPayment) -> DbResult<()>;

    async fn sales_between(
        &self,
        branch: u8,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<Sale>>;

    async fn accounts_between(
        &self,
        kind: AccountKind,
        branch: u8,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<Account>>;

    async fn payments_between(
        &self,
        kind: AccountKind,
        branch: u8,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<AccountPayment>>;
}

#[async_trait]
impl LedgerStore for Database {
    async fn folios_with_prefix(
        &self,
        kind: DocumentKind,
        prefix: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> DbResult<Vec<String>> {
        self.folios()
            .with_prefix_between(kind, prefix, from, until)
            .await
    }

    async fn all_folios(&self, kind: DocumentKind) -> DbResult<Vec<String>> {
        self.folios().all(kind).await
    }

    async fn folio_exists(&self, folio: &str) -> DbResult<bool> {
        self.folios().exists(folio).await
    }

    async fn open_shift_for_branch(&self, branch: u8) -> DbResult<Option<CashShift>> {
        self.shifts().find_open(branch).await
    }

    async fn insert_shift(&self, shift: &CashShift) -> DbResult<()> {
        self.shifts().insert(shift).await
    }

    async fn find_shift(&self, id: &str) -> DbResult<Option<CashShift>> {
        self.shifts().get_by_id(id).await
    }

    async fn commit_close(
        &self,
        shift: &CashShift,
        since: DateTime<Utc>,
    ) -> DbResult<StampCounts> {
        self.shifts().commit_close(shift, since).await
    }

    async fn insert_movement(&self, movement: &CashMovement) -> DbResult<()> {
        self.movements().insert(movement).await
    }

    async fn shift_movements(&self, shift_id: &str) -> DbResult<Vec<CashMovement>> {
        self.movements().list_for_shift(shift_id).await
    }

    async fn insert_sale(&self, sale: &Sale) -> DbResult<()> {
        self.sales().insert(sale).await
    }

    async fn insert_account(&self, account: &Account) -> DbResult<()> {
        self.accounts().insert_account(account).await
    }

    async fn find_account(&self, kind: AccountKind, id: &str) -> DbResult<Option<Account>> {
        self.accounts().get_account(kind, id).await
    }

    async fn insert_account_payment(&self, payment: &AccountPayment) -> DbResult<()> {
        self.accounts().insert_payment(payment).await
    }

    async fn sales_between(
        &self,
        branch: u8,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<Sale>> {
        self.sales().list_between(branch, since, until).await
    }

    async fn accounts_between(
        &self,
        kind: AccountKind,
        branch: u8,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<Account>> {
        self.accounts().accounts_between(kind, branch, since, until).await
    }

    async fn payments_between(
        &self,
        kind: AccountKind,
        branch: u8,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<AccountPayment>> {
        self.accounts().payments_between(kind, branch, since, until).await
    }
}
