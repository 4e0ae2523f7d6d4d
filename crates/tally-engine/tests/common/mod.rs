//! Shared fixtures for the engine scenarios.
//!
//! Every scenario runs against a fresh in-memory database and a
//! [`FixedClock`] pinned to 2026-10-19 at UTC-6.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tally_core::{
    Account, AccountKind, AccountPayment, CashMovement, CashShift, DocumentKind, Sale,
};
use tally_db::{Database, DbConfig, DbError, DbResult, StampCounts};
use tally_engine::{Clock, FixedClock, Ledger, LedgerConfig, LedgerStore};

pub fn local(hour: u32, minute: u32) -> DateTime<FixedOffset> {
    FixedOffset::west_opt(6 * 3600)
        .unwrap()
        .with_ymd_and_hms(2026, 10, 19, hour, minute, 0)
        .unwrap()
}

pub async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// A ledger over an in-memory database, with handles to both.
pub struct Harness {
    pub db: Database,
    pub clock: FixedClock,
    pub ledger: Ledger,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(LedgerConfig::default()).await
    }

    pub async fn with_config(config: LedgerConfig) -> Self {
        let db = memory_db().await;
        let clock = FixedClock::new(local(8, 0));
        let ledger = Ledger::with_store(
            Arc::new(db.clone()),
            Arc::new(clock.clone()) as Arc<dyn Clock>,
            &config,
        );
        Harness { db, clock, ledger }
    }

    /// A second terminal on `branch` sharing this harness's database and clock.
    pub fn till(&self, branch: u8) -> Ledger {
        let mut config = LedgerConfig::default();
        config.terminal.branch = branch;
        Ledger::with_store(
            Arc::new(self.db.clone()),
            Arc::new(self.clock.clone()) as Arc<dyn Clock>,
            &config,
        )
    }
}

// =============================================================================
// Fault-injecting store
// =============================================================================

/// Wraps a [`Database`] and fails or lies on demand.
pub struct FaultyStore {
    pub inner: Database,
    /// Prefix and global scans return an error.
    pub fail_scans: AtomicBool,
    /// The uniqueness check returns an error.
    pub fail_exists: AtomicBool,
    /// `commit_close` returns an error without touching the database.
    pub fail_commit: AtomicBool,
    /// Folios reported as taken even though nothing stores them.
    pub phantom: Mutex<HashSet<String>>,
    /// Extra raw values returned by every scan.
    pub scan_noise: Mutex<Vec<String>>,
}

impl FaultyStore {
    pub fn new(inner: Database) -> Self {
        FaultyStore {
            inner,
            fail_scans: AtomicBool::new(false),
            fail_exists: AtomicBool::new(false),
            fail_commit: AtomicBool::new(false),
            phantom: Mutex::new(HashSet::new()),
            scan_noise: Mutex::new(Vec::new()),
        }
    }

    fn tripped(flag: &AtomicBool, what: &str) -> DbResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(DbError::QueryFailed(format!("injected {} failure", what)));
        }
        Ok(())
    }

    fn noise(&self) -> Vec<String> {
        self.scan_noise.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerStore for FaultyStore {
    async fn folios_with_prefix(
        &self,
        kind: DocumentKind,
        prefix: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> DbResult<Vec<String>> {
        Self::tripped(&self.fail_scans, "scan")?;
        let mut folios = self.inner.folios_with_prefix(kind, prefix, from, until).await?;
        folios.extend(self.noise());
        Ok(folios)
    }

    async fn all_folios(&self, kind: DocumentKind) -> DbResult<Vec<String>> {
        Self::tripped(&self.fail_scans, "scan")?;
        let mut folios = self.inner.all_folios(kind).await?;
        folios.extend(self.noise());
        Ok(folios)
    }

    async fn folio_exists(&self, folio: &str) -> DbResult<bool> {
        Self::tripped(&self.fail_exists, "uniqueness check")?;
        if self.phantom.lock().unwrap().contains(folio) {
            return Ok(true);
        }
        self.inner.folio_exists(folio).await
    }

    async fn open_shift_for_branch(&self, branch: u8) -> DbResult<Option<CashShift>> {
        self.inner.open_shift_for_branch(branch).await
    }

    async fn insert_shift(&self, shift: &CashShift) -> DbResult<()> {
        self.inner.insert_shift(shift).await
    }

    async fn find_shift(&self, id: &str) -> DbResult<Option<CashShift>> {
        self.inner.find_shift(id).await
    }

    async fn commit_close(
        &self,
        shift: &CashShift,
        since: DateTime<Utc>,
    ) -> DbResult<StampCounts> {
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(DbError::TransactionFailed("injected commit failure".to_string()));
        }
        self.inner.commit_close(shift, since).await
    }

    async fn insert_movement(&self, movement: &CashMovement) -> DbResult<()> {
        self.inner.insert_movement(movement).await
    }

    async fn shift_movements(&self, shift_id: &str) -> DbResult<Vec<CashMovement>> {
        self.inner.shift_movements(shift_id).await
    }

    async fn insert_sale(&self, sale: &Sale) -> DbResult<()> {
        self.inner.insert_sale(sale).await
    }

    async fn insert_account(&self, account: &Account) -> DbResult<()> {
        self.inner.insert_account(account).await
    }

    async fn find_account(&self, kind: AccountKind, id: &str) -> DbResult<Option<Account>> {
        self.inner.find_account(kind, id).await
    }

    async fn insert_account_payment(&self, payment: &AccountPayment) -> DbResult<()> {
        self.inner.insert_account_payment(payment).await
    }

    async fn sales_between(
        &self,
        branch: u8,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<Sale>> {
        self.inner.sales_between(branch, since, until).await
    }

    async fn accounts_between(
        &self,
        kind: AccountKind,
        branch: u8,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<Account>> {
        self.inner.accounts_between(kind, branch, since, until).await
    }

    async fn payments_between(
        &self,
        kind: AccountKind,
        branch: u8,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<AccountPayment>> {
        self.inner.payments_between(kind, branch, since, until).await
    }
}

/// A ledger over a [`FaultyStore`].
pub struct FaultyHarness {
    pub store: Arc<FaultyStore>,
    pub clock: FixedClock,
    pub ledger: Ledger,
}

impl FaultyHarness {
    pub async fn new(config: LedgerConfig) -> Self {
        let store = Arc::new(FaultyStore::new(memory_db().await));
        let clock = FixedClock::new(local(8, 0));
        let ledger = Ledger::with_store(
            store.clone() as Arc<dyn LedgerStore>,
            Arc::new(clock.clone()) as Arc<dyn Clock>,
            &config,
        );
        FaultyHarness {
            store,
            clock,
            ledger,
        }
    }
}
