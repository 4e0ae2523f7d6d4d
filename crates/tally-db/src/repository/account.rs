//! # Account Repository
//!
//! Credits, layaways and the abonos paid against them.
//!
//! ```text
//! AccountKind::Credit  ──► credits  ◄── credit_payments
//! AccountKind::Layaway ──► layaways ◄── layaway_payments
//! ```
//! Both families share one row shape, so every method takes the kind and
//! picks the table from it.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use super::{decode_folio, decode_payment, decode_shift_folio, table_name};
use crate::error::DbResult;
use tally_core::{Account, AccountKind, AccountPayment};

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, FromRow)]
struct AccountRow {
    id: String,
    folio: String,
    branch: u8,
    register: u8,
    customer_id: String,
    total_cents: i64,
    shift_folio: Option<String>,
    created_at: DateTime<Utc>,
}

impl AccountRow {
    fn into_account(self, kind: AccountKind) -> DbResult<Account> {
        let entity = kind.document_kind().to_string();
        let folio = decode_folio(&entity, &self.id, self.folio)?;
        let shift_folio = decode_shift_folio(&entity, &self.id, self.shift_folio)?;
        Ok(Account {
            id: self.id,
            kind,
            folio,
            branch: self.branch,
            register: self.register,
            customer_id: self.customer_id,
            total_cents: self.total_cents,
            shift_folio,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct PaymentRow {
    id: String,
    folio: String,
    account_id: String,
    branch: u8,
    register: u8,
    user_id: String,
    amount_cents: i64,
    payment_method: String,
    shift_folio: Option<String>,
    created_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_payment(self, kind: AccountKind) -> DbResult<AccountPayment> {
        let entity = kind.payment_document_kind().to_string();
        let payment = decode_payment(&entity, &self.id, &self.payment_method)?;
        let folio = decode_folio(&entity, &self.id, self.folio)?;
        let shift_folio = decode_shift_folio(&entity, &self.id, self.shift_folio)?;
        Ok(AccountPayment {
            id: self.id,
            account_id: self.account_id,
            account_kind: kind,
            folio,
            branch: self.branch,
            register: self.register,
            user_id: self.user_id,
            amount_cents: self.amount_cents,
            payment,
            shift_folio,
            created_at: self.created_at,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for credit and layaway operations.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    /// Creates a new AccountRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AccountRepository { pool }
    }

    /// Inserts a credit or layaway.
    pub async fn insert_account(&self, account: &Account) -> DbResult<()> {
        debug!(id = %account.id, folio = %account.folio, kind = %account.kind, "Inserting account");

        let table = table_name(account.kind.document_kind());
        sqlx::query(&format!(
            r#"
            INSERT INTO {table} (
                id, folio, branch, register, customer_id,
                total_cents, shift_folio, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#
        ))
        .bind(&account.id)
        .bind(account.folio.as_str())
        .bind(account.branch)
        .bind(account.register)
        .bind(&account.customer_id)
        .bind(account.total_cents)
        .bind(account.shift_folio.as_ref().map(|f| f.as_str()))
        .bind(account.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a credit or layaway by ID.
    pub async fn get_account(&self, kind: AccountKind, id: &str) -> DbResult<Option<Account>> {
        let table = table_name(kind.document_kind());
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            r#"
            SELECT id, folio, branch, register, customer_id,
                   total_cents, shift_folio, created_at
            FROM {table}
            WHERE id = ?1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_account(kind)).transpose()
    }

    /// Accounts of `branch` opened in `[since, until]`, oldest first.
    pub async fn accounts_between(
        &self,
        kind: AccountKind,
        branch: u8,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<Account>> {
        let table = table_name(kind.document_kind());
        let rows: Vec<AccountRow> = sqlx::query_as(&format!(
            r#"
            SELECT id, folio, branch, register, customer_id,
                   total_cents, shift_folio, created_at
            FROM {table}
            WHERE branch = ?1
              AND created_at >= ?2
              AND (?3 IS NULL OR created_at <= ?3)
            ORDER BY created_at, folio
            "#
        ))
        .bind(branch)
        .bind(since)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        debug!(kind = %kind, branch, count = rows.len(), "Loaded accounts");
        rows.into_iter().map(|r| r.into_account(kind)).collect()
    }

    /// Inserts an abono.
    pub async fn insert_payment(&self, payment: &AccountPayment) -> DbResult<()> {
        debug!(
            id = %payment.id,
            folio = %payment.folio,
            account_id = %payment.account_id,
            amount_cents = payment.amount_cents,
            "Inserting abono"
        );

        let table = table_name(payment.account_kind.payment_document_kind());
        sqlx::query(&format!(
            r#"
            INSERT INTO {table} (
                id, folio, account_id, branch, register, user_id,
                amount_cents, payment_method, shift_folio, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#
        ))
        .bind(&payment.id)
        .bind(payment.folio.as_str())
        .bind(&payment.account_id)
        .bind(payment.branch)
        .bind(payment.register)
        .bind(&payment.user_id)
        .bind(payment.amount_cents)
        .bind(payment.payment.encode())
        .bind(payment.shift_folio.as_ref().map(|f| f.as_str()))
        .bind(payment.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Abonos received by `branch` in `[since, until]`, oldest first.
    pub async fn payments_between(
        &self,
        kind: AccountKind,
        branch: u8,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<AccountPayment>> {
        let table = table_name(kind.payment_document_kind());
        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            r#"
            SELECT id, folio, account_id, branch, register, user_id,
                   amount_cents, payment_method, shift_folio, created_at
            FROM {table}
            WHERE branch = ?1
              AND created_at >= ?2
              AND (?3 IS NULL OR created_at <= ?3)
            ORDER BY created_at, folio
            "#
        ))
        .bind(branch)
        .bind(since)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        debug!(kind = %kind, branch, count = rows.len(), "Loaded abonos");
        rows.into_iter().map(|r| r.into_payment(kind)).collect()
    }

    /// Sum of all abonos paid against one account.
    pub async fn paid_total(&self, kind: AccountKind, account_id: &str) -> DbResult<i64> {
        let table = table_name(kind.payment_document_kind());
        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COALESCE(SUM(amount_cents), 0) FROM {table} WHERE account_id = ?1"
        ))
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::test_support::{at, folio, memory_db};
    use tally_core::{FolioKind, Tender, TenderBreakdown};

    fn account(kind: AccountKind, id: &str) -> Account {
        Account {
            id: id.to_string(),
            kind,
            folio: folio(kind.folio_kind(), 1),
            branch: 1,
            register: 1,
            customer_id: "customer-9".to_string(),
            total_cents: 120000,
            shift_folio: None,
            created_at: at(9, 0),
        }
    }

    fn abono(kind: AccountKind, account_id: &str, seq: u32, cents: i64) -> AccountPayment {
        AccountPayment {
            id: format!("abono-{seq}"),
            account_id: account_id.to_string(),
            account_kind: kind,
            folio: folio(FolioKind::Payment, seq),
            branch: 1,
            register: 1,
            user_id: "cashier".to_string(),
            amount_cents: cents,
            payment: TenderBreakdown::Single(Tender::Cash),
            shift_folio: None,
            created_at: at(10, seq),
        }
    }

    #[tokio::test]
    async fn test_accounts_live_in_separate_tables() {
        let db = memory_db().await;
        let repo = db.accounts();
        repo.insert_account(&account(AccountKind::Credit, "cr-1"))
            .await
            .unwrap();
        repo.insert_account(&account(AccountKind::Layaway, "ap-1"))
            .await
            .unwrap();

        assert!(repo
            .get_account(AccountKind::Credit, "cr-1")
            .await
            .unwrap()
            .is_some());
        assert!(repo
            .get_account(AccountKind::Layaway, "cr-1")
            .await
            .unwrap()
            .is_none());

        let layaways = repo
            .accounts_between(AccountKind::Layaway, 1, at(0, 0), None)
            .await
            .unwrap();
        assert_eq!(layaways.len(), 1);
        assert_eq!(layaways[0].kind, AccountKind::Layaway);
        assert!(repo
            .accounts_between(AccountKind::Layaway, 2, at(0, 0), None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_payments_and_paid_total() {
        let db = memory_db().await;
        let repo = db.accounts();
        repo.insert_account(&account(AccountKind::Credit, "cr-1"))
            .await
            .unwrap();
        repo.insert_payment(&abono(AccountKind::Credit, "cr-1", 1, 20000))
            .await
            .unwrap();
        repo.insert_payment(&abono(AccountKind::Credit, "cr-1", 2, 5000))
            .await
            .unwrap();

        let payments = repo
            .payments_between(AccountKind::Credit, 1, at(0, 0), None)
            .await
            .unwrap();
        assert_eq!(payments.len(), 2);
        assert_eq!(payments[0].account_kind, AccountKind::Credit);
        assert!(repo
            .payments_between(AccountKind::Credit, 2, at(0, 0), None)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            repo.paid_total(AccountKind::Credit, "cr-1").await.unwrap(),
            25000
        );
        assert_eq!(
            repo.paid_total(AccountKind::Layaway, "cr-1").await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_payment_requires_existing_account() {
        let db = memory_db().await;
        let err = db
            .accounts()
            .insert_payment(&abono(AccountKind::Layaway, "missing", 1, 100))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
