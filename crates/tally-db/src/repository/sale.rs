//! # Sale Repository
//!
//! Database operations for completed sales.
//!
//! ## Sale Lifecycle (ledger view)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. RECORD                                                              │
//! │     └── insert() under a folio lease → shift_folio = NULL              │
//! │                                                                         │
//! │  2. RECONCILE                                                           │
//! │     └── list_between(branch, opened_at, ..) feeds the shift totals     │
//! │                                                                         │
//! │  3. STAMP                                                               │
//! │     └── shift close sets shift_folio once (ShiftRepository)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use super::{decode_folio, decode_payment, decode_shift_folio};
use crate::error::{DbError, DbResult};
use tally_core::Sale;

/// Row shape of the `sales` table.
#[derive(Debug, FromRow)]
struct SaleRow {
    id: String,
    folio: String,
    branch: u8,
    register: u8,
    cashier_id: String,
    total_cents: i64,
    tendered_cents: i64,
    payment_method: String,
    shift_folio: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SaleRow> for Sale {
    type Error = DbError;

    fn try_from(row: SaleRow) -> DbResult<Self> {
        let payment = decode_payment("Sale", &row.id, &row.payment_method)?;
        let folio = decode_folio("Sale", &row.id, row.folio)?;
        let shift_folio = decode_shift_folio("Sale", &row.id, row.shift_folio)?;
        Ok(Sale {
            id: row.id,
            folio,
            branch: row.branch,
            register: row.register,
            cashier_id: row.cashier_id,
            total_cents: row.total_cents,
            tendered_cents: row.tendered_cents,
            payment,
            shift_folio,
            created_at: row.created_at,
        })
    }
}

const SELECT_SALE: &str = r#"
    SELECT
        id, folio, branch, register, cashier_id,
        total_cents, tendered_cents, payment_method,
        shift_folio, created_at
    FROM sales
"#;

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Inserts a sale.
    pub async fn insert(&self, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, folio = %sale.folio, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, folio, branch, register, cashier_id,
                total_cents, tendered_cents, payment_method,
                shift_folio, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&sale.id)
        .bind(sale.folio.as_str())
        .bind(sale.branch)
        .bind(sale.register)
        .bind(&sale.cashier_id)
        .bind(sale.total_cents)
        .bind(sale.tendered_cents)
        .bind(sale.payment.encode())
        .bind(sale.shift_folio.as_ref().map(|f| f.as_str()))
        .bind(sale.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let row: Option<SaleRow> = sqlx::query_as(&format!("{SELECT_SALE} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Sale::try_from).transpose()
    }

    /// Sales of `branch` created in `[since, until]` (open-ended when `until`
    /// is None), oldest first.
    pub async fn list_between(
        &self,
        branch: u8,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<Sale>> {
        let rows: Vec<SaleRow> = sqlx::query_as(&format!(
            "{SELECT_SALE} WHERE branch = ?1 AND created_at >= ?2 \
             AND (?3 IS NULL OR created_at <= ?3) \
             ORDER BY created_at, folio"
        ))
        .bind(branch)
        .bind(since)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        debug!(branch, count = rows.len(), since = %since, "Loaded sales");
        rows.into_iter().map(Sale::try_from).collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
