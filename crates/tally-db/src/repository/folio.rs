//! # Folio Lookups
//!
//! Read-only queries that span every folio-bearing table. These back the
//! sequence scan and the uniqueness check of folio issuance.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use super::{table_name, timestamp_column};
use crate::error::DbResult;
use tally_core::folio::FOLIO_PREFIX_LEN;
use tally_core::DocumentKind;

/// Repository for cross-table folio queries.
#[derive(Debug, Clone)]
pub struct FolioRepository {
    pool: SqlitePool,
}

impl FolioRepository {
    /// Creates a new FolioRepository.
    pub fn new(pool: SqlitePool) -> Self {
        FolioRepository { pool }
    }

    /// Folios of one family that start with `prefix` and were created in
    /// `[from, until)`.
    pub async fn with_prefix_between(
        &self,
        kind: DocumentKind,
        prefix: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> DbResult<Vec<String>> {
        let table = table_name(kind);
        let column = timestamp_column(kind);
        let folios: Vec<String> = sqlx::query_scalar(&format!(
            r#"
            SELECT folio FROM {table}
            WHERE substr(folio, 1, {FOLIO_PREFIX_LEN}) = ?1
              AND {column} >= ?2
              AND {column} < ?3
            "#
        ))
        .bind(prefix)
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        debug!(kind = %kind, prefix = %prefix, found = folios.len(), "Scanned folios");
        Ok(folios)
    }

    /// Every folio ever stored for one family.
    pub async fn all(&self, kind: DocumentKind) -> DbResult<Vec<String>> {
        let table = table_name(kind);
        let folios: Vec<String> = sqlx::query_scalar(&format!("SELECT folio FROM {table}"))
            .fetch_all(&self.pool)
            .await?;

        debug!(kind = %kind, found = folios.len(), "Scanned all folios");
        Ok(folios)
    }

    /// True when `folio` is present in any folio-bearing table.
    pub async fn exists(&self, folio: &str) -> DbResult<bool> {
        let union = DocumentKind::ALL
            .iter()
            .map(|kind| format!("SELECT 1 FROM {} WHERE folio = ?1", table_name(*kind)))
            .collect::<Vec<_>>()
            .join(" UNION ALL ");

        let found: bool = sqlx::query_scalar(&format!("SELECT EXISTS({union})"))
            .bind(folio)
            .fetch_one(&self.pool)
            .await?;

        Ok(found)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{at, day, folio, memory_db};
    use tally_core::folio::folio_prefix;
    use tally_core::{CashShift, FolioKind, Money, Sale, Tender, TenderBreakdown};

    fn sale(seq: u32, hour: u32) -> Sale {
        Sale {
            id: format!("sale-{seq}"),
            folio: folio(FolioKind::Sale, seq),
            branch: 1,
            register: 1,
            cashier_id: "cashier".to_string(),
            total_cents: 500,
            tendered_cents: 500,
            payment: TenderBreakdown::Single(Tender::Cash),
            shift_folio: None,
            created_at: at(hour, 0),
        }
    }

    #[tokio::test]
    async fn test_prefix_scan_respects_window() {
        let db = memory_db().await;
        db.sales().insert(&sale(1, 9)).await.unwrap();
        db.sales().insert(&sale(2, 15)).await.unwrap();

        let prefix = folio_prefix(1, 1, day(), FolioKind::Sale).unwrap();
        let all_day = db
            .folios()
            .with_prefix_between(DocumentKind::Sale, &prefix, at(0, 0), at(23, 59))
            .await
            .unwrap();
        assert_eq!(all_day.len(), 2);

        let morning = db
            .folios()
            .with_prefix_between(DocumentKind::Sale, &prefix, at(0, 0), at(12, 0))
            .await
            .unwrap();
        assert_eq!(morning, vec![folio(FolioKind::Sale, 1).into_string()]);

        let other_register = folio_prefix(1, 2, day(), FolioKind::Sale).unwrap();
        assert!(db
            .folios()
            .with_prefix_between(DocumentKind::Sale, &other_register, at(0, 0), at(23, 59))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_exists_checks_every_table() {
        let db = memory_db().await;
        let shift = CashShift::open(
            "s1".to_string(),
            folio(FolioKind::Close, 4),
            1,
            1,
            "cashier".to_string(),
            Money::zero(),
            at(8, 0),
        );
        db.shifts().insert(&shift).await.unwrap();
        db.sales().insert(&sale(1, 9)).await.unwrap();

        assert!(db.folios().exists(shift.folio.as_str()).await.unwrap());
        assert!(db
            .folios()
            .exists(folio(FolioKind::Sale, 1).as_str())
            .await
            .unwrap());
        assert!(!db
            .folios()
            .exists(folio(FolioKind::Sale, 2).as_str())
            .await
            .unwrap());
        assert_eq!(db.folios().all(DocumentKind::Shift).await.unwrap().len(), 1);
    }
}
