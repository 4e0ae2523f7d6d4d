//! # Repository Module
//!
//! Database repository implementations for the ledger.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  tally-engine (LedgerStore impl)                                       │
//! │       │                                                                 │
//! │       │  db.sales().list_between(branch, since, until)                 │
//! │       ▼                                                                 │
//! │  SaleRepository                                                        │
//! │  ├── insert(&self, sale)                                               │
//! │  ├── get_by_id(&self, id)                                              │
//! │  └── list_between(&self, branch, since, until)                         │
//! │       │                                                                 │
//! │       │  SQL Query → Row → TryFrom → domain record                     │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ShiftRepository`](shift::ShiftRepository) - Shifts and the close transaction
//! - [`MovementRepository`](movement::MovementRepository) - Manual cash movements
//! - [`SaleRepository`](sale::SaleRepository) - Sales
//! - [`AccountRepository`](account::AccountRepository) - Credits, layaways and abonos
//! - [`FolioRepository`](folio::FolioRepository) - Cross-table folio lookups

pub mod account;
pub mod folio;
pub mod movement;
pub mod sale;
pub mod shift;

use tally_core::{DocumentKind, Folio, TenderBreakdown};

use crate::error::{DbError, DbResult};

/// Table holding records of one document family.
pub(crate) const fn table_name(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Sale => "sales",
        DocumentKind::Credit => "credits",
        DocumentKind::Layaway => "layaways",
        DocumentKind::CreditPayment => "credit_payments",
        DocumentKind::LayawayPayment => "layaway_payments",
        DocumentKind::Shift => "cash_shifts",
    }
}

/// Column holding the creation timestamp of one document family.
pub(crate) const fn timestamp_column(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Shift => "opened_at",
        _ => "created_at",
    }
}

pub(crate) fn decode_folio(entity: &str, id: &str, raw: String) -> DbResult<Folio> {
    Folio::try_from(raw).map_err(|e| DbError::invalid_data(entity, id, e))
}

/// Empty strings count as "not stamped yet".
pub(crate) fn decode_shift_folio(
    entity: &str,
    id: &str,
    raw: Option<String>,
) -> DbResult<Option<Folio>> {
    match raw {
        Some(raw) if !raw.trim().is_empty() => decode_folio(entity, id, raw).map(Some),
        _ => Ok(None),
    }
}

pub(crate) fn decode_payment(entity: &str, id: &str, raw: &str) -> DbResult<TenderBreakdown> {
    TenderBreakdown::decode(raw).map_err(|e| DbError::invalid_data(entity, id, e))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_shift_folio_is_unstamped() {
        assert_eq!(decode_shift_folio("Sale", "s1", None).unwrap(), None);
        assert_eq!(
            decode_shift_folio("Sale", "s1", Some(String::new())).unwrap(),
            None
        );
        assert!(decode_shift_folio("Sale", "s1", Some("bogus".to_string())).is_err());
    }

    #[test]
    fn test_payment_shared_between_tables() {
        assert_ne!(
            table_name(DocumentKind::CreditPayment),
            table_name(DocumentKind::LayawayPayment)
        );
        assert_eq!(timestamp_column(DocumentKind::Shift), "opened_at");
    }
}
