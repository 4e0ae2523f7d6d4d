//! # Sequence Authority
//!
//! Issues folios. Every request runs behind one gate owned by the authority,
//! so a read-max → format → check → insert sequence is never interleaved with
//! another.
//!
//! ## Counting Policies
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DAILY (V, A, C, P)                                                     │
//! │    counter per (branch, register, kind, local day), resets at midnight │
//! │    P scans credit_payments + layaway_payments together                  │
//! │                                                                         │
//! │  GLOBAL (X)                                                             │
//! │    max sequence over every shift ever opened, any branch, + 1          │
//! │    branch / register / date are display fields only                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Leases
//! [`SequenceAuthority::lease`] returns the folio together with the held
//! gate. The caller inserts its record and then drops the lease; until then
//! no other folio can be issued.
//!
//! ```rust,ignore
//! let lease = authority.lease(1, 1, FolioKind::Sale).await?;
//! store.insert_sale(&sale_with(lease.folio().clone())).await?;
//! drop(lease);
//! ```

use chrono::{DateTime, FixedOffset, Utc};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use tally_core::folio::{folio_prefix, parse_folio, MAX_SEQUENCE};
use tally_core::{CountingPolicy, DocumentKind, Folio, FolioKind};
use tally_db::DbResult;

use crate::clock::{day_window, Clock};
use crate::error::{LedgerError, LedgerResult};
use crate::store::LedgerStore;

// =============================================================================
// Folio Lease
// =============================================================================

/// A freshly issued folio plus the held issuance gate.
///
/// Dropping the lease releases the gate.
#[derive(Debug)]
pub struct FolioLease {
    folio: Folio,
    issued_at: DateTime<FixedOffset>,
    _gate: OwnedMutexGuard<()>,
}

impl FolioLease {
    pub fn folio(&self) -> &Folio {
        &self.folio
    }

    /// The clock reading the folio's date was taken from. Records created
    /// under this lease use it as their timestamp.
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at.with_timezone(&Utc)
    }

    /// Releases the gate and keeps the folio.
    pub fn into_folio(self) -> Folio {
        self.folio
    }
}

// =============================================================================
// Sequence Authority
// =============================================================================

/// Folio issuer. Clones share the same gate.
#[derive(Clone)]
pub struct SequenceAuthority {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    gate: Arc<Mutex<()>>,
    max_collision_retries: u32,
}

impl std::fmt::Debug for SequenceAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceAuthority")
            .field("max_collision_retries", &self.max_collision_retries)
            .finish_non_exhaustive()
    }
}

impl SequenceAuthority {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        clock: Arc<dyn Clock>,
        max_collision_retries: u32,
    ) -> Self {
        SequenceAuthority {
            store,
            clock,
            gate: Arc::new(Mutex::new(())),
            max_collision_retries,
        }
    }

    /// Issues a folio and releases the gate immediately.
    ///
    /// Nothing is reserved: until a record carrying the folio is stored,
    /// every call on the same counter returns the same folio. Concurrent
    /// callers get distinct consecutive sequences only through
    /// [`lease`](Self::lease), inserting the record before the lease drops.
    /// This form suits previews and read-only checks.
    pub async fn generate_folio(
        &self,
        branch: u8,
        register: u8,
        kind: FolioKind,
    ) -> LedgerResult<Folio> {
        Ok(self.lease(branch, register, kind).await?.into_folio())
    }

    /// Issues a folio and keeps the gate until the lease is dropped.
    ///
    /// ## Errors
    /// - `Validation` for a branch or register above 99
    /// - `SequenceOverflow` when the next sequence would exceed 9999
    /// - `FolioExhausted` when every retry collided
    /// - `Persistence` when the uniqueness check itself fails
    pub async fn lease(&self, branch: u8, register: u8, kind: FolioKind) -> LedgerResult<FolioLease> {
        let gate = self.gate.clone().lock_owned().await;
        let now = self.clock.now();
        let folio = self.next_folio(branch, register, kind, now).await?;

        debug!(folio = %folio, kind = %kind, "Folio issued");
        Ok(FolioLease {
            folio,
            issued_at: now,
            _gate: gate,
        })
    }

    async fn next_folio(
        &self,
        branch: u8,
        register: u8,
        kind: FolioKind,
        now: DateTime<FixedOffset>,
    ) -> LedgerResult<Folio> {
        let date = now.date_naive();
        let prefix = folio_prefix(branch, register, date, kind)?;
        let attempts = self.max_collision_retries.saturating_add(1);

        let mut floor = self.highest_sequence(&prefix, kind, now).await;
        for attempt in 1..=attempts {
            let sequence = floor + 1;
            if sequence > MAX_SEQUENCE {
                return Err(LedgerError::SequenceOverflow { kind, prefix });
            }

            let folio = Folio::format(branch, register, date, kind, sequence)?;
            if !self.store.folio_exists(folio.as_str()).await? {
                return Ok(folio);
            }

            warn!(folio = %folio, attempt, "Folio already exists, regenerating");
            // A rescan may see records the first scan missed; never step back.
            floor = self.highest_sequence(&prefix, kind, now).await.max(sequence);
        }

        Err(LedgerError::FolioExhausted { kind, attempts })
    }

    /// Highest sequence already used by the counter `kind` belongs to.
    ///
    /// A failed scan counts as zero.
    async fn highest_sequence(&self, prefix: &str, kind: FolioKind, now: DateTime<FixedOffset>) -> u32 {
        let folios = match self.scan(prefix, kind, now).await {
            Ok(folios) => folios,
            Err(e) => {
                warn!(error = %e, kind = %kind, prefix = %prefix, "Folio scan failed, counting from zero");
                return 0;
            }
        };

        folios
            .iter()
            .filter_map(|raw| match parse_folio(raw) {
                Ok(parts) if parts.kind == kind => Some(parts.sequence),
                Ok(_) => None,
                Err(e) => {
                    warn!(folio = %raw, error = %e, "Skipping malformed folio");
                    None
                }
            })
            .max()
            .unwrap_or(0)
    }

    async fn scan(&self, prefix: &str, kind: FolioKind, now: DateTime<FixedOffset>) -> DbResult<Vec<String>> {
        match kind.policy() {
            CountingPolicy::Daily => {
                let (from, until) = day_window(now);
                let mut folios = Vec::new();
                for family in DocumentKind::sharing_counter(kind) {
                    folios.extend(
                        self.store
                            .folios_with_prefix(*family, prefix, from, until)
                            .await?,
                    );
                }
                Ok(folios)
            }
            CountingPolicy::Global => {
                let mut folios = Vec::new();
                for family in DocumentKind::sharing_counter(kind) {
                    folios.extend(self.store.all_folios(*family).await?);
                }
                Ok(folios)
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::TimeZone;
    use tally_db::{Database, DbConfig};

    async fn authority(retries: u32) -> (SequenceAuthority, Database) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tz = FixedOffset::west_opt(6 * 3600).unwrap();
        let clock = FixedClock::new(tz.with_ymd_and_hms(2026, 10, 19, 10, 0, 0).unwrap());
        let authority = SequenceAuthority::new(Arc::new(db.clone()), Arc::new(clock), retries);
        (authority, db)
    }

    #[tokio::test]
    async fn test_first_folio_of_the_day() {
        let (authority, _db) = authority(8).await;
        let folio = authority.generate_folio(2, 3, FolioKind::Sale).await.unwrap();
        assert_eq!(folio.as_str(), "020319102026V0001");
    }

    #[tokio::test]
    async fn test_station_out_of_range_is_validation() {
        let (authority, _db) = authority(8).await;
        let err = authority
            .generate_folio(100, 1, FolioKind::Sale)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unstored_folios_are_not_reserved() {
        let (authority, _db) = authority(8).await;
        let first = authority.generate_folio(1, 1, FolioKind::Sale).await.unwrap();
        let second = authority.generate_folio(1, 1, FolioKind::Sale).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second.sequence(), 1);
    }

    #[tokio::test]
    async fn test_lease_holds_gate() {
        let (authority, _db) = authority(8).await;
        let lease = authority.lease(1, 1, FolioKind::Credit).await.unwrap();
        assert!(authority.gate.try_lock().is_err());
        drop(lease);
        assert!(authority.gate.try_lock().is_ok());
    }
}
