//! # tally-core: Pure Ledger Logic for Tally
//!
//! Folio numbering rules, tender decoding and shift totals, as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    tally-engine                                 │   │
//! │  │   SequenceAuthority ──► DocumentRecorder ──► Reconciliation     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌────────────┐  │   │
//! │  │   │   folio   │  │  tender   │  │   money   │  │reconcilia- │  │   │
//! │  │   │  Folio    │  │ Breakdown │  │   Money   │  │tion totals │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`folio`] - Folio layout, parsing and counting policy
//! - [`tender`] - Payment-method decoding (single and mixed tenders)
//! - [`money`] - Money type with integer cents
//! - [`reconciliation`] - Shift totals, expected cash and surplus
//! - [`types`] - Domain records (shifts, movements, sales, accounts)
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use tally_core::folio::{Folio, FolioKind};
//!
//! let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
//! let folio = Folio::format(1, 2, date, FolioKind::Sale, 7).unwrap();
//! assert_eq!(folio.as_str(), "010219102026V0007");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod folio;
pub mod money;
pub mod reconciliation;
pub mod tender;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use folio::{CountingPolicy, Folio, FolioKind, FolioParts};
pub use money::Money;
pub use reconciliation::{CloseSummary, ShiftActivity, ShiftTotals};
pub use tender::{Tender, TenderBreakdown};
pub use types::*;
