//! # Tally Engine
//!
//! Folio issuance and shift reconciliation over a [`LedgerStore`].
//!
//! ## Module Organization
//! ```text
//! tally_engine/
//! ├── lib.rs             ◄─── You are here (exports, tracing setup)
//! ├── clock.rs           ◄─── Clock trait, system and fixed clocks
//! ├── config.rs          ◄─── ledger.toml + TALLY_* overrides
//! ├── documents.rs       ◄─── Sales, credits, layaways, abonos
//! ├── error.rs           ◄─── LedgerError, ErrorCode, ErrorResponse
//! ├── ledger.rs          ◄─── Service wiring
//! ├── reconciliation.rs  ◄─── Shift open / movements / close
//! ├── sequence.rs        ◄─── Folio issuance behind one gate
//! └── store.rs           ◄─── LedgerStore trait, SQLite impl
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! let config = LedgerConfig::load(None)?;
//! let ledger = Ledger::open(&config).await?;
//!
//! let shift = ledger.reconciliation().open_shift(1, Money::from_major_minor(500, 0), "ana").await?;
//! ledger.documents().record_sale("ana", total, tendered, payment).await?;
//! let closed = ledger.reconciliation().close_shift(&shift.id, declared, None).await?;
//! ```

pub mod clock;
pub mod config;
pub mod documents;
pub mod error;
pub mod ledger;
pub mod reconciliation;
pub mod sequence;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{LedgerConfig, TerminalConfig};
pub use documents::DocumentRecorder;
pub use error::{CloseStep, ErrorCode, ErrorResponse, LedgerError, LedgerResult};
pub use ledger::Ledger;
pub use reconciliation::{ClosedShift, ReconciliationEngine};
pub use sequence::{FolioLease, SequenceAuthority};
pub use store::LedgerStore;

use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=tally=trace` - Show trace for tally crates only
/// - Default: INFO, DEBUG for tally crates
///
/// Calling it twice is harmless; the second call returns an error that is
/// ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tally=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
