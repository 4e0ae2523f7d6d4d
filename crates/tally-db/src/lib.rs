//! # tally-db: Database Layer for Tally
//!
//! This crate provides SQLite persistence for the ledger.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      tally-db Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    tally-engine                                 │   │
//! │  │        LedgerStore impl for Database                            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (THIS CRATE)                         │   │
//! │  │                                                                 │   │
//! │  │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────┐  │   │
//! │  │  │    Pool      │  │  Migrations  │  │    Repositories      │  │   │
//! │  │  │  (SqlitePool)│  │  (embedded)  │  │  Shift, Movement,    │  │   │
//! │  │  │              │  │              │  │  Sale, Account,      │  │   │
//! │  │  │              │  │              │  │  Folio               │  │   │
//! │  │  └──────────────┘  └──────────────┘  └──────────────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │                                ▼                                        │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    SQLite Database                              │   │
//! │  │  WAL mode, foreign keys, UNIQUE folio columns                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./ledger.db")).await?;
//! let open = db.shifts().find_open(1).await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::account::AccountRepository;
pub use repository::folio::FolioRepository;
pub use repository::movement::MovementRepository;
pub use repository::sale::SaleRepository;
pub use repository::shift::{ShiftRepository, StampCounts};
