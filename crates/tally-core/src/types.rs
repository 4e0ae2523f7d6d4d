//! # Domain Types
//!
//! Records the ledger reads and writes.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Ledger Records                                 │
//! │                                                                         │
//! │  CashShift ─────────┬── CashMovement (expense | income)                 │
//! │  (folio kind X)     │                                                   │
//! │                     │  stamped at close (shift_folio)                   │
//! │                     ├── Sale            (folio kind V)                  │
//! │                     ├── AccountPayment  (folio kind P, credit abono)    │
//! │                     └── AccountPayment  (folio kind P, layaway abono)   │
//! │                                                                         │
//! │  Account (credit, folio kind C | layaway, folio kind A)                 │
//! │    counted at face value in the productivity total                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every record has:
//! - `id`: UUID v4, used for relations
//! - `folio`: the human-readable document number printed on receipts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::folio::{Folio, FolioKind};
use crate::money::Money;
use crate::reconciliation::CloseSummary;
use crate::tender::{Tender, TenderBreakdown};

// =============================================================================
// Document Kind
// =============================================================================

/// Every folio-bearing record family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Sale,
    Credit,
    Layaway,
    CreditPayment,
    LayawayPayment,
    Shift,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 6] = [
        DocumentKind::Sale,
        DocumentKind::Credit,
        DocumentKind::Layaway,
        DocumentKind::CreditPayment,
        DocumentKind::LayawayPayment,
        DocumentKind::Shift,
    ];

    /// Families that get stamped with the closing shift folio.
    pub const SETTLED: [DocumentKind; 3] = [
        DocumentKind::Sale,
        DocumentKind::CreditPayment,
        DocumentKind::LayawayPayment,
    ];

    /// The folio letter this family carries.
    pub const fn folio_kind(&self) -> FolioKind {
        match self {
            DocumentKind::Sale => FolioKind::Sale,
            DocumentKind::Credit => FolioKind::Credit,
            DocumentKind::Layaway => FolioKind::Layaway,
            DocumentKind::CreditPayment | DocumentKind::LayawayPayment => FolioKind::Payment,
            DocumentKind::Shift => FolioKind::Close,
        }
    }

    /// Families whose folios feed one counter.
    ///
    /// Payment is the only letter shared by two tables.
    pub fn sharing_counter(kind: FolioKind) -> &'static [DocumentKind] {
        match kind {
            FolioKind::Sale => &[DocumentKind::Sale],
            FolioKind::Credit => &[DocumentKind::Credit],
            FolioKind::Layaway => &[DocumentKind::Layaway],
            FolioKind::Payment => &[DocumentKind::CreditPayment, DocumentKind::LayawayPayment],
            FolioKind::Close => &[DocumentKind::Shift],
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentKind::Sale => "sale",
            DocumentKind::Credit => "credit",
            DocumentKind::Layaway => "layaway",
            DocumentKind::CreditPayment => "credit payment",
            DocumentKind::LayawayPayment => "layaway payment",
            DocumentKind::Shift => "shift",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Cash Shift
// =============================================================================

/// Lifecycle state of a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    Open,
    Closed,
}

/// One open-to-close cycle of a register.
///
/// ## Open Marker
/// A shift is OPEN while `closed_at == opened_at`. Closing moves `closed_at`
/// forward exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CashShift {
    pub id: String,
    #[cfg_attr(feature = "sqlx", sqlx(try_from = "String"))]
    pub folio: Folio,
    pub branch: u8,
    pub register: u8,
    pub cashier_id: String,
    pub opening_cents: i64,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,

    // Sales attributed per tender
    pub cash_sales_cents: i64,
    pub debit_sales_cents: i64,
    pub credit_sales_cents: i64,
    pub transfer_sales_cents: i64,
    pub check_sales_cents: i64,
    pub total_sales_cents: i64,

    // Productivity: sales + credits + layaways at face value
    pub productivity_cents: i64,
    pub credits_created_cents: i64,
    pub layaways_created_cents: i64,

    // Cash actually collected on abonos
    pub credit_cash_cents: i64,
    pub layaway_cash_cents: i64,

    pub expenses_cents: i64,
    pub income_cents: i64,
    pub expected_cash_cents: i64,
    pub declared_cash_cents: i64,
    /// declared − expected. Positive = overage, negative = shortage.
    pub surplus_cents: i64,

    /// JSON array of expense movements, frozen at close.
    pub expense_breakdown: String,
    /// JSON array of income movements, frozen at close.
    pub income_breakdown: String,
    pub notes: Option<String>,
}

impl CashShift {
    /// A freshly opened shift with zeroed totals.
    pub fn open(
        id: String,
        folio: Folio,
        branch: u8,
        register: u8,
        cashier_id: String,
        opening: Money,
        now: DateTime<Utc>,
    ) -> Self {
        CashShift {
            id,
            folio,
            branch,
            register,
            cashier_id,
            opening_cents: opening.cents(),
            opened_at: now,
            closed_at: now,
            cash_sales_cents: 0,
            debit_sales_cents: 0,
            credit_sales_cents: 0,
            transfer_sales_cents: 0,
            check_sales_cents: 0,
            total_sales_cents: 0,
            productivity_cents: 0,
            credits_created_cents: 0,
            layaways_created_cents: 0,
            credit_cash_cents: 0,
            layaway_cash_cents: 0,
            expenses_cents: 0,
            income_cents: 0,
            expected_cash_cents: 0,
            declared_cash_cents: 0,
            surplus_cents: 0,
            expense_breakdown: "[]".to_string(),
            income_breakdown: "[]".to_string(),
            notes: None,
        }
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.closed_at == self.opened_at
    }

    pub fn status(&self) -> ShiftStatus {
        if self.is_open() {
            ShiftStatus::Open
        } else {
            ShiftStatus::Closed
        }
    }

    #[inline]
    pub fn opening(&self) -> Money {
        Money::from_cents(self.opening_cents)
    }

    #[inline]
    pub fn expected_cash(&self) -> Money {
        Money::from_cents(self.expected_cash_cents)
    }

    #[inline]
    pub fn surplus(&self) -> Money {
        Money::from_cents(self.surplus_cents)
    }

    /// Sales attributed to one tender.
    pub fn tender_sales(&self, tender: Tender) -> Money {
        Money::from_cents(match tender {
            Tender::Cash => self.cash_sales_cents,
            Tender::Debit => self.debit_sales_cents,
            Tender::Credit => self.credit_sales_cents,
            Tender::Transfer => self.transfer_sales_cents,
            Tender::Check => self.check_sales_cents,
        })
    }

    /// Writes a close summary onto the shift (OPEN → CLOSED).
    ///
    /// `closed_at` must differ from `opened_at` or the shift would still read
    /// as open; callers bump it by a microsecond when the clock has not moved.
    pub fn apply_close(
        &mut self,
        summary: &CloseSummary,
        closed_at: DateTime<Utc>,
        notes: Option<String>,
    ) {
        self.cash_sales_cents = summary.cash_sales.cents();
        self.debit_sales_cents = summary.debit_sales.cents();
        self.credit_sales_cents = summary.credit_sales.cents();
        self.transfer_sales_cents = summary.transfer_sales.cents();
        self.check_sales_cents = summary.check_sales.cents();
        self.total_sales_cents = summary.total_sales.cents();
        self.productivity_cents = summary.productivity.cents();
        self.credits_created_cents = summary.credits_created.cents();
        self.layaways_created_cents = summary.layaways_created.cents();
        self.credit_cash_cents = summary.credit_cash.cents();
        self.layaway_cash_cents = summary.layaway_cash.cents();
        self.expenses_cents = summary.expenses.cents();
        self.income_cents = summary.income.cents();
        self.expected_cash_cents = summary.expected_cash.cents();
        self.declared_cash_cents = summary.declared_cash.cents();
        self.surplus_cents = summary.surplus.cents();
        self.expense_breakdown = summary.expense_breakdown.clone();
        self.income_breakdown = summary.income_breakdown.clone();
        self.closed_at = closed_at;
        if notes.is_some() {
            self.notes = notes;
        }
    }
}

// =============================================================================
// Cash Movement
// =============================================================================

/// Direction of a manual drawer movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Cash taken out of the drawer (supplies, courier, ...).
    Expense,
    /// Cash put into the drawer outside of a sale.
    Income,
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MovementKind::Expense => write!(f, "expense"),
            MovementKind::Income => write!(f, "income"),
        }
    }
}

/// A manual cash movement tied to a shift. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CashMovement {
    pub id: String,
    pub shift_id: String,
    pub kind: MovementKind,
    pub concept: String,
    pub amount_cents: i64,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl CashMovement {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A completed sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: String,
    pub folio: Folio,
    pub branch: u8,
    pub register: u8,
    pub cashier_id: String,
    /// Face value of the sale. This is what gets attributed to tenders.
    pub total_cents: i64,
    /// What the customer handed over. Change is implicit and never subtracted.
    pub tendered_cents: i64,
    pub payment: TenderBreakdown,
    pub shift_folio: Option<Folio>,
    pub created_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Accounts (credits and layaways)
// =============================================================================

/// Which kind of deferred-payment account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Credit,
    /// Apartado: goods held until paid off.
    Layaway,
}

impl AccountKind {
    pub const fn folio_kind(&self) -> FolioKind {
        match self {
            AccountKind::Credit => FolioKind::Credit,
            AccountKind::Layaway => FolioKind::Layaway,
        }
    }

    pub const fn document_kind(&self) -> DocumentKind {
        match self {
            AccountKind::Credit => DocumentKind::Credit,
            AccountKind::Layaway => DocumentKind::Layaway,
        }
    }

    /// Table family holding abonos against this kind of account.
    pub const fn payment_document_kind(&self) -> DocumentKind {
        match self {
            AccountKind::Credit => DocumentKind::CreditPayment,
            AccountKind::Layaway => DocumentKind::LayawayPayment,
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountKind::Credit => write!(f, "credit"),
            AccountKind::Layaway => write!(f, "layaway"),
        }
    }
}

/// A credit or layaway opened for a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub kind: AccountKind,
    pub folio: Folio,
    pub branch: u8,
    pub register: u8,
    pub customer_id: String,
    /// Face value, counted in full toward productivity.
    pub total_cents: i64,
    pub shift_folio: Option<Folio>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// An abono against a credit or layaway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPayment {
    pub id: String,
    pub account_id: String,
    pub account_kind: AccountKind,
    pub folio: Folio,
    pub branch: u8,
    pub register: u8,
    pub user_id: String,
    pub amount_cents: i64,
    pub payment: TenderBreakdown,
    pub shift_folio: Option<Folio>,
    pub created_at: DateTime<Utc>,
}

impl AccountPayment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
