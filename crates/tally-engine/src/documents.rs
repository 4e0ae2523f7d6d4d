//! # Document Recorder
//!
//! Creates the folio-bearing documents a shift later reconciles: sales,
//! credits, layaways and abonos.
//!
//! Each call validates, leases a folio, inserts while the lease is held and
//! returns the record unstamped (`shift_folio = None`). The shift folio is
//! written later, when the shift covering the record closes.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use tally_core::validation::{
    validate_non_negative_amount, validate_positive_amount, validate_required,
};
use tally_core::{
    Account, AccountKind, AccountPayment, FolioKind, Money, Sale, TenderBreakdown,
    ValidationError,
};

use crate::config::TerminalConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::sequence::SequenceAuthority;
use crate::store::LedgerStore;

/// Writes new documents for one terminal.
#[derive(Clone)]
pub struct DocumentRecorder {
    store: Arc<dyn LedgerStore>,
    sequence: SequenceAuthority,
    terminal: TerminalConfig,
}

impl DocumentRecorder {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        sequence: SequenceAuthority,
        terminal: TerminalConfig,
    ) -> Self {
        DocumentRecorder {
            store,
            sequence,
            terminal,
        }
    }

    pub fn terminal(&self) -> TerminalConfig {
        self.terminal
    }

    /// Records a completed sale.
    ///
    /// `tendered` is what the customer handed over; change is not stored.
    pub async fn record_sale(
        &self,
        cashier_id: &str,
        total: Money,
        tendered: Money,
        payment: TenderBreakdown,
    ) -> LedgerResult<Sale> {
        validate_required("cashier", cashier_id)?;
        validate_positive_amount("sale total", total)?;
        validate_non_negative_amount("tendered amount", tendered)?;
        validate_breakdown(&payment)?;

        let lease = self
            .sequence
            .lease(self.terminal.branch, self.terminal.register, FolioKind::Sale)
            .await?;

        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            folio: lease.folio().clone(),
            branch: self.terminal.branch,
            register: self.terminal.register,
            cashier_id: cashier_id.to_string(),
            total_cents: total.cents(),
            tendered_cents: tendered.cents(),
            payment,
            shift_folio: None,
            created_at: lease.issued_at(),
        };
        self.store.insert_sale(&sale).await?;
        drop(lease);

        info!(folio = %sale.folio, total = %total, payment = %sale.payment, "Sale recorded");
        Ok(sale)
    }

    /// Opens a credit or layaway for a customer.
    pub async fn record_account(
        &self,
        kind: AccountKind,
        customer_id: &str,
        total: Money,
    ) -> LedgerResult<Account> {
        validate_required("customer", customer_id)?;
        validate_positive_amount("account total", total)?;

        let lease = self
            .sequence
            .lease(self.terminal.branch, self.terminal.register, kind.folio_kind())
            .await?;

        let account = Account {
            id: Uuid::new_v4().to_string(),
            kind,
            folio: lease.folio().clone(),
            branch: self.terminal.branch,
            register: self.terminal.register,
            customer_id: customer_id.to_string(),
            total_cents: total.cents(),
            shift_folio: None,
            created_at: lease.issued_at(),
        };
        self.store.insert_account(&account).await?;
        drop(lease);

        info!(folio = %account.folio, kind = %kind, total = %total, "Account opened");
        Ok(account)
    }

    /// Records an abono against an existing credit or layaway.
    ///
    /// ## Errors
    /// - `Validation` for a non-positive amount, blank user or negative
    ///   tender amount
    /// - `NotFound` when the account does not exist
    pub async fn record_account_payment(
        &self,
        kind: AccountKind,
        account_id: &str,
        amount: Money,
        payment: TenderBreakdown,
        user_id: &str,
    ) -> LedgerResult<AccountPayment> {
        validate_required("user", user_id)?;
        validate_positive_amount("payment amount", amount)?;
        validate_breakdown(&payment)?;

        let account = self
            .store
            .find_account(kind, account_id)
            .await?
            .ok_or_else(|| LedgerError::not_found(account_entity(kind), account_id))?;

        let lease = self
            .sequence
            .lease(self.terminal.branch, self.terminal.register, FolioKind::Payment)
            .await?;

        let abono = AccountPayment {
            id: Uuid::new_v4().to_string(),
            account_id: account.id.clone(),
            account_kind: kind,
            folio: lease.folio().clone(),
            branch: self.terminal.branch,
            register: self.terminal.register,
            user_id: user_id.to_string(),
            amount_cents: amount.cents(),
            payment,
            shift_folio: None,
            created_at: lease.issued_at(),
        };
        self.store.insert_account_payment(&abono).await?;
        drop(lease);

        info!(
            folio = %abono.folio,
            account = %account.folio,
            amount = %amount,
            "Abono recorded"
        );
        Ok(abono)
    }
}

impl std::fmt::Debug for DocumentRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentRecorder")
            .field("terminal", &self.terminal)
            .finish_non_exhaustive()
    }
}

fn account_entity(kind: AccountKind) -> &'static str {
    match kind {
        AccountKind::Credit => "Credit",
        AccountKind::Layaway => "Layaway",
    }
}

/// Mixed breakdowns built in code skip the decoder, so check them here.
fn validate_breakdown(payment: &TenderBreakdown) -> Result<(), ValidationError> {
    if let TenderBreakdown::Mixed(amounts) = payment {
        if amounts.is_empty() {
            return Err(ValidationError::Required {
                field: "tender amounts".to_string(),
            });
        }
        if let Some((tender, _)) = amounts.iter().find(|(_, a)| **a < Decimal::ZERO) {
            return Err(ValidationError::MustNotBeNegative {
                field: format!("{} amount", tender),
            });
        }
    }
    Ok(())
}
