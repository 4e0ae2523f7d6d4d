//! # Shift Reconciliation Math
//!
//! Pure totals for one shift. Everything here works on records already
//! loaded; reading them and writing the close back are the engine's job.
//!
//! ## Expected Cash
//! ```text
//! expected = opening
//!          + cash sales            (sales attributed to the cash tender)
//!          + credit abono cash     (cash portion of credit payments)
//!          + layaway abono cash    (cash portion of layaway payments)
//!          + income movements
//!          − expense movements
//!
//! surplus  = declared − expected   (against the rounded expected cash)
//! ```
//!
//! ## Precision
//! Accumulators are [`Decimal`] and are never rounded while summing. A
//! proportional split of a mixed-tender sale may produce a long fraction;
//! it is carried as-is and only [`ShiftTotals::close_summary`] rounds to cents.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::tender::{Tender, TenderBreakdown};
use crate::types::{Account, AccountPayment, CashMovement, MovementKind, Sale};

// =============================================================================
// Inputs
// =============================================================================

/// Everything that happened during a shift, as read from storage.
#[derive(Debug, Clone, Default)]
pub struct ShiftActivity {
    pub sales: Vec<Sale>,
    pub credits: Vec<Account>,
    pub layaways: Vec<Account>,
    pub credit_payments: Vec<AccountPayment>,
    pub layaway_payments: Vec<AccountPayment>,
    pub movements: Vec<CashMovement>,
}

// =============================================================================
// Tender Totals
// =============================================================================

/// Unrounded sales per tender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TenderTotals {
    pub cash: Decimal,
    pub debit: Decimal,
    pub credit: Decimal,
    pub transfer: Decimal,
    pub check: Decimal,
}

impl TenderTotals {
    pub fn get(&self, tender: Tender) -> Decimal {
        match tender {
            Tender::Cash => self.cash,
            Tender::Debit => self.debit,
            Tender::Credit => self.credit,
            Tender::Transfer => self.transfer,
            Tender::Check => self.check,
        }
    }

    fn bucket(&mut self, tender: Tender) -> &mut Decimal {
        match tender {
            Tender::Cash => &mut self.cash,
            Tender::Debit => &mut self.debit,
            Tender::Credit => &mut self.credit,
            Tender::Transfer => &mut self.transfer,
            Tender::Check => &mut self.check,
        }
    }

    pub fn add(&mut self, tender: Tender, amount: Decimal) {
        *self.bucket(tender) += amount;
    }

    pub fn sum(&self) -> Decimal {
        Tender::ALL.iter().map(|t| self.get(*t)).sum()
    }
}

// =============================================================================
// Sale Attribution
// =============================================================================

/// Distributes one sale's total across tenders.
///
/// ## Rules
/// - `Single(t)`: the full total goes to `t`
/// - `Mixed`: each tender gets `total × tendered_t / Σ tendered`
/// - `Mixed` with nothing tendered: the full total goes to cash
///
/// The last tender of a split receives the remainder, so the shares always
/// add up to exactly `total`. Returns `false` when the cash fallback was used.
pub fn attribute_sale(total: Decimal, payment: &TenderBreakdown, into: &mut TenderTotals) -> bool {
    let amounts = match payment {
        TenderBreakdown::Single(tender) => {
            into.add(*tender, total);
            return true;
        }
        TenderBreakdown::Mixed(amounts) => amounts,
    };

    let tendered: Decimal = amounts.values().copied().sum();
    if tendered <= Decimal::ZERO {
        into.add(Tender::Cash, total);
        return false;
    }

    let shares: Vec<(Tender, Decimal)> = amounts
        .iter()
        .filter(|(_, amount)| **amount > Decimal::ZERO)
        .map(|(tender, amount)| (*tender, *amount))
        .collect();

    let mut allocated = Decimal::ZERO;
    for (index, (tender, amount)) in shares.iter().enumerate() {
        let share = if index + 1 == shares.len() {
            total - allocated
        } else {
            total * *amount / tendered
        };
        allocated += share;
        into.add(*tender, share);
    }
    true
}

// =============================================================================
// Movement Breakdown
// =============================================================================

/// One line of the expense/income breakdown frozen on the shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementLine {
    pub concept: String,
    pub amount: Money,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<&CashMovement> for MovementLine {
    fn from(movement: &CashMovement) -> Self {
        MovementLine {
            concept: movement.concept.clone(),
            amount: movement.amount(),
            user_id: movement.user_id.clone(),
            created_at: movement.created_at,
        }
    }
}

// =============================================================================
// Shift Totals
// =============================================================================

/// Unrounded totals for a shift.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShiftTotals {
    pub opening: Decimal,
    pub sales_by_tender: TenderTotals,
    pub total_sales: Decimal,
    pub credits_created: Decimal,
    pub layaways_created: Decimal,
    /// sales + credits + layaways at face value.
    pub productivity: Decimal,
    pub credit_cash: Decimal,
    pub layaway_cash: Decimal,
    pub expenses: Decimal,
    pub income: Decimal,
    pub expected_cash: Decimal,
    pub expense_lines: Vec<MovementLine>,
    pub income_lines: Vec<MovementLine>,
    pub sale_count: usize,
    /// Mixed-tender sales with nothing tendered that were booked as cash.
    pub cash_fallbacks: usize,
}

impl ShiftTotals {
    /// Computes totals from an opening float and the shift's activity.
    pub fn compute(opening: Money, activity: &ShiftActivity) -> Self {
        let mut totals = ShiftTotals {
            opening: opening.to_decimal(),
            sale_count: activity.sales.len(),
            ..ShiftTotals::default()
        };

        for sale in &activity.sales {
            let total = sale.total().to_decimal();
            totals.total_sales += total;
            if !attribute_sale(total, &sale.payment, &mut totals.sales_by_tender) {
                totals.cash_fallbacks += 1;
            }
        }

        totals.credits_created = activity.credits.iter().map(|a| a.total().to_decimal()).sum();
        totals.layaways_created = activity.layaways.iter().map(|a| a.total().to_decimal()).sum();
        totals.productivity = totals.total_sales + totals.credits_created + totals.layaways_created;

        totals.credit_cash = cash_collected(&activity.credit_payments);
        totals.layaway_cash = cash_collected(&activity.layaway_payments);

        for movement in &activity.movements {
            let amount = movement.amount().to_decimal();
            match movement.kind {
                MovementKind::Expense => {
                    totals.expenses += amount;
                    totals.expense_lines.push(movement.into());
                }
                MovementKind::Income => {
                    totals.income += amount;
                    totals.income_lines.push(movement.into());
                }
            }
        }

        totals.expected_cash = totals.opening
            + totals.sales_by_tender.cash
            + totals.credit_cash
            + totals.layaway_cash
            + totals.income
            - totals.expenses;

        totals
    }

    /// Rounds every figure to cents exactly once and serializes the
    /// movement breakdowns.
    ///
    /// The surplus is taken from the rounded expected cash, so the stored
    /// row always satisfies `surplus = declared − expected`.
    pub fn close_summary(&self, declared: Money) -> CoreResult<CloseSummary> {
        let breakdown = |lines: &[MovementLine]| {
            serde_json::to_string(lines).map_err(|e| CoreError::MalformedRecord {
                entity: "movement breakdown".to_string(),
                id: String::new(),
                reason: e.to_string(),
            })
        };

        let expected_cash = Money::from_decimal(self.expected_cash)?;

        Ok(CloseSummary {
            cash_sales: Money::from_decimal(self.sales_by_tender.cash)?,
            debit_sales: Money::from_decimal(self.sales_by_tender.debit)?,
            credit_sales: Money::from_decimal(self.sales_by_tender.credit)?,
            transfer_sales: Money::from_decimal(self.sales_by_tender.transfer)?,
            check_sales: Money::from_decimal(self.sales_by_tender.check)?,
            total_sales: Money::from_decimal(self.total_sales)?,
            productivity: Money::from_decimal(self.productivity)?,
            credits_created: Money::from_decimal(self.credits_created)?,
            layaways_created: Money::from_decimal(self.layaways_created)?,
            credit_cash: Money::from_decimal(self.credit_cash)?,
            layaway_cash: Money::from_decimal(self.layaway_cash)?,
            expenses: Money::from_decimal(self.expenses)?,
            income: Money::from_decimal(self.income)?,
            expected_cash,
            declared_cash: declared,
            surplus: declared - expected_cash,
            expense_breakdown: breakdown(&self.expense_lines)?,
            income_breakdown: breakdown(&self.income_lines)?,
        })
    }
}

fn cash_collected(payments: &[AccountPayment]) -> Decimal {
    payments
        .iter()
        .map(|p| p.payment.cash_portion(p.amount()))
        .sum()
}

// =============================================================================
// Close Summary
// =============================================================================

/// Rounded figures written onto a shift when it closes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseSummary {
    pub cash_sales: Money,
    pub debit_sales: Money,
    pub credit_sales: Money,
    pub transfer_sales: Money,
    pub check_sales: Money,
    pub total_sales: Money,
    pub productivity: Money,
    pub credits_created: Money,
    pub layaways_created: Money,
    pub credit_cash: Money,
    pub layaway_cash: Money,
    pub expenses: Money,
    pub income: Money,
    pub expected_cash: Money,
    pub declared_cash: Money,
    pub surplus: Money,
    pub expense_breakdown: String,
    pub income_breakdown: String,
}

impl Default for CloseSummary {
    fn default() -> Self {
        CloseSummary {
            cash_sales: Money::zero(),
            debit_sales: Money::zero(),
            credit_sales: Money::zero(),
            transfer_sales: Money::zero(),
            check_sales: Money::zero(),
            total_sales: Money::zero(),
            productivity: Money::zero(),
            credits_created: Money::zero(),
            layaways_created: Money::zero(),
            credit_cash: Money::zero(),
            layaway_cash: Money::zero(),
            expenses: Money::zero(),
            income: Money::zero(),
            expected_cash: Money::zero(),
            declared_cash: Money::zero(),
            surplus: Money::zero(),
            expense_breakdown: "[]".to_string(),
            income_breakdown: "[]".to_string(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
