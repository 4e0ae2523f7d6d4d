//! # Tender Codec
//!
//! Decodes the loosely-typed payment-method field stored on sales and abonos.
//!
//! ## Stored Shapes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  payment_method column                 TenderBreakdown                  │
//! │  ──────────────────────                ─────────────────────            │
//! │  "cash"                          ──►   Single(Cash)                     │
//! │  "efectivo"                      ──►   Single(Cash)                     │
//! │  {"cash": 100, "debit": 200}     ──►   Mixed({Cash: 100, Debit: 200})   │
//! │  {"efectivo": "50.5"}            ──►   Mixed({Cash: 50.5})              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The column is decoded once, where rows become domain records. Everything
//! downstream matches on the enum instead of sniffing the string again.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// Tender
// =============================================================================

/// A payment instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tender {
    /// Physical cash. The only tender that ends up in the drawer.
    Cash,
    Debit,
    Credit,
    Transfer,
    Check,
}

impl Tender {
    pub const ALL: [Tender; 5] = [
        Tender::Cash,
        Tender::Debit,
        Tender::Credit,
        Tender::Transfer,
        Tender::Check,
    ];

    /// Canonical tag written by [`TenderBreakdown::encode`].
    pub const fn tag(&self) -> &'static str {
        match self {
            Tender::Cash => "cash",
            Tender::Debit => "debit",
            Tender::Credit => "credit",
            Tender::Transfer => "transfer",
            Tender::Check => "check",
        }
    }
}

impl fmt::Display for Tender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Tender {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" | "efectivo" => Ok(Tender::Cash),
            "debit" | "debito" | "débito" | "tarjeta_debito" | "debit_card" => Ok(Tender::Debit),
            "credit" | "credito" | "crédito" | "tarjeta_credito" | "credit_card" => {
                Ok(Tender::Credit)
            }
            "transfer" | "transferencia" => Ok(Tender::Transfer),
            "check" | "cheque" => Ok(Tender::Check),
            other => Err(CoreError::invalid_tender(
                other,
                "unknown tender. Valid options: cash, debit, credit, transfer, check",
            )),
        }
    }
}

// =============================================================================
// Tender Breakdown
// =============================================================================

/// How a document was paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenderBreakdown {
    /// The whole document was paid with one tender.
    Single(Tender),
    /// Tender name → amount handed over. Amounts may include change and need
    /// not add up to the document total.
    Mixed(BTreeMap<Tender, Decimal>),
}

impl TenderBreakdown {
    /// Decodes a stored payment-method field.
    ///
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use tally_core::tender::{Tender, TenderBreakdown};
    ///
    /// assert_eq!(
    ///     TenderBreakdown::decode("efectivo").unwrap(),
    ///     TenderBreakdown::Single(Tender::Cash)
    /// );
    ///
    /// let mixed = TenderBreakdown::decode(r#"{"cash":100,"debit":"200.50"}"#).unwrap();
    /// assert_eq!(mixed.tendered(Tender::Debit), Decimal::new(20050, 2));
    /// ```
    pub fn decode(raw: &str) -> CoreResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CoreError::invalid_tender(raw, "payment method is empty"));
        }

        if !trimmed.starts_with('{') && !trimmed.starts_with('"') {
            return Ok(TenderBreakdown::Single(trimmed.parse()?));
        }

        let value: Value = serde_json::from_str(trimmed)
            .map_err(|e| CoreError::invalid_tender(raw, format!("invalid JSON: {}", e)))?;

        match value {
            Value::String(tag) => Ok(TenderBreakdown::Single(tag.parse()?)),
            Value::Object(map) => decode_map(raw, map),
            _ => Err(CoreError::invalid_tender(
                raw,
                "expected a tender tag or an object of tender amounts",
            )),
        }
    }

    /// Encodes back to the stored representation.
    pub fn encode(&self) -> String {
        match self {
            TenderBreakdown::Single(tender) => tender.tag().to_string(),
            TenderBreakdown::Mixed(amounts) => {
                let mut map = Map::new();
                for (tender, amount) in amounts {
                    let number = Number::from_str(&amount.normalize().to_string())
                        .map(Value::Number)
                        .unwrap_or_else(|_| Value::String(amount.to_string()));
                    map.insert(tender.tag().to_string(), number);
                }
                Value::Object(map).to_string()
            }
        }
    }

    /// Builds a mixed breakdown from `(tender, amount)` pairs.
    pub fn mixed<I>(amounts: I) -> Self
    where
        I: IntoIterator<Item = (Tender, Money)>,
    {
        let mut map = BTreeMap::new();
        for (tender, amount) in amounts {
            *map.entry(tender).or_insert(Decimal::ZERO) += amount.to_decimal();
        }
        TenderBreakdown::Mixed(map)
    }

    /// Amount handed over in `tender` (zero for a single other tender).
    ///
    /// For `Single` the amount is unknown here; callers use the document
    /// amount instead.
    pub fn tendered(&self, tender: Tender) -> Decimal {
        match self {
            TenderBreakdown::Single(_) => Decimal::ZERO,
            TenderBreakdown::Mixed(amounts) => {
                amounts.get(&tender).copied().unwrap_or(Decimal::ZERO)
            }
        }
    }

    /// Cash portion of an abono.
    ///
    /// - `Single(Cash)` → the whole amount
    /// - `Single(other)` → zero, it settled electronically
    /// - `Mixed` → only the value under the cash key
    pub fn cash_portion(&self, amount: Money) -> Decimal {
        match self {
            TenderBreakdown::Single(Tender::Cash) => amount.to_decimal(),
            TenderBreakdown::Single(_) => Decimal::ZERO,
            TenderBreakdown::Mixed(_) => self.tendered(Tender::Cash),
        }
    }

    pub fn is_mixed(&self) -> bool {
        matches!(self, TenderBreakdown::Mixed(_))
    }
}

impl fmt::Display for TenderBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

fn decode_map(raw: &str, map: Map<String, Value>) -> CoreResult<TenderBreakdown> {
    if map.is_empty() {
        return Err(CoreError::invalid_tender(raw, "tender map is empty"));
    }

    let mut amounts = BTreeMap::new();
    for (name, value) in map {
        let tender: Tender = name.parse()?;
        let amount = match &value {
            Value::Number(n) => parse_amount(raw, &n.to_string())?,
            Value::String(s) => parse_amount(raw, s.trim())?,
            Value::Null => Decimal::ZERO,
            other => {
                return Err(CoreError::invalid_tender(
                    raw,
                    format!("amount for {} is not a number: {}", name, other),
                ))
            }
        };
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(CoreError::invalid_tender(
                raw,
                format!("amount for {} is negative", name),
            ));
        }
        // "cash" and "efectivo" in one map collapse into one bucket
        *amounts.entry(tender).or_insert(Decimal::ZERO) += amount;
    }

    Ok(TenderBreakdown::Mixed(amounts))
}

fn parse_amount(raw: &str, text: &str) -> CoreResult<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|e| CoreError::invalid_tender(raw, format!("amount '{}': {}", text, e)))
}

// =============================================================================
// Unit Tests
// =============================================================================
