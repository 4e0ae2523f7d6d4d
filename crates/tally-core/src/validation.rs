//! # Validation Module
//!
//! Input validation for ledger operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Application layer (forms, commands)                          │
//! │  └── Basic presence checks                                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: tally-engine operations                                      │
//! │  └── THIS MODULE: amounts, concepts, identifiers                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE folio indexes                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::money::Money;
//! use tally_core::validation::{validate_concept, validate_positive_amount};
//!
//! assert!(validate_concept("Courier fee").is_ok());
//! assert!(validate_positive_amount("amount", Money::from_cents(0)).is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Money;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum length of a movement concept.
pub const MAX_CONCEPT_LEN: usize = 200;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a cash-movement concept.
///
/// ## Rules
/// - Must not be blank (whitespace only counts as blank)
/// - At most 200 characters
///
/// ## Returns
/// The trimmed concept.
pub fn validate_concept(concept: &str) -> ValidationResult<String> {
    let concept = concept.trim();

    if concept.is_empty() {
        return Err(ValidationError::Required {
            field: "concept".to_string(),
        });
    }

    if concept.chars().count() > MAX_CONCEPT_LEN {
        return Err(ValidationError::OutOfRange {
            field: "concept length".to_string(),
            min: 1,
            max: MAX_CONCEPT_LEN as i64,
        });
    }

    Ok(concept.to_string())
}

/// Validates an identifier supplied by the caller (user, cashier, customer).
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an amount that must be strictly positive (movements, abonos).
pub fn validate_positive_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates an amount that may be zero (opening float, declared cash).
pub fn validate_non_negative_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
