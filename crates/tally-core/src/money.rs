//! # Money Module
//!
//! Provides the `Money` type for persisted monetary values.
//!
//! ## Two Representations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  STORED VALUES: Money (integer cents)                                   │
//! │    sale totals, abono amounts, shift totals, movements                  │
//! │                                                                         │
//! │  ACCUMULATORS: rust_decimal::Decimal (unrounded)                        │
//! │    $300.00 × 100/300 = 100.000000…  (mixed tender share)               │
//! │    $100.00 × 1/3     = 33.3333333…  (kept exact until close)           │
//! │                                                                         │
//! │  Rounding happens ONCE, in `Money::from_decimal`, when a shift total    │
//! │  is written. Summing already-rounded shares would compound the error.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use rust_decimal::Decimal;
//! use tally_core::money::Money;
//!
//! let total = Money::from_cents(30000); // $300.00
//! let third = total.to_decimal() / Decimal::from(3);
//! assert_eq!(Money::from_decimal(third).unwrap().cents(), 10000);
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use crate::error::{CoreError, CoreResult};

/// Scale of the smallest currency unit (cents = 10^-2).
pub const MONEY_SCALE: u32 = 2;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: surplus and shortage share one type
/// - **Single field tuple struct**: zero-cost abstraction over i64
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(1950, 0).cents(), 195000);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Rounds an unrounded accumulator to cents (half away from zero).
    ///
    /// This is the only place shift arithmetic loses precision.
    ///
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use tally_core::money::Money;
    ///
    /// // 0.125 → 0.13, -0.125 → -0.13
    /// assert_eq!(Money::from_decimal(Decimal::new(125, 3)).unwrap().cents(), 13);
    /// assert_eq!(Money::from_decimal(Decimal::new(-125, 3)).unwrap().cents(), -13);
    /// ```
    pub fn from_decimal(value: Decimal) -> CoreResult<Self> {
        let mut rounded =
            value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(MONEY_SCALE);
        i64::try_from(rounded.mantissa())
            .map(Money)
            .map_err(|_| CoreError::AmountOverflow {
                value: value.to_string(),
            })
    }

    /// Returns the exact decimal value (e.g. `1099` cents → `10.99`).
    #[inline]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, MONEY_SCALE)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly display. Localized formatting is left to report renderers.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-5000)), "-$50.00");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_decimal_conversion_is_exact() {
        let money = Money::from_cents(195000);
        assert_eq!(money.to_decimal(), Decimal::new(1950, 0));
        assert_eq!(Money::from_decimal(money.to_decimal()).unwrap(), money);
    }

    #[test]
    fn test_rounding_happens_once() {
        // Three shares of $100.00 split by thirds
        let share = Money::from_cents(10000).to_decimal() / Decimal::from(3);

        // Rounding each share first loses a cent
        let rounded_each: Money = (0..3)
            .map(|_| Money::from_decimal(share).unwrap())
            .sum();
        assert_eq!(rounded_each.cents(), 9999);

        // Accumulating first keeps it
        let accumulated = share + share + share;
        assert_eq!(Money::from_decimal(accumulated).unwrap().cents(), 10000);
    }

    #[test]
    fn test_midpoint_rounds_away_from_zero() {
        assert_eq!(Money::from_decimal(Decimal::new(5, 3)).unwrap().cents(), 1);
        assert_eq!(Money::from_decimal(Decimal::new(-5, 3)).unwrap().cents(), -1);
        assert_eq!(Money::from_decimal(Decimal::new(4, 3)).unwrap().cents(), 0);
    }

    #[test]
    fn test_overflow_is_reported() {
        let err = Money::from_decimal(Decimal::MAX).unwrap_err();
        assert!(matches!(err, CoreError::AmountOverflow { .. }));
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((-a).cents(), -1000);
        assert_eq!(vec![a, b, b].into_iter().sum::<Money>().cents(), 2000);
    }

    #[test]
    fn test_zero_and_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_cents(100).is_positive());
        assert!(Money::from_cents(-100).is_negative());
        assert_eq!(Money::from_cents(-100).abs().cents(), 100);
    }
}
