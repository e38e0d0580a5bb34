//! # Money Module
//!
//! Provides the `Money` type for monetary values.
//!
//! ## Integer Cents
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every amount is an i64 count of cents.                                 │
//! │                                                                         │
//! │    price per kg   10000  ($100.00)                                     │
//! │    price per lb    4536  ($45.36)   ← checked_apply_factor(0.4535…)    │
//! │    5 lb subtotal  22680  ($226.80)  ← Quantity::checked_times_price    │
//! │    tax 18%         4082  ($40.82)   ← calculate_tax                    │
//! │                                                                         │
//! │  Floats only appear as conversion factors, and every product of a      │
//! │  factor and an amount is rounded straight back to cents.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use ventas_core::money::Money;
//!
//! let price = Money::from_cents(1099);
//! let doubled = price * 2;
//! let total = price + Money::from_cents(500);
//! assert_eq!(doubled.cents(), 2198);
//! assert_eq!(total.cents(), 1599);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in cents.
///
/// Signed so that differences (e.g. change due, balance deltas) stay in the
/// same type; persisted amounts are validated non-negative elsewhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use ventas_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-currency portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (always 0-99).
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

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Calculates tax at `rate`, rounding half up.
    ///
    /// Integer math: `(amount * bps + 5000) / 10000`.
    ///
    /// ```rust
    /// use ventas_core::money::Money;
    /// use ventas_core::types::TaxRate;
    ///
    /// let subtotal = Money::from_cents(22680);
    /// let tax = subtotal.calculate_tax(TaxRate::from_bps(1800));
    /// assert_eq!(tax.cents(), 4082);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        // i128 keeps large amounts from overflowing
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents as i64)
    }

    /// Multiplies by a conversion factor, rounding half away from zero to
    /// the nearest cent. `None` when the result does not fit in cents.
    ///
    /// ## User Workflow
    /// ```text
    /// Product: Cement, $100.00 per kg
    /// Chosen unit: lb   (1 lb = 0.45359… kg)
    ///      │
    ///      ▼
    /// checked_apply_factor(0.45359…) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Price per lb: $45.36
    /// ```
    pub fn checked_apply_factor(&self, factor: f64) -> Option<Money> {
        let cents = (self.0 as f64 * factor).round();
        if !cents.is_finite() || cents.abs() >= i64::MAX as f64 {
            return None;
        }
        Some(Money::from_cents(cents as i64))
    }

    /// `None` on overflow.
    #[inline]
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// `None` on overflow.
    #[inline]
    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Returns the smaller of two amounts.
    #[inline]
    pub fn min(self, other: Money) -> Money {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-style rendering; the front end formats for display.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.dollars().abs(), self.cents_part())
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

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(26762)), "$267.62");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::zero()), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);

        let total: Money = [a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_tax_half_up() {
        // $10.00 at 8.25% = $0.825 → $0.83
        let tax = Money::from_cents(1000).calculate_tax(TaxRate::from_bps(825));
        assert_eq!(tax.cents(), 83);
    }

    #[test]
    fn test_tax_eighteen_percent() {
        let tax = Money::from_cents(22680).calculate_tax(TaxRate::from_bps(1800));
        assert_eq!(tax.cents(), 4082);
    }

    #[test]
    fn test_apply_factor() {
        let per_kg = Money::from_cents(10000);
        assert_eq!(per_kg.checked_apply_factor(1.0 / 2.20462), Some(Money::from_cents(4536)));
        assert_eq!(per_kg.checked_apply_factor(1.0), Some(per_kg));
        assert_eq!(per_kg.checked_apply_factor(0.001), Some(Money::from_cents(10)));
    }

    #[test]
    fn test_apply_factor_out_of_range() {
        let price = Money::from_cents(900_000);
        assert_eq!(price.checked_apply_factor(1e15), None);
        assert_eq!(price.checked_apply_factor(f64::INFINITY), None);
    }

    #[test]
    fn test_checked_add_and_sub() {
        let max = Money::from_cents(i64::MAX);
        assert_eq!(max.checked_add(Money::from_cents(1)), None);
        assert_eq!(Money::from_cents(i64::MIN).checked_sub(Money::from_cents(1)), None);
        assert_eq!(
            Money::from_cents(1000).checked_add(Money::from_cents(500)),
            Some(Money::from_cents(1500))
        );
    }

    #[test]
    fn test_min() {
        let a = Money::from_cents(10);
        let b = Money::from_cents(20);
        assert_eq!(a.min(b), a);
        assert_eq!(b.min(a), a);
    }

    #[test]
    fn test_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_cents(1).is_positive());
        assert!(Money::from_cents(-1).is_negative());
    }
}
