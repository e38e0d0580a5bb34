//! # Quantity Module
//!
//! Fixed-point quantities for stock and sale lines.
//!
//! Quantities are stored as integer thousandths of a unit, the same way
//! [`crate::Money`] stores integer cents:
//!
//! ```text
//! 2.268 kg  ──►  Quantity(2268)
//! 50 kg     ──►  Quantity(50000)
//! ```
//!
//! Conversion factors are `f64`; the only place a float touches a quantity
//! is [`Quantity::checked_convert`], which rounds back to thousandths.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use crate::error::ValidationError;
use crate::money::Money;

/// Number of stored steps per whole unit.
pub const QUANTITY_SCALE: i64 = 1_000;

/// A quantity in thousandths of a unit.
///
/// Serialized as a plain JSON number (`2.268`), rounded to thousandths on
/// the way in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Quantity(i64);

impl Quantity {
    /// Creates a quantity from thousandths.
    ///
    /// ```rust
    /// use ventas_core::Quantity;
    ///
    /// assert_eq!(Quantity::from_milli(2268).to_string(), "2.268");
    /// ```
    #[inline]
    pub const fn from_milli(milli: i64) -> Self {
        Quantity(milli)
    }

    /// Creates a quantity from whole units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * QUANTITY_SCALE)
    }

    /// Creates a quantity from a float, rounding to thousandths.
    ///
    /// Returns `None` for NaN, infinities and values out of range.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let scaled = (value * QUANTITY_SCALE as f64).round();
        if scaled.abs() >= i64::MAX as f64 {
            return None;
        }
        Some(Quantity(scaled as i64))
    }

    /// Returns the raw value in thousandths.
    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
    }

    /// Returns the value as a float (for display and conversion only).
    #[inline]
    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / QUANTITY_SCALE as f64
    }

    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
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

    /// True when the quantity has no fractional part.
    #[inline]
    pub const fn is_whole(&self) -> bool {
        self.0 % QUANTITY_SCALE == 0
    }

    /// Multiplies by a conversion factor, rounding half away from zero to
    /// the nearest thousandth. `None` when the result does not fit.
    ///
    /// ```rust
    /// use ventas_core::Quantity;
    ///
    /// // 5 lb → kg
    /// let kg = Quantity::from_units(5).checked_convert(1.0 / 2.20462).unwrap();
    /// assert_eq!(kg.milli(), 2268);
    /// ```
    pub fn checked_convert(&self, factor: f64) -> Option<Quantity> {
        let milli = (self.0 as f64 * factor).round();
        if !milli.is_finite() || milli.abs() >= i64::MAX as f64 {
            return None;
        }
        Some(Quantity(milli as i64))
    }

    /// Adds, clamping at the `i64` bounds.
    #[inline]
    pub const fn saturating_add(self, other: Quantity) -> Quantity {
        Quantity(self.0.saturating_add(other.0))
    }

    /// Returns `self × numerator / denominator`, rounded half away from zero.
    ///
    /// Used to take the fulfilled share of an already converted base
    /// quantity without converting again. A zero denominator yields zero.
    ///
    /// ```rust
    /// use ventas_core::Quantity;
    ///
    /// let base = Quantity::from_units(20);
    /// let share = base.proportion(Quantity::from_units(4), Quantity::from_units(10));
    /// assert_eq!(share, Quantity::from_units(8));
    /// ```
    pub fn proportion(&self, numerator: Quantity, denominator: Quantity) -> Quantity {
        if denominator.is_zero() {
            return Quantity::zero();
        }
        let scaled = div_round(self.0 as i128 * numerator.0 as i128, denominator.0 as i128);
        Quantity(scaled as i64)
    }

    /// Prices this quantity at `unit_price` per whole unit. `None` when the
    /// amount does not fit in cents.
    ///
    /// ```rust
    /// use ventas_core::{Money, Quantity};
    ///
    /// let subtotal = Quantity::from_units(5).checked_times_price(Money::from_cents(4536));
    /// assert_eq!(subtotal, Some(Money::from_cents(22680)));
    /// ```
    pub fn checked_times_price(&self, unit_price: Money) -> Option<Money> {
        let cents = div_round(
            self.0 as i128 * unit_price.cents() as i128,
            QUANTITY_SCALE as i128,
        );
        i64::try_from(cents).ok().map(Money::from_cents)
    }
}

/// Integer division rounding half away from zero.
fn div_round(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder.abs() * 2 >= denominator.abs() {
        quotient + numerator.signum() * denominator.signum()
    } else {
        quotient
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / QUANTITY_SCALE as u64;
        let frac = abs % QUANTITY_SCALE as u64;
        if frac == 0 {
            return write!(f, "{sign}{whole}");
        }
        let digits = format!("{frac:03}");
        write!(f, "{sign}{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl TryFrom<f64> for Quantity {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Quantity::from_f64(value).ok_or_else(|| ValidationError::InvalidFormat {
            field: "quantity".to_string(),
            reason: format!("{value} is not a representable quantity"),
        })
    }
}

impl From<Quantity> for f64 {
    fn from(quantity: Quantity) -> Self {
        quantity.as_f64()
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0 - other.0)
    }
}

impl SubAssign for Quantity {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Quantity::zero(), Add::add)
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
        assert_eq!(Quantity::from_units(50).to_string(), "50");
        assert_eq!(Quantity::from_milli(47_732).to_string(), "47.732");
        assert_eq!(Quantity::from_milli(1_500).to_string(), "1.5");
        assert_eq!(Quantity::from_milli(-250).to_string(), "-0.25");
        assert_eq!(Quantity::zero().to_string(), "0");
    }

    #[test]
    fn test_from_f64_rounds_to_thousandths() {
        assert_eq!(Quantity::from_f64(2.26796), Some(Quantity::from_milli(2_268)));
        assert_eq!(Quantity::from_f64(0.0004), Some(Quantity::zero()));
        assert_eq!(Quantity::from_f64(f64::NAN), None);
        assert_eq!(Quantity::from_f64(f64::INFINITY), None);
    }

    #[test]
    fn test_json_is_a_plain_number() {
        let q: Quantity = serde_json::from_str("2.5").unwrap();
        assert_eq!(q, Quantity::from_milli(2_500));
        assert_eq!(serde_json::to_string(&q).unwrap(), "2.5");
    }

    #[test]
    fn test_convert_rounds_half_away_from_zero() {
        assert_eq!(Quantity::from_milli(1).checked_convert(0.5), Some(Quantity::from_milli(1)));
        assert_eq!(Quantity::from_milli(-1).checked_convert(0.5), Some(Quantity::from_milli(-1)));
        assert_eq!(Quantity::from_units(10).checked_convert(2.0), Some(Quantity::from_units(20)));
    }

    #[test]
    fn test_convert_out_of_range() {
        assert_eq!(Quantity::from_units(1_000_000_000).checked_convert(1e12), None);
        assert_eq!(Quantity::from_units(1).checked_convert(f64::NAN), None);
    }

    #[test]
    fn test_proportion() {
        let base = Quantity::from_units(20);
        assert_eq!(
            base.proportion(Quantity::from_units(4), Quantity::from_units(10)),
            Quantity::from_units(8)
        );
        // 1/3 of 1.000 = 0.333
        assert_eq!(
            Quantity::from_units(1).proportion(Quantity::from_units(1), Quantity::from_units(3)),
            Quantity::from_milli(333)
        );
        assert_eq!(base.proportion(Quantity::from_units(1), Quantity::zero()), Quantity::zero());
    }

    #[test]
    fn test_times_price() {
        // 2.5 units at $3.99 = $9.975 → $9.98
        let total = Quantity::from_milli(2_500).checked_times_price(Money::from_cents(399));
        assert_eq!(total, Some(Money::from_cents(998)));
    }

    #[test]
    fn test_times_price_overflow_is_none() {
        // 1e17 units at $10,000.00 is 1e23 cents
        let huge = Quantity::from_units(100_000_000_000_000);
        assert_eq!(huge.checked_times_price(Money::from_cents(1_000_000)), None);

        // Accepted from JSON, 1e16 thousandths; at $10,000.00 that is 1e19 cents
        let q: Quantity = serde_json::from_str("10000000000000").unwrap();
        assert_eq!(q.checked_times_price(Money::from_cents(1_000_000)), None);
    }

    #[test]
    fn test_saturating_add() {
        let max = Quantity::from_milli(i64::MAX);
        assert_eq!(max.saturating_add(Quantity::from_units(1)), max);
    }

    #[test]
    fn test_is_whole() {
        assert!(Quantity::from_units(3).is_whole());
        assert!(!Quantity::from_milli(3_001).is_whole());
    }

    #[test]
    fn test_sum() {
        let total: Quantity = [Quantity::from_milli(500), Quantity::from_milli(1_250)]
            .into_iter()
            .sum();
        assert_eq!(total, Quantity::from_milli(1_750));
    }
}
