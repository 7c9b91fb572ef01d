//! Money in minor currency units.
//!
//! Prices are stored and charged in cents (the payment provider's native
//! unit), so arithmetic stays integral; `rust_decimal` is only used at the
//! edges for percentage math and display formatting.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// An amount of money in minor units (cents for USD).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero amount.
    pub const ZERO: Self = Self(0);

    /// Create an amount from minor units.
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Amount in minor units.
    #[must_use]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Multiply a unit price by a quantity.
    #[must_use]
    pub const fn times(&self, quantity: u32) -> Self {
        Self(self.0 * quantity as i64)
    }

    /// Subtract, flooring at zero. Discounts never drive a total negative.
    #[must_use]
    pub const fn saturating_sub(&self, other: Self) -> Self {
        let result = self.0 - other.0;
        if result < 0 { Self::ZERO } else { Self(result) }
    }

    /// The given percentage of this amount, rounded to the nearest cent.
    ///
    /// Used for `percent_off` coupons: a 20% coupon discounts
    /// `amount.percent_of(20)`.
    #[must_use]
    pub fn percent_of(&self, percent: Decimal) -> Self {
        let cents = Decimal::from(self.0) * percent / Decimal::from(100);
        Self(cents.round().to_i64().unwrap_or(0))
    }

    /// Display amount as dollars with two decimal places.
    #[must_use]
    pub fn display(&self) -> String {
        format!("${}", Decimal::new(self.0, 2))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn times_multiplies_unit_price() {
        assert_eq!(Money::from_cents(1000).times(2), Money::from_cents(2000));
    }

    #[test]
    fn saturating_sub_floors_at_zero() {
        let total = Money::from_cents(300);
        assert_eq!(
            total.saturating_sub(Money::from_cents(500)),
            Money::ZERO,
            "discount larger than total must floor at zero"
        );
        assert_eq!(
            total.saturating_sub(Money::from_cents(100)),
            Money::from_cents(200)
        );
    }

    #[test]
    fn percent_of_rounds_to_nearest_cent() {
        // 15% of $9.99 = 149.85 cents
        let amount = Money::from_cents(999);
        assert_eq!(amount.percent_of(Decimal::from(15)), Money::from_cents(150));
    }

    #[test]
    fn display_formats_dollars() {
        assert_eq!(Money::from_cents(1500).display(), "$15.00");
        assert_eq!(Money::from_cents(5).display(), "$0.05");
        assert_eq!(Money::ZERO.display(), "$0.00");
    }

    #[test]
    fn sum_accumulates_line_totals() {
        let total: Money = [100, 250, 50].into_iter().map(Money::from_cents).sum();
        assert_eq!(total, Money::from_cents(400));
    }
}
