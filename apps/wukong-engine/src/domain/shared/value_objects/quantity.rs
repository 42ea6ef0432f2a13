//! Quantity value object for order and position sizes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

use crate::domain::shared::DomainError;

/// An unsigned-by-convention quantity (contracts, coins or shares).
///
/// Decimal so that fractional venue lots survive partial fills exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(Decimal);

impl Quantity {
    /// Zero quantity.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new Quantity from a Decimal.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a Quantity from an integer.
    #[must_use]
    pub fn from_i64(amount: i64) -> Self {
        Self(Decimal::new(amount, 0))
    }

    /// Get the inner Decimal value.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true if this quantity is positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Returns true if this quantity is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Smaller of two quantities.
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        if self <= other { self } else { other }
    }

    /// Subtract, flooring at zero.
    #[must_use]
    pub fn saturating_sub(self, other: Self) -> Self {
        if other >= self {
            Self::ZERO
        } else {
            Self(self.0 - other.0)
        }
    }

    /// Validate quantity for order submission.
    ///
    /// # Errors
    ///
    /// Returns error if quantity is zero or negative.
    pub fn validate_for_order(&self) -> Result<(), DomainError> {
        if self.0 <= Decimal::ZERO {
            return Err(DomainError::invalid(
                "quantity",
                "Order quantity must be positive",
            ));
        }
        Ok(())
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quantity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl Add for Quantity {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Quantity {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl From<Decimal> for Quantity {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn validate_rejects_zero_and_negative() {
        assert!(Quantity::ZERO.validate_for_order().is_err());
        assert!(Quantity::new(dec!(-1)).validate_for_order().is_err());
        assert!(Quantity::new(dec!(0.001)).validate_for_order().is_ok());
    }

    #[test]
    fn saturating_sub_floors_at_zero() {
        let a = Quantity::from_i64(3);
        let b = Quantity::from_i64(5);
        assert_eq!(a.saturating_sub(b), Quantity::ZERO);
        assert_eq!(b.saturating_sub(a), Quantity::from_i64(2));
    }

    #[test]
    fn min_picks_smaller() {
        let a = Quantity::new(dec!(2.5));
        let b = Quantity::from_i64(4);
        assert_eq!(a.min(b), a);
        assert_eq!(b.min(a), a);
    }

    #[test]
    fn display_drops_trailing_zeros() {
        assert_eq!(Quantity::new(dec!(10.500)).to_string(), "10.5");
        assert_eq!(Quantity::new(dec!(10.0)).to_string(), "10");
    }

    #[test]
    fn arithmetic() {
        let mut q = Quantity::from_i64(1);
        q += Quantity::from_i64(2);
        assert_eq!(q, Quantity::from_i64(3));
        assert_eq!(q - Quantity::from_i64(1), Quantity::from_i64(2));
    }
}
