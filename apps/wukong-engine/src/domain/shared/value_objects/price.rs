//! Price value object for limit, fill and mark prices.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::Mul;

use crate::domain::shared::{DomainError, Quantity};

/// A per-unit price in quote currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new Price from a Decimal.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a Price from an integer.
    #[must_use]
    pub fn from_i64(amount: i64) -> Self {
        Self(Decimal::new(amount, 0))
    }

    /// Get the inner Decimal value.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true if this price is positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Check a limit price before it reaches a backend.
    ///
    /// # Errors
    ///
    /// Returns error if the price is zero or negative.
    pub fn validate_for_order(&self) -> Result<(), DomainError> {
        if !self.is_positive() {
            return Err(DomainError::invalid(
                "limit_price",
                "Limit price must be positive",
            ));
        }
        Ok(())
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Price {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

/// Notional value of `quantity` units at this price.
impl Mul<Quantity> for Price {
    type Output = Decimal;

    fn mul(self, rhs: Quantity) -> Self::Output {
        self.0 * rhs.amount()
    }
}

impl From<Decimal> for Price {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn validate_requires_positive() {
        assert!(Price::ZERO.validate_for_order().is_err());
        assert!(Price::new(dec!(-0.5)).validate_for_order().is_err());
        assert!(Price::new(dec!(0.01)).validate_for_order().is_ok());
    }

    #[test]
    fn notional() {
        let notional = Price::new(dec!(100.5)) * Quantity::from_i64(2);
        assert_eq!(notional, dec!(201.0));
    }

    #[test]
    fn ordering() {
        assert!(Price::from_i64(48) < Price::from_i64(50));
    }
}
