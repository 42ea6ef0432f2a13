//! Cumulative fill tracking for one order.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Fill;
use crate::domain::shared::{DomainError, Price, Quantity, Timestamp};

/// Running totals of the fills applied to an order.
///
/// Invariant: `requested = filled + leaves`, and `filled` equals the sum of
/// `fills` quantities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillProgress {
    requested: Quantity,
    filled: Quantity,
    leaves: Quantity,
    avg_price: Option<Price>,
    fees: Decimal,
    fills: Vec<Fill>,
    last_fill_at: Option<Timestamp>,
}

impl FillProgress {
    /// Empty progress for an order of `requested` units.
    #[must_use]
    pub const fn new(requested: Quantity) -> Self {
        Self {
            requested,
            filled: Quantity::ZERO,
            leaves: requested,
            avg_price: None,
            fees: Decimal::ZERO,
            fills: Vec::new(),
            last_fill_at: None,
        }
    }

    /// Quantity originally requested.
    #[must_use]
    pub const fn requested(&self) -> Quantity {
        self.requested
    }

    /// Cumulative filled quantity.
    #[must_use]
    pub const fn filled(&self) -> Quantity {
        self.filled
    }

    /// Quantity still open.
    #[must_use]
    pub const fn leaves(&self) -> Quantity {
        self.leaves
    }

    /// Volume-weighted average fill price, `None` before the first fill.
    #[must_use]
    pub const fn avg_price(&self) -> Option<Price> {
        self.avg_price
    }

    /// Sum of fees over all fills.
    #[must_use]
    pub const fn fees(&self) -> Decimal {
        self.fees
    }

    /// Fills in arrival order.
    #[must_use]
    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    /// Time of the latest fill.
    #[must_use]
    pub const fn last_fill_at(&self) -> Option<Timestamp> {
        self.last_fill_at
    }

    /// Check a fill against the open quantity without applying it.
    ///
    /// # Errors
    ///
    /// Returns error if the fill is empty or exceeds the open quantity.
    pub fn check(&self, quantity: Quantity) -> Result<(), DomainError> {
        if !quantity.is_positive() {
            return Err(DomainError::invalid("fill_quantity", "fill quantity must be positive"));
        }
        if quantity > self.leaves {
            return Err(DomainError::InvariantViolation {
                aggregate: "FillProgress".to_string(),
                invariant: "fill <= leaves".to_string(),
                state: format!("fill={quantity}, leaves={}", self.leaves),
            });
        }
        Ok(())
    }

    /// Apply a fill.
    ///
    /// # Errors
    ///
    /// Returns error if the fill is empty or exceeds the open quantity.
    pub fn apply(&mut self, fill: Fill) -> Result<(), DomainError> {
        self.check(fill.quantity())?;

        let new_filled = self.filled + fill.quantity();
        let old_value = self
            .avg_price
            .map_or(Decimal::ZERO, |avg| avg * self.filled);
        self.avg_price = Some(Price::new(
            (old_value + fill.notional()) / new_filled.amount(),
        ));

        self.filled = new_filled;
        self.leaves = self.requested - self.filled;
        self.fees += fill.fee();
        self.last_fill_at = Some(fill.timestamp());
        self.fills.push(fill);

        debug_assert!(self.verify_invariant());
        Ok(())
    }

    /// Whether every requested unit is filled.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.leaves.is_zero()
    }

    /// `requested = filled + leaves` and fills sum to `filled`.
    #[must_use]
    pub fn verify_invariant(&self) -> bool {
        let summed = self
            .fills
            .iter()
            .fold(Quantity::ZERO, |acc, f| acc + f.quantity());
        self.requested == self.filled + self.leaves && summed == self.filled
    }
}
