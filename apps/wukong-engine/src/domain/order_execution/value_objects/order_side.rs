//! Position side an order trades toward.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Long buys, short sells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    /// Buy / increase net exposure.
    Long,
    /// Sell / decrease net exposure.
    Short,
}

impl Side {
    /// Returns the opposite side.
    #[must_use]
    pub const fn opposite(&self) -> Self {
        match self {
            Self::Long => Self::Short,
            Self::Short => Self::Long,
        }
    }

    /// Returns the sign for position calculations.
    ///
    /// Long = +1, Short = -1
    #[must_use]
    pub const fn sign(&self) -> i32 {
        match self {
            Self::Long => 1,
            Self::Short => -1,
        }
    }

    /// Apply this side's sign to an unsigned amount.
    #[must_use]
    pub fn signed(&self, amount: Decimal) -> Decimal {
        match self {
            Self::Long => amount,
            Self::Short => -amount,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
        }
    }
}
