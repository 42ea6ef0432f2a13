//! Order type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How an order is priced.
///
/// Market orders fill at the next available price; limit orders only at
/// their limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Fill at the limit price or not at all.
    Limit,
    /// Fill at the next open.
    Market,
}

impl OrderType {
    /// Whether an intent of this type must carry a limit price.
    #[must_use]
    pub const fn requires_limit_price(&self) -> bool {
        matches!(self, Self::Limit)
    }

    /// Wire and metrics label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Limit => "LIMIT",
            Self::Market => "MARKET",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_limit_needs_a_price() {
        assert!(OrderType::Limit.requires_limit_price());
        assert!(!OrderType::Market.requires_limit_price());
    }

    #[test]
    fn label_matches_serde_form() {
        for order_type in [OrderType::Limit, OrderType::Market] {
            let json = serde_json::to_string(&order_type).unwrap();
            assert_eq!(json, format!("\"{}\"", order_type.label()));
        }
    }
}
