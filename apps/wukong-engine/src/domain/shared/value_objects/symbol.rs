//! Symbol value object for instrument identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::DomainError;

/// A tradeable instrument, e.g. `BTCUSDT` or `ETH-PERP`.
///
/// Normalized to uppercase so config and venue spellings compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Create a new Symbol.
    ///
    /// The symbol is normalized to uppercase.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_uppercase())
    }

    /// Get the symbol string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate the symbol for order submission.
    ///
    /// # Errors
    ///
    /// Returns error if the symbol is empty or contains whitespace.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.0.is_empty() {
            return Err(DomainError::invalid("symbol", "Symbol cannot be empty"));
        }
        if self.0.chars().any(char::is_whitespace) {
            return Err(DomainError::invalid(
                "symbol",
                format!("Symbol contains whitespace: '{}'", self.0),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Symbol {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_padding() {
        assert_eq!(Symbol::new(" btcusdt ").as_str(), "BTCUSDT");
        assert_eq!(Symbol::from("eth-perp"), Symbol::from("ETH-PERP"));
    }

    #[test]
    fn validate() {
        assert!(Symbol::new("BTCUSDT").validate().is_ok());
        assert!(Symbol::new("").validate().is_err());
        assert!(Symbol::new("BTC USDT").validate().is_err());
    }
}
