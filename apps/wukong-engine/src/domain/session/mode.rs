//! Execution mode of a session.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::shared::DomainError;

/// Environment a strategy runs against.
///
/// Chosen once when the session is built and never changed mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    /// Historical replay with simulated fills.
    #[serde(alias = "backtest")]
    Backtest,
    /// Paper trading against live data.
    #[serde(alias = "sandbox")]
    Sandbox,
    /// Real capital at a live venue.
    #[serde(alias = "real")]
    Real,
}

impl Mode {
    /// Simulated clock and fills.
    #[must_use]
    pub const fn is_simulated(&self) -> bool {
        matches!(self, Self::Backtest)
    }

    /// Orders go to an external venue adapter.
    #[must_use]
    pub const fn routes_to_venue(&self) -> bool {
        matches!(self, Self::Sandbox | Self::Real)
    }

    /// Orders move real money.
    #[must_use]
    pub const fn is_live_capital(&self) -> bool {
        matches!(self, Self::Real)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backtest => write!(f, "BACKTEST"),
            Self::Sandbox => write!(f, "SANDBOX"),
            Self::Real => write!(f, "REAL"),
        }
    }
}

impl FromStr for Mode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BACKTEST" => Ok(Self::Backtest),
            "SANDBOX" => Ok(Self::Sandbox),
            "REAL" => Ok(Self::Real),
            other => Err(DomainError::invalid(
                "mode",
                format!("expected BACKTEST, SANDBOX or REAL, got '{other}'"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates() {
        assert!(Mode::Backtest.is_simulated());
        assert!(!Mode::Backtest.routes_to_venue());
        assert!(Mode::Sandbox.routes_to_venue());
        assert!(!Mode::Sandbox.is_live_capital());
        assert!(Mode::Real.is_live_capital());
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("sandbox".parse::<Mode>().unwrap(), Mode::Sandbox);
        assert_eq!("Real".parse::<Mode>().unwrap(), Mode::Real);
        assert!("paper".parse::<Mode>().is_err());
    }

    #[test]
    fn serde() {
        assert_eq!(serde_json::to_string(&Mode::Backtest).unwrap(), "\"BACKTEST\"");
        let mode: Mode = serde_json::from_str("\"sandbox\"").unwrap();
        assert_eq!(mode, Mode::Sandbox);
    }
}
