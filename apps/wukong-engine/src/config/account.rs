//! Account funding configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::account::AccountSettings;

/// Starting cash and leverage limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Cash at session start.
    #[serde(default)]
    pub initial_cash: Decimal,
    /// Highest leverage an intent may request.
    #[serde(default = "default_max_leverage")]
    pub max_leverage: Decimal,
    /// Refuse intents whose margin exceeds available cash.
    #[serde(default)]
    pub check_margin: bool,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            initial_cash: Decimal::ZERO,
            max_leverage: default_max_leverage(),
            check_margin: false,
        }
    }
}

impl AccountConfig {
    /// Account rules these settings describe.
    #[must_use]
    pub fn settings(&self) -> AccountSettings {
        AccountSettings {
            initial_cash: self.initial_cash,
            max_leverage: self.max_leverage,
            check_margin: self.check_margin,
        }
    }
}

fn default_max_leverage() -> Decimal {
    Decimal::from(100)
}
