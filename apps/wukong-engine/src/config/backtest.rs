//! Backtest fill model configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::infrastructure::backtest::FillModel;

/// Simulated matching settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Share of bar volume fillable per bar, in (0, 1]. Unset fills fully.
    #[serde(default)]
    pub max_volume_participation: Option<Decimal>,
    /// Commission in basis points of notional.
    #[serde(default)]
    pub commission_bps: Decimal,
}

impl BacktestConfig {
    /// Fill model these settings describe.
    #[must_use]
    pub fn fill_model(&self) -> FillModel {
        FillModel {
            max_volume_participation: self.max_volume_participation,
            commission_bps: self.commission_bps,
        }
    }
}
