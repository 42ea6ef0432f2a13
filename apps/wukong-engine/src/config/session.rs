//! Session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::application::scheduler::SessionSettings;
use crate::domain::market_data::TimeFrame;
use crate::domain::session::Mode;
use crate::domain::shared::{Symbol, Timestamp};

/// What to run and over which instruments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// BACKTEST, SANDBOX or REAL.
    #[serde(default = "default_mode")]
    pub mode: Mode,
    /// Bar granularity, e.g. `1m`, `4h`, `1d`, `1month`.
    #[serde(default = "default_timeframe")]
    pub timeframe: TimeFrame,
    /// Tradeable instruments.
    #[serde(default)]
    pub instruments: Vec<String>,
    /// Backtest window start (`YYYY[MM[DD[HH[MM[SS]]]]]` or RFC 3339).
    #[serde(default)]
    pub start: Option<String>,
    /// Backtest window end.
    #[serde(default)]
    pub end: Option<String>,
    /// Stop at the first inconsistency.
    #[serde(default)]
    pub halt_on_inconsistency: bool,
    /// Wait for cancel confirmations at shutdown (live modes).
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            timeframe: default_timeframe(),
            instruments: Vec::new(),
            start: None,
            end: None,
            halt_on_inconsistency: false,
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl SessionConfig {
    /// Instruments as normalized symbols.
    #[must_use]
    pub fn symbols(&self) -> Vec<Symbol> {
        self.instruments.iter().map(Symbol::new).collect()
    }

    /// Parsed `[start, end]` window.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for an unparseable bound.
    pub fn window(&self) -> Result<(Option<Timestamp>, Option<Timestamp>), ConfigError> {
        let parse = |label: &str, raw: &Option<String>| {
            raw.as_deref()
                .map(|s| {
                    Timestamp::parse_compact(s).map_err(|e| {
                        ConfigError::ValidationError(format!("session.{label}: {e}"))
                    })
                })
                .transpose()
        };
        Ok((parse("start", &self.start)?, parse("end", &self.end)?))
    }

    /// Scheduler settings for this session.
    #[must_use]
    pub fn settings(&self) -> SessionSettings {
        let mut settings = SessionSettings::new(self.mode, self.timeframe, self.symbols());
        settings.halt_on_inconsistency = self.halt_on_inconsistency;
        settings.shutdown_grace = Duration::from_millis(self.shutdown_grace_ms);
        settings
    }
}

const fn default_mode() -> Mode {
    Mode::Backtest
}

const fn default_timeframe() -> TimeFrame {
    TimeFrame::Hour1
}

const fn default_shutdown_grace_ms() -> u64 {
    5_000
}
