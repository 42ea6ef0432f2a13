//! Bar clock drivers.
//!
//! - [`HistoricalClock`]: pre-loaded series for backtests
//! - [`LiveClock`]: push feed for Sandbox and Real sessions
//!
//! Both run every bar through [`BarSequencer`], which enforces timeframe,
//! boundary alignment and strictly increasing close times per instrument.

mod bar_file;
mod historical;
mod live;

use std::collections::HashMap;

pub use bar_file::{BarFileError, read_bars};
pub use historical::HistoricalClock;
pub use live::LiveClock;

use crate::application::ports::ClockError;
use crate::domain::market_data::{Bar, TimeFrame};
use crate::domain::shared::{Symbol, Timestamp};

/// Per-instrument ordering guard.
#[derive(Debug, Clone)]
pub struct BarSequencer {
    timeframe: TimeFrame,
    last_close: HashMap<Symbol, Timestamp>,
}

impl BarSequencer {
    /// Guard for bars of `timeframe`.
    #[must_use]
    pub fn new(timeframe: TimeFrame) -> Self {
        Self {
            timeframe,
            last_close: HashMap::new(),
        }
    }

    /// Configured timeframe.
    #[must_use]
    pub const fn timeframe(&self) -> TimeFrame {
        self.timeframe
    }

    /// Check `bar` without recording it.
    ///
    /// # Errors
    ///
    /// Returns the first rule the bar breaks.
    pub fn check(&self, bar: &Bar) -> Result<(), ClockError> {
        let symbol = bar.symbol();
        let close_time = bar.close_time();

        if bar.timeframe() != self.timeframe {
            return Err(ClockError::TimeframeMismatch {
                symbol: symbol.clone(),
                expected: self.timeframe,
                actual: bar.timeframe(),
            });
        }
        if !self.timeframe.is_boundary(close_time) {
            return Err(ClockError::Misaligned {
                symbol: symbol.clone(),
                timeframe: self.timeframe,
                close_time,
            });
        }
        match self.last_close.get(symbol) {
            Some(&previous) if previous == close_time => Err(ClockError::Duplicate {
                symbol: symbol.clone(),
                close_time,
            }),
            Some(&previous) if previous > close_time => Err(ClockError::OutOfOrder {
                symbol: symbol.clone(),
                previous,
                close_time,
            }),
            _ => Ok(()),
        }
    }

    /// Check `bar` and remember its close time.
    ///
    /// # Errors
    ///
    /// Same as [`check`](Self::check); nothing is recorded on error.
    pub fn admit(&mut self, bar: &Bar) -> Result<(), ClockError> {
        self.check(bar)?;
        self.last_close
            .insert(bar.symbol().clone(), bar.close_time());
        Ok(())
    }

    /// Last close time admitted for `symbol`.
    #[must_use]
    pub fn last_close(&self, symbol: &Symbol) -> Option<Timestamp> {
        self.last_close.get(symbol).copied()
    }
}
