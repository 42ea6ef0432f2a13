//! Bar Clock Port (Driven Port)
//!
//! Supplies closed bars to the scheduler one at a time. Historical clocks
//! return a finite sequence; live clocks suspend until the next bar arrives.

use async_trait::async_trait;

use crate::domain::market_data::{Bar, TimeFrame};
use crate::domain::shared::{Symbol, Timestamp};

/// Bar sequencing errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    /// Close time is not a boundary of the configured timeframe.
    #[error("{symbol} bar at {close_time} is not on a {timeframe} boundary")]
    Misaligned {
        /// Instrument.
        symbol: Symbol,
        /// Configured timeframe.
        timeframe: TimeFrame,
        /// Offending close time.
        close_time: Timestamp,
    },

    /// Bar was built for another timeframe.
    #[error("{symbol} bar has timeframe {actual}, expected {expected}")]
    TimeframeMismatch {
        /// Instrument.
        symbol: Symbol,
        /// Configured timeframe.
        expected: TimeFrame,
        /// Bar's timeframe.
        actual: TimeFrame,
    },

    /// Bar is older than one already emitted for the instrument.
    #[error("{symbol} bar at {close_time} precedes {previous}")]
    OutOfOrder {
        /// Instrument.
        symbol: Symbol,
        /// Last close time emitted.
        previous: Timestamp,
        /// Offending close time.
        close_time: Timestamp,
    },

    /// Second bar with the same close time for the instrument.
    #[error("duplicate {symbol} bar at {close_time}")]
    Duplicate {
        /// Instrument.
        symbol: Symbol,
        /// Repeated close time.
        close_time: Timestamp,
    },

    /// Window start is not before its end.
    #[error("invalid window: start {start} is not before end {end}")]
    InvalidWindow {
        /// Window start.
        start: Timestamp,
        /// Window end.
        end: Timestamp,
    },
}

/// Port producing closed bars in timestamp order.
#[async_trait]
pub trait BarClock: Send {
    /// Granularity of emitted bars.
    fn timeframe(&self) -> TimeFrame;

    /// Simulated time before the first bar, for clocks that have one.
    fn start_time(&self) -> Option<Timestamp> {
        None
    }

    /// Next closed bar, or `None` at end of data.
    async fn advance(&mut self) -> Result<Option<Bar>, ClockError>;
}
