//! Historical bar clock for backtests.

use std::collections::VecDeque;

use async_trait::async_trait;

use super::BarSequencer;
use crate::application::ports::{BarClock, ClockError};
use crate::domain::market_data::{Bar, TimeFrame};
use crate::domain::shared::Timestamp;

/// Replays a pre-loaded bar series.
///
/// Bars are validated per instrument up front, then merged by close time
/// with ties broken by symbol so multi-instrument runs are reproducible.
#[derive(Debug, Clone)]
pub struct HistoricalClock {
    timeframe: TimeFrame,
    bars: VecDeque<Bar>,
    start: Option<Timestamp>,
    emitted: usize,
}

impl HistoricalClock {
    /// Build a clock over `bars`.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError`] for a bar with the wrong timeframe, a close
    /// time off the timeframe's boundaries, or a duplicate or out-of-order
    /// bar for its instrument.
    pub fn new(timeframe: TimeFrame, bars: Vec<Bar>) -> Result<Self, ClockError> {
        let mut sequencer = BarSequencer::new(timeframe);
        for bar in &bars {
            sequencer.admit(bar)?;
        }

        let mut bars = bars;
        bars.sort_by(|a, b| {
            a.close_time()
                .cmp(&b.close_time())
                .then_with(|| a.symbol().cmp(b.symbol()))
        });

        Ok(Self {
            timeframe,
            bars: bars.into(),
            start: None,
            emitted: 0,
        })
    }

    /// Keep only bars closing within `[start, end]`.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidWindow`] unless `start` is before `end`.
    pub fn with_window(
        mut self,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> Result<Self, ClockError> {
        if let (Some(start), Some(end)) = (start, end) {
            if start >= end {
                return Err(ClockError::InvalidWindow { start, end });
            }
        }
        self.bars.retain(|bar| {
            let t = bar.close_time();
            start.is_none_or(|s| t >= s) && end.is_none_or(|e| t <= e)
        });
        self.start = start;
        Ok(self)
    }

    /// Bars not yet emitted.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.bars.len()
    }

    /// Bars emitted so far.
    #[must_use]
    pub const fn emitted(&self) -> usize {
        self.emitted
    }
}

#[async_trait]
impl BarClock for HistoricalClock {
    fn timeframe(&self) -> TimeFrame {
        self.timeframe
    }

    fn start_time(&self) -> Option<Timestamp> {
        self.start
            .or_else(|| self.bars.front().map(Bar::close_time))
    }

    async fn advance(&mut self) -> Result<Option<Bar>, ClockError> {
        let next = self.bars.pop_front();
        if next.is_some() {
            self.emitted += 1;
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::bar;
    use super::*;

    #[tokio::test]
    async fn merges_instruments_by_time_then_symbol() {
        let bars = vec![
            bar("ETH", TimeFrame::Hour1, "2024-01-01T01:00:00Z"),
            bar("ETH", TimeFrame::Hour1, "2024-01-01T02:00:00Z"),
            bar("BTC", TimeFrame::Hour1, "2024-01-01T01:00:00Z"),
            bar("BTC", TimeFrame::Hour1, "2024-01-01T02:00:00Z"),
        ];
        let mut clock = HistoricalClock::new(TimeFrame::Hour1, bars).unwrap();

        let mut order = Vec::new();
        while let Some(bar) = clock.advance().await.unwrap() {
            order.push(format!("{}@{}", bar.symbol(), bar.close_time().as_datetime().format("%H")));
        }

        assert_eq!(order, vec!["BTC@01", "ETH@01", "BTC@02", "ETH@02"]);
        assert_eq!(clock.emitted(), 4);
    }

    #[test]
    fn misaligned_series_fails_construction() {
        let bars = vec![bar("BTC", TimeFrame::Hour1, "2024-01-01T01:15:00Z")];

        let err = HistoricalClock::new(TimeFrame::Hour1, bars).unwrap_err();

        assert!(matches!(err, ClockError::Misaligned { .. }));
    }

    #[test]
    fn out_of_order_series_fails_construction() {
        let bars = vec![
            bar("BTC", TimeFrame::Minute1, "2024-01-01T00:02:00Z"),
            bar("BTC", TimeFrame::Minute1, "2024-01-01T00:01:00Z"),
        ];

        let err = HistoricalClock::new(TimeFrame::Minute1, bars).unwrap_err();

        assert!(matches!(err, ClockError::OutOfOrder { .. }));
    }

    #[tokio::test]
    async fn window_filters_and_sets_start() {
        let bars = vec![
            bar("BTC", TimeFrame::Day1, "2024-01-01T00:00:00Z"),
            bar("BTC", TimeFrame::Day1, "2024-01-02T00:00:00Z"),
            bar("BTC", TimeFrame::Day1, "2024-01-03T00:00:00Z"),
        ];
        let start = Timestamp::parse("2024-01-01T12:00:00Z").unwrap();
        let end = Timestamp::parse("2024-01-02T00:00:00Z").unwrap();

        let mut clock = HistoricalClock::new(TimeFrame::Day1, bars)
            .unwrap()
            .with_window(Some(start), Some(end))
            .unwrap();

        assert_eq!(clock.start_time(), Some(start));
        assert_eq!(clock.remaining(), 1);
        let only = clock.advance().await.unwrap().unwrap();
        assert_eq!(only.close_time(), end);
        assert!(clock.advance().await.unwrap().is_none());
    }

    #[test]
    fn inverted_window_rejected() {
        let clock = HistoricalClock::new(TimeFrame::Day1, Vec::new()).unwrap();
        let t = Timestamp::parse("2024-01-02T00:00:00Z").unwrap();

        let err = clock.with_window(Some(t), Some(t)).unwrap_err();

        assert!(matches!(err, ClockError::InvalidWindow { .. }));
    }
}
