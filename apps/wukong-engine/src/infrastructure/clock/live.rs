//! Push-fed bar clock for Sandbox and Real sessions.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::BarSequencer;
use crate::application::ports::{BarClock, ClockError};
use crate::domain::market_data::{Bar, TimeFrame};

/// Suspends until the market-data collaborator pushes the next bar.
///
/// Bars that break sequencing rules are dropped with a warning rather than
/// ending the session. The feed closing or the token being cancelled ends
/// the stream.
#[derive(Debug)]
pub struct LiveClock {
    feed: mpsc::Receiver<Bar>,
    sequencer: BarSequencer,
    cancel: CancellationToken,
    dropped: u64,
}

impl LiveClock {
    /// Wrap a bar feed.
    #[must_use]
    pub fn new(timeframe: TimeFrame, feed: mpsc::Receiver<Bar>, cancel: CancellationToken) -> Self {
        Self {
            feed,
            sequencer: BarSequencer::new(timeframe),
            cancel,
            dropped: 0,
        }
    }

    /// Create a clock together with the sender the data collaborator pushes into.
    #[must_use]
    pub fn channel(
        timeframe: TimeFrame,
        capacity: usize,
        cancel: CancellationToken,
    ) -> (mpsc::Sender<Bar>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self::new(timeframe, rx, cancel))
    }

    /// Bars discarded so far.
    #[must_use]
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[async_trait]
impl BarClock for LiveClock {
    fn timeframe(&self) -> TimeFrame {
        self.sequencer.timeframe()
    }

    async fn advance(&mut self) -> Result<Option<Bar>, ClockError> {
        loop {
            let next = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Ok(None),
                bar = self.feed.recv() => bar,
            };
            let Some(bar) = next else {
                return Ok(None);
            };
            match self.sequencer.admit(&bar) {
                Ok(()) => return Ok(Some(bar)),
                Err(err) => {
                    self.dropped += 1;
                    warn!(error = %err, symbol = %bar.symbol(), "Dropping bar from live feed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::bar;
    use super::*;
    use crate::domain::shared::Timestamp;

    #[tokio::test]
    async fn drops_bad_bars_and_ends_with_feed() {
        let (tx, mut clock) = LiveClock::channel(TimeFrame::Minute5, 8, CancellationToken::new());
        tx.send(bar("BTC", TimeFrame::Minute5, "2024-01-01T00:05:00Z")).await.unwrap();
        tx.send(bar("BTC", TimeFrame::Minute5, "2024-01-01T00:07:00Z")).await.unwrap();
        tx.send(bar("BTC", TimeFrame::Minute5, "2024-01-01T00:05:00Z")).await.unwrap();
        tx.send(bar("BTC", TimeFrame::Hour1, "2024-01-01T01:00:00Z")).await.unwrap();
        tx.send(bar("BTC", TimeFrame::Minute5, "2024-01-01T00:10:00Z")).await.unwrap();
        drop(tx);

        let first = clock.advance().await.unwrap().unwrap();
        let second = clock.advance().await.unwrap().unwrap();

        assert_eq!(first.close_time(), Timestamp::parse("2024-01-01T00:05:00Z").unwrap());
        assert_eq!(second.close_time(), Timestamp::parse("2024-01-01T00:10:00Z").unwrap());
        assert_eq!(clock.dropped(), 3);
        assert!(clock.advance().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cancellation_ends_stream() {
        let token = CancellationToken::new();
        let (_tx, mut clock) = LiveClock::channel(TimeFrame::Minute1, 1, token.clone());

        token.cancel();

        assert!(clock.advance().await.unwrap().is_none());
    }
}
