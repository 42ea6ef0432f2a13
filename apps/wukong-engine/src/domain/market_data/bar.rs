//! OHLCV bar produced by the clock driver.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::TimeFrame;
use crate::domain::shared::{DomainError, Price, Symbol, Timestamp};

/// Open, high, low and close of one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ohlc {
    /// First traded price.
    pub open: Price,
    /// Highest traded price.
    pub high: Price,
    /// Lowest traded price.
    pub low: Price,
    /// Last traded price.
    pub close: Price,
}

impl Ohlc {
    /// Build from four prices.
    #[must_use]
    pub const fn new(open: Price, high: Price, low: Price, close: Price) -> Self {
        Self {
            open,
            high,
            low,
            close,
        }
    }
}

/// One immutable OHLCV aggregate for an instrument over a timeframe.
///
/// `close_time` is the boundary at which the bar closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBar")]
pub struct Bar {
    symbol: Symbol,
    timeframe: TimeFrame,
    close_time: Timestamp,
    #[serde(flatten)]
    ohlc: Ohlc,
    volume: Decimal,
}

/// Unchecked wire shape; every decoded bar passes through [`Bar::new`].
#[derive(Deserialize)]
struct RawBar {
    symbol: Symbol,
    timeframe: TimeFrame,
    close_time: RawCloseTime,
    #[serde(flatten)]
    ohlc: Ohlc,
    #[serde(default)]
    volume: Decimal,
}

/// Close time as epoch milliseconds or RFC 3339 text.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawCloseTime {
    Millis(i64),
    Text(Timestamp),
}

impl TryFrom<RawBar> for Bar {
    type Error = DomainError;

    fn try_from(raw: RawBar) -> Result<Self, Self::Error> {
        let close_time = match raw.close_time {
            RawCloseTime::Millis(ms) => Timestamp::from_millis(ms)?,
            RawCloseTime::Text(ts) => ts,
        };
        Self::new(raw.symbol, raw.timeframe, close_time, raw.ohlc, raw.volume)
    }
}

impl Bar {
    /// Create a bar, checking price consistency.
    ///
    /// # Errors
    ///
    /// Returns error if any price is non-positive, `high` is below open/close,
    /// `low` is above open/close, or volume is negative.
    pub fn new(
        symbol: Symbol,
        timeframe: TimeFrame,
        close_time: Timestamp,
        ohlc: Ohlc,
        volume: Decimal,
    ) -> Result<Self, DomainError> {
        let Ohlc {
            open,
            high,
            low,
            close,
        } = ohlc;
        if !(open.is_positive() && high.is_positive() && low.is_positive() && close.is_positive()) {
            return Err(DomainError::invalid("bar", "prices must be positive"));
        }
        if high < open.max(close) || low > open.min(close) || low > high {
            return Err(DomainError::invalid(
                "bar",
                format!("inconsistent range o={open} h={high} l={low} c={close}"),
            ));
        }
        if volume < Decimal::ZERO {
            return Err(DomainError::invalid("bar", "volume cannot be negative"));
        }
        Ok(Self {
            symbol,
            timeframe,
            close_time,
            ohlc,
            volume,
        })
    }

    /// Instrument the bar belongs to.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Granularity of the bar.
    #[must_use]
    pub const fn timeframe(&self) -> TimeFrame {
        self.timeframe
    }

    /// Boundary at which the bar closed.
    #[must_use]
    pub const fn close_time(&self) -> Timestamp {
        self.close_time
    }

    /// All four prices.
    #[must_use]
    pub const fn ohlc(&self) -> Ohlc {
        self.ohlc
    }

    /// Opening price.
    #[must_use]
    pub const fn open(&self) -> Price {
        self.ohlc.open
    }

    /// High price.
    #[must_use]
    pub const fn high(&self) -> Price {
        self.ohlc.high
    }

    /// Low price.
    #[must_use]
    pub const fn low(&self) -> Price {
        self.ohlc.low
    }

    /// Closing price.
    #[must_use]
    pub const fn close(&self) -> Price {
        self.ohlc.close
    }

    /// Traded volume.
    #[must_use]
    pub const fn volume(&self) -> Decimal {
        self.volume
    }

    /// Whether `price` lies within `[low, high]`.
    #[must_use]
    pub fn touches(&self, price: Price) -> bool {
        price >= self.ohlc.low && price <= self.ohlc.high
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ohlc(o: i64, h: i64, l: i64, c: i64) -> Ohlc {
        Ohlc::new(
            Price::from_i64(o),
            Price::from_i64(h),
            Price::from_i64(l),
            Price::from_i64(c),
        )
    }

    fn at() -> Timestamp {
        Timestamp::parse("2024-01-01T01:00:00Z").unwrap()
    }

    #[test]
    fn touches_is_inclusive() {
        let bar = Bar::new(
            Symbol::new("BTCUSDT"),
            TimeFrame::Hour1,
            at(),
            ohlc(50, 53, 48, 52),
            dec!(10),
        )
        .unwrap();
        assert!(bar.touches(Price::from_i64(48)));
        assert!(bar.touches(Price::from_i64(50)));
        assert!(bar.touches(Price::from_i64(53)));
        assert!(!bar.touches(Price::from_i64(54)));
    }

    #[test]
    fn rejects_inconsistent_range() {
        let result = Bar::new(
            Symbol::new("BTCUSDT"),
            TimeFrame::Hour1,
            at(),
            ohlc(50, 49, 48, 52),
            dec!(1),
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_negative_volume() {
        let result = Bar::new(
            Symbol::new("BTCUSDT"),
            TimeFrame::Hour1,
            at(),
            ohlc(50, 55, 48, 52),
            dec!(-1),
        );
        assert!(result.is_err());
    }

    #[test]
    fn deserializes_through_validation() {
        let json = r#"{"symbol":"btcusdt","timeframe":"1h","close_time":"2024-01-01T01:00:00Z",
            "open":"50","high":"55","low":"48","close":"52","volume":"12.5"}"#;
        let bar: Bar = serde_json::from_str(json).unwrap();
        assert_eq!(bar.symbol().as_str(), "BTCUSDT");
        assert_eq!(bar.high(), Price::from_i64(55));
        assert_eq!(bar.volume(), dec!(12.5));

        let bad = json.replace("\"low\":\"48\"", "\"low\":\"60\"");
        assert!(serde_json::from_str::<Bar>(&bad).is_err());
    }

    #[test]
    fn accepts_epoch_millis_close_time() {
        let json = r#"{"symbol":"BTC","timeframe":"1h","close_time":1704070800000,
            "open":"50","high":"55","low":"48","close":"52"}"#;
        let bar: Bar = serde_json::from_str(json).unwrap();
        assert_eq!(bar.close_time(), at());
    }
}
