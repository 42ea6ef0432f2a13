//! Bar granularity and boundary arithmetic.

use chrono::{Datelike, Duration, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::shared::{DomainError, Timestamp};

/// Bar granularity, from one minute to one calendar month.
///
/// Minute, hour and day frames (including `3d`) are aligned to the Unix
/// epoch in UTC. `1w` closes on Monday 00:00 UTC and `1M` on the first of
/// the month 00:00 UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TimeFrame {
    /// 1 minute.
    Minute1,
    /// 3 minutes.
    Minute3,
    /// 5 minutes.
    Minute5,
    /// 15 minutes.
    Minute15,
    /// 30 minutes.
    Minute30,
    /// 1 hour.
    Hour1,
    /// 2 hours.
    Hour2,
    /// 4 hours.
    Hour4,
    /// 6 hours.
    Hour6,
    /// 8 hours.
    Hour8,
    /// 12 hours.
    Hour12,
    /// 1 day.
    Day1,
    /// 3 days.
    Day3,
    /// 1 week.
    Week1,
    /// 1 calendar month.
    Month1,
}

impl TimeFrame {
    /// Every supported timeframe, shortest first.
    pub const ALL: [Self; 15] = [
        Self::Minute1,
        Self::Minute3,
        Self::Minute5,
        Self::Minute15,
        Self::Minute30,
        Self::Hour1,
        Self::Hour2,
        Self::Hour4,
        Self::Hour6,
        Self::Hour8,
        Self::Hour12,
        Self::Day1,
        Self::Day3,
        Self::Week1,
        Self::Month1,
    ];

    /// Short label, e.g. `15m`, `4h`, `1M`.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Minute1 => "1m",
            Self::Minute3 => "3m",
            Self::Minute5 => "5m",
            Self::Minute15 => "15m",
            Self::Minute30 => "30m",
            Self::Hour1 => "1h",
            Self::Hour2 => "2h",
            Self::Hour4 => "4h",
            Self::Hour6 => "6h",
            Self::Hour8 => "8h",
            Self::Hour12 => "12h",
            Self::Day1 => "1d",
            Self::Day3 => "3d",
            Self::Week1 => "1w",
            Self::Month1 => "1M",
        }
    }

    /// Length in seconds for every frame of constant length.
    ///
    /// `None` for the calendar month.
    #[must_use]
    pub const fn fixed_seconds(&self) -> Option<i64> {
        const MINUTE: i64 = 60;
        const HOUR: i64 = 60 * MINUTE;
        const DAY: i64 = 24 * HOUR;
        match self {
            Self::Minute1 => Some(MINUTE),
            Self::Minute3 => Some(3 * MINUTE),
            Self::Minute5 => Some(5 * MINUTE),
            Self::Minute15 => Some(15 * MINUTE),
            Self::Minute30 => Some(30 * MINUTE),
            Self::Hour1 => Some(HOUR),
            Self::Hour2 => Some(2 * HOUR),
            Self::Hour4 => Some(4 * HOUR),
            Self::Hour6 => Some(6 * HOUR),
            Self::Hour8 => Some(8 * HOUR),
            Self::Hour12 => Some(12 * HOUR),
            Self::Day1 => Some(DAY),
            Self::Day3 => Some(3 * DAY),
            Self::Week1 => Some(7 * DAY),
            Self::Month1 => None,
        }
    }

    /// Length as a duration, `None` for the calendar month.
    #[must_use]
    pub fn fixed_duration(&self) -> Option<Duration> {
        self.fixed_seconds().map(Duration::seconds)
    }

    /// Whether a bar may close at `ts` for this timeframe.
    #[must_use]
    pub fn is_boundary(&self, ts: Timestamp) -> bool {
        let dt = ts.as_datetime();
        if dt.nanosecond() != 0 {
            return false;
        }
        match self {
            Self::Week1 => dt.weekday() == Weekday::Mon && dt.num_seconds_from_midnight() == 0,
            Self::Month1 => dt.day() == 1 && dt.num_seconds_from_midnight() == 0,
            _ => self
                .fixed_seconds()
                .is_some_and(|secs| dt.timestamp().rem_euclid(secs) == 0),
        }
    }

    /// Last boundary at or before `ts`.
    #[must_use]
    pub fn floor(&self, ts: Timestamp) -> Timestamp {
        let dt = ts.as_datetime();
        let floored = match self {
            Self::Week1 => {
                let back = i64::from(dt.weekday().num_days_from_monday());
                (dt.date_naive() - Duration::days(back))
                    .and_time(NaiveTime::MIN)
                    .and_utc()
            }
            Self::Month1 => (dt.date_naive() - Duration::days(i64::from(dt.day0())))
                .and_time(NaiveTime::MIN)
                .and_utc(),
            _ => {
                let secs = self.fixed_seconds().unwrap_or(60);
                let rem = dt.timestamp().rem_euclid(secs);
                dt - Duration::seconds(rem) - Duration::nanoseconds(i64::from(dt.nanosecond()))
            }
        };
        Timestamp::new(floored)
    }

    /// First boundary strictly after `ts`.
    #[must_use]
    pub fn next_boundary(&self, ts: Timestamp) -> Timestamp {
        let floor = self.floor(ts).as_datetime();
        match self.fixed_duration() {
            Some(step) => Timestamp::new(floor + step),
            // 32 days past the first of any month lands inside the next one.
            None => self.floor(Timestamp::new(floor + Duration::days(32))),
        }
    }
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for TimeFrame {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if matches!(s, "1month" | "1mo" | "1M") {
            return Ok(Self::Month1);
        }
        Self::ALL
            .into_iter()
            .find(|tf| tf.label() == s)
            .ok_or_else(|| DomainError::invalid("timeframe", format!("unsupported timeframe '{s}'")))
    }
}

impl TryFrom<String> for TimeFrame {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeFrame> for String {
    fn from(value: TimeFrame) -> Self {
        value.label().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    #[test]
    fn labels_round_trip_through_from_str() {
        for tf in TimeFrame::ALL {
            assert_eq!(tf.label().parse::<TimeFrame>().unwrap(), tf);
        }
    }

    #[test_case("1month", TimeFrame::Month1 ; "long month")]
    #[test_case("1M", TimeFrame::Month1 ; "short month")]
    #[test_case("1m", TimeFrame::Minute1 ; "minute is lowercase")]
    #[test_case(" 4h ", TimeFrame::Hour4 ; "trimmed")]
    fn parse(input: &str, expected: TimeFrame) {
        assert_eq!(input.parse::<TimeFrame>().unwrap(), expected);
    }

    #[test]
    fn parse_rejects_unknown() {
        assert!("7m".parse::<TimeFrame>().is_err());
        assert!("".parse::<TimeFrame>().is_err());
    }

    #[test_case(TimeFrame::Hour1, "2024-03-15T14:00:00Z", true ; "hour on the hour")]
    #[test_case(TimeFrame::Hour1, "2024-03-15T14:30:00Z", false ; "hour at half past")]
    #[test_case(TimeFrame::Minute15, "2024-03-15T14:45:00Z", true ; "quarter hour")]
    #[test_case(TimeFrame::Minute5, "2024-03-15T14:45:30Z", false ; "seconds off boundary")]
    #[test_case(TimeFrame::Hour4, "2024-03-15T08:00:00Z", true ; "four hour")]
    #[test_case(TimeFrame::Hour4, "2024-03-15T10:00:00Z", false ; "four hour off")]
    #[test_case(TimeFrame::Day1, "2024-03-15T00:00:00Z", true ; "midnight")]
    #[test_case(TimeFrame::Week1, "2024-03-18T00:00:00Z", true ; "monday")]
    #[test_case(TimeFrame::Week1, "2024-03-17T00:00:00Z", false ; "sunday")]
    #[test_case(TimeFrame::Month1, "2024-03-01T00:00:00Z", true ; "first of month")]
    #[test_case(TimeFrame::Month1, "2024-03-02T00:00:00Z", false ; "second of month")]
    #[test_case(TimeFrame::Minute1, "2024-03-15T14:45:00.500Z", false ; "sub second")]
    fn boundary(tf: TimeFrame, at: &str, expected: bool) {
        assert_eq!(tf.is_boundary(ts(at)), expected);
    }

    #[test]
    fn next_boundary_fixed() {
        let next = TimeFrame::Hour1.next_boundary(ts("2024-03-15T14:20:00Z"));
        assert_eq!(next, ts("2024-03-15T15:00:00Z"));
        let next = TimeFrame::Hour1.next_boundary(ts("2024-03-15T15:00:00Z"));
        assert_eq!(next, ts("2024-03-15T16:00:00Z"));
    }

    #[test]
    fn next_boundary_week_starts_monday() {
        let next = TimeFrame::Week1.next_boundary(ts("2024-03-14T09:00:00Z"));
        assert_eq!(next, ts("2024-03-18T00:00:00Z"));
    }

    #[test]
    fn next_boundary_month_handles_year_end_and_short_months() {
        assert_eq!(
            TimeFrame::Month1.next_boundary(ts("2024-12-31T23:59:59Z")),
            ts("2025-01-01T00:00:00Z")
        );
        assert_eq!(
            TimeFrame::Month1.next_boundary(ts("2024-02-01T00:00:00Z")),
            ts("2024-03-01T00:00:00Z")
        );
    }

    #[test]
    fn every_next_boundary_is_a_boundary() {
        let start = ts("2024-02-27T13:07:11Z");
        for tf in TimeFrame::ALL {
            let next = tf.next_boundary(start);
            assert!(tf.is_boundary(next), "{tf} produced {next}");
            assert!(next > start);
        }
    }

    #[test]
    fn serde_uses_label() {
        let json = serde_json::to_string(&TimeFrame::Minute15).unwrap();
        assert_eq!(json, "\"15m\"");
        let tf: TimeFrame = serde_json::from_str("\"1month\"").unwrap();
        assert_eq!(tf, TimeFrame::Month1);
    }
}
