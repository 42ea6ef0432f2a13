//! Timestamp value object for temporal data.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::DomainError;

/// A UTC timestamp for bars, fills and order tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a new Timestamp from a DateTime<Utc>.
    #[must_use]
    pub const fn new(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Get the current wall-clock timestamp.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Build from Unix epoch milliseconds.
    ///
    /// # Errors
    ///
    /// Returns error if the value is outside chrono's representable range.
    pub fn from_millis(ms: i64) -> Result<Self, DomainError> {
        Utc.timestamp_millis_opt(ms)
            .single()
            .map(Self)
            .ok_or_else(|| DomainError::invalid("timestamp", format!("out of range: {ms}ms")))
    }

    /// Parse from an RFC 3339 string.
    ///
    /// # Errors
    ///
    /// Returns error if the string is not a valid RFC 3339 timestamp.
    pub fn parse(s: &str) -> Result<Self, chrono::ParseError> {
        let dt = DateTime::parse_from_rfc3339(s)?;
        Ok(Self(dt.with_timezone(&Utc)))
    }

    /// Parse a compact UTC date such as `2024`, `202403`, `20240315`,
    /// `2024031514`, `202403151430` or `20240315143005`.
    ///
    /// RFC 3339 strings are accepted as well.
    ///
    /// # Errors
    ///
    /// Returns error for any other shape or an impossible calendar date.
    pub fn parse_compact(s: &str) -> Result<Self, DomainError> {
        let s = s.trim();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Self::parse(s)
                .map_err(|e| DomainError::invalid("timestamp", format!("'{s}': {e}")));
        }

        let field = |start: usize, len: usize, default: u32| -> u32 {
            s.get(start..start + len)
                .and_then(|part| part.parse().ok())
                .unwrap_or(default)
        };

        if !matches!(s.len(), 4 | 6 | 8 | 10 | 12 | 14) {
            return Err(DomainError::invalid(
                "timestamp",
                format!("'{s}' is not one of YYYY, YYYYMM, YYYYMMDD, YYYYMMDDHH, YYYYMMDDHHMM, YYYYMMDDHHMMSS"),
            ));
        }

        let year = field(0, 4, 1970) as i32;
        let month = field(4, 2, 1);
        let day = field(6, 2, 1);
        let hour = field(8, 2, 0);
        let minute = field(10, 2, 0);
        let second = field(12, 2, 0);

        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, second))
            .map(|naive| Self(Utc.from_utc_datetime(&naive)))
            .ok_or_else(|| DomainError::invalid("timestamp", format!("'{s}' is not a valid date")))
    }

    /// Get the inner DateTime<Utc>.
    #[must_use]
    pub const fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Format as RFC 3339 string.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Get the Unix timestamp in seconds.
    #[must_use]
    pub fn unix_seconds(&self) -> i64 {
        self.0.timestamp()
    }

    /// Get the Unix timestamp in milliseconds.
    #[must_use]
    pub fn unix_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Calculate duration since another timestamp.
    #[must_use]
    pub fn duration_since(&self, other: Self) -> chrono::Duration {
        self.0 - other.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}
