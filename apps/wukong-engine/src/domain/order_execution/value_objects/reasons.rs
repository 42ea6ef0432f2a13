//! Reasons for order rejection and cancellation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Why an order ended Rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RejectReason {
    /// Machine-readable code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl RejectReason {
    /// Create a new reject reason.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Backend found the order malformed.
    #[must_use]
    pub fn invalid_order(message: impl Into<String>) -> Self {
        Self::new("INVALID_ORDER", message)
    }

    /// Venue declined the order.
    #[must_use]
    pub fn venue(message: impl Into<String>) -> Self {
        Self::new("VENUE_REJECTED", message)
    }

    /// No acknowledgment before the deadline.
    #[must_use]
    pub fn ack_timeout(deadline: Duration) -> Self {
        Self::new(
            "ACK_TIMEOUT",
            format!("no acknowledgment within {}ms", deadline.as_millis()),
        )
    }

    /// Transient venue errors persisted past the retry budget.
    #[must_use]
    pub fn retries_exhausted(attempts: u32, last_error: impl fmt::Display) -> Self {
        Self::new(
            "RETRIES_EXHAUSTED",
            format!("gave up after {attempts} attempts: {last_error}"),
        )
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Why an order ended Canceled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CancelReason {
    /// Machine-readable code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl CancelReason {
    /// Create a new cancel reason.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Strategy asked for the cancel.
    #[must_use]
    pub fn user_requested() -> Self {
        Self::new("USER_REQUESTED", "Canceled by strategy request")
    }

    /// Open orders are swept when the session ends.
    #[must_use]
    pub fn session_end() -> Self {
        Self::new("SESSION_END", "Canceled at end of session")
    }

    /// A fill would have pushed a reduce-only order past the position.
    #[must_use]
    pub fn reduce_only_violation() -> Self {
        Self::new(
            "REDUCE_ONLY_VIOLATION",
            "Closed after a fill that would grow or flip the position",
        )
    }

    /// Venue canceled on its own initiative.
    #[must_use]
    pub fn venue(message: impl Into<String>) -> Self {
        Self::new("VENUE_CANCELED", message)
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_timeout_mentions_deadline() {
        let reason = RejectReason::ack_timeout(Duration::from_millis(1500));
        assert_eq!(reason.code, "ACK_TIMEOUT");
        assert!(reason.message.contains("1500ms"));
    }

    #[test]
    fn display_format() {
        assert_eq!(
            RejectReason::venue("insufficient margin").to_string(),
            "[VENUE_REJECTED] insufficient margin"
        );
        assert_eq!(
            CancelReason::user_requested().to_string(),
            "[USER_REQUESTED] Canceled by strategy request"
        );
    }

    #[test]
    fn retries_exhausted_carries_last_error() {
        let reason = RejectReason::retries_exhausted(5, "connection reset");
        assert!(reason.message.contains("5 attempts"));
        assert!(reason.message.contains("connection reset"));
    }
}
