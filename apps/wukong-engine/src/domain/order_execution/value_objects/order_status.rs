//! Order status in the lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order status.
///
/// ```text
/// Created -> Submitted -> Pending -> Partial* -> Completed
///                 |          |          |
///                 v          +----------+-----> Canceled
///              Rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Built from a strategy intent, not yet handed to a backend.
    Created,
    /// Handed to the backend, awaiting acknowledgment.
    Submitted,
    /// Acknowledged and working, nothing filled yet.
    Pending,
    /// Some but not all quantity filled.
    Partial,
    /// Fully filled.
    Completed,
    /// Declined by validation, the backend or the venue.
    Rejected,
    /// Canceled before completion.
    Canceled,
}

impl OrderStatus {
    /// Returns true if the order is in a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected | Self::Canceled)
    }

    /// Returns true if the order is working at the backend.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Partial)
    }

    /// Returns true if a fill may be applied.
    #[must_use]
    pub const fn can_fill(&self) -> bool {
        matches!(self, Self::Pending | Self::Partial)
    }

    /// Returns true if a cancel confirmation may be applied.
    #[must_use]
    pub const fn is_cancelable(&self) -> bool {
        matches!(self, Self::Pending | Self::Partial)
    }

    /// Returns true until the order reaches a terminal status.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "CREATED",
            Self::Submitted => "SUBMITTED",
            Self::Pending => "PENDING",
            Self::Partial => "PARTIAL",
            Self::Completed => "COMPLETED",
            Self::Rejected => "REJECTED",
            Self::Canceled => "CANCELED",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
        assert!(OrderStatus::Canceled.is_terminal());
        assert!(!OrderStatus::Created.is_terminal());
        assert!(!OrderStatus::Submitted.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Partial.is_terminal());
    }

    #[test]
    fn only_working_orders_take_fills() {
        assert!(OrderStatus::Pending.can_fill());
        assert!(OrderStatus::Partial.can_fill());
        assert!(!OrderStatus::Submitted.can_fill());
        assert!(!OrderStatus::Completed.can_fill());
    }

    #[test]
    fn serde_and_display_agree() {
        for status in [
            OrderStatus::Created,
            OrderStatus::Submitted,
            OrderStatus::Pending,
            OrderStatus::Partial,
            OrderStatus::Completed,
            OrderStatus::Rejected,
            OrderStatus::Canceled,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
    }
}
