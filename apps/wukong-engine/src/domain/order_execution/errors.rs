//! Order execution errors.

use std::fmt;

use super::value_objects::OrderStatus;
use crate::domain::shared::{OrderId, Quantity};

/// Errors that can occur in order execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// Invalid state transition attempted.
    InvalidStateTransition {
        /// Current order status.
        from: OrderStatus,
        /// Attempted status.
        to: OrderStatus,
        /// Reason for failure.
        reason: String,
    },

    /// Order cannot be filled in current state.
    CannotFill {
        /// Order that received the fill.
        order_id: OrderId,
        /// Current status.
        status: OrderStatus,
    },

    /// Order is already terminal; nothing left to cancel.
    AlreadyTerminal {
        /// Order the cancel targeted.
        order_id: OrderId,
        /// Terminal status it reached.
        status: OrderStatus,
    },

    /// Fill quantity exceeds remaining quantity.
    FillExceedsRemaining {
        /// Order that received the fill.
        order_id: OrderId,
        /// Fill quantity attempted.
        fill_qty: Quantity,
        /// Remaining quantity.
        remaining_qty: Quantity,
    },

    /// Invalid order parameters.
    InvalidParameters {
        /// Field with invalid value.
        field: String,
        /// Error message.
        message: String,
    },
}

impl OrderError {
    /// Shorthand for [`OrderError::InvalidParameters`].
    #[must_use]
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidParameters {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidStateTransition { from, to, reason } => {
                write!(
                    f,
                    "Invalid order state transition: {from} -> {to}: {reason}"
                )
            }
            Self::CannotFill { order_id, status } => {
                write!(f, "Cannot fill order {order_id} in status: {status}")
            }
            Self::AlreadyTerminal { order_id, status } => {
                write!(f, "Order {order_id} is already terminal ({status})")
            }
            Self::FillExceedsRemaining {
                order_id,
                fill_qty,
                remaining_qty,
            } => {
                write!(
                    f,
                    "Fill quantity {fill_qty} exceeds remaining {remaining_qty} on order {order_id}"
                )
            }
            Self::InvalidParameters { field, message } => {
                write!(f, "Invalid order parameter '{field}': {message}")
            }
        }
    }
}

impl std::error::Error for OrderError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_state_transition_display() {
        let err = OrderError::InvalidStateTransition {
            from: OrderStatus::Created,
            to: OrderStatus::Completed,
            reason: "skips Submitted".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("CREATED"));
        assert!(msg.contains("COMPLETED"));
    }

    #[test]
    fn already_terminal_display() {
        let err = OrderError::AlreadyTerminal {
            order_id: OrderId::new("ORD-000003"),
            status: OrderStatus::Canceled,
        };
        assert_eq!(err.to_string(), "Order ORD-000003 is already terminal (CANCELED)");
    }

    #[test]
    fn fill_exceeds_display() {
        let err = OrderError::FillExceedsRemaining {
            order_id: OrderId::new("ORD-1"),
            fill_qty: Quantity::from_i64(6),
            remaining_qty: Quantity::from_i64(5),
        };
        assert!(err.to_string().contains("6 exceeds remaining 5"));
    }
}
