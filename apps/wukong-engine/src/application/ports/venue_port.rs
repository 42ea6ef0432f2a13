//! Venue Port (Driven Port)
//!
//! Minimal contract an external venue adapter fulfils for Sandbox and Real
//! sessions. Calls only hand requests over; acknowledgments, rejections,
//! fills and cancel confirmations come back on the event channel the adapter
//! was built with.

use async_trait::async_trait;

use super::execution_backend::{BackendOrderState, SubmitRequest};
use crate::domain::market_data::Bar;
use crate::domain::order_execution::CancelReason;
use crate::domain::shared::OrderId;

/// Venue adapter error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VenueError {
    /// Temporary failure (timeout, rate limit, 5xx).
    #[error("Venue transient error: {0}")]
    Transient(String),

    /// Venue declined the request permanently.
    #[error("Venue rejected request: {0}")]
    Rejected(String),

    /// Venue does not know the order.
    #[error("Order not found at venue: {order_id}")]
    NotFound {
        /// Engine order ID.
        order_id: OrderId,
    },

    /// Order already finished at the venue.
    #[error("Order {order_id} already terminal at venue")]
    AlreadyTerminal {
        /// Engine order ID.
        order_id: OrderId,
    },

    /// Connection to the venue is down.
    #[error("Venue disconnected: {0}")]
    Disconnected(String),
}

impl VenueError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Disconnected(_))
    }
}

/// Port for an external trading venue.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VenuePort: Send + Sync {
    /// Venue name for logs.
    fn name(&self) -> &'static str;

    /// Send a new order.
    async fn place_order(&self, request: &SubmitRequest) -> Result<(), VenueError>;

    /// Ask the venue to cancel an order.
    async fn cancel_order(&self, order_id: &OrderId, reason: &CancelReason)
    -> Result<(), VenueError>;

    /// Venue's view of an order.
    async fn query_order(&self, order_id: &OrderId)
    -> Result<Option<BackendOrderState>, VenueError>;

    /// Market data for venues that simulate matching. Real venues ignore it.
    async fn on_market_data(&self, _bar: &Bar) -> Result<(), VenueError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(VenueError::Transient("503".into()), true ; "transient")]
    #[test_case(VenueError::Disconnected("socket closed".into()), true ; "disconnected")]
    #[test_case(VenueError::Rejected("insufficient margin".into()), false ; "rejected")]
    #[test_case(VenueError::NotFound { order_id: OrderId::new("x") }, false ; "not found")]
    fn retryable_classification(err: VenueError, expected: bool) {
        assert_eq!(err.is_retryable(), expected);
    }
}
