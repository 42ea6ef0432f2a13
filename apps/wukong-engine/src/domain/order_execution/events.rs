//! Domain events for order execution.
//!
//! One event per status change, in the order they happened.

use serde::{Deserialize, Serialize};

use super::value_objects::{CancelReason, Fill, OrderStatus, OrderType, RejectReason, Side};
use crate::domain::shared::{OrderId, Price, Quantity, Symbol, Timestamp, VenueOrderId};

/// All possible order events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEvent {
    /// Order built from a strategy intent.
    Created(OrderCreated),
    /// Order handed to the backend.
    Submitted(OrderSubmitted),
    /// Backend or venue acknowledged the order.
    Accepted(OrderAccepted),
    /// Order partially filled.
    PartiallyFilled(OrderPartiallyFilled),
    /// Order completely filled.
    Filled(OrderFilled),
    /// Order canceled.
    Canceled(OrderCanceled),
    /// Order rejected.
    Rejected(OrderRejected),
}

impl OrderEvent {
    /// Get the order ID for this event.
    #[must_use]
    pub const fn order_id(&self) -> &OrderId {
        match self {
            Self::Created(e) => &e.order_id,
            Self::Submitted(e) => &e.order_id,
            Self::Accepted(e) => &e.order_id,
            Self::PartiallyFilled(e) => &e.order_id,
            Self::Filled(e) => &e.order_id,
            Self::Canceled(e) => &e.order_id,
            Self::Rejected(e) => &e.order_id,
        }
    }

    /// Get the timestamp when this event occurred.
    #[must_use]
    pub const fn occurred_at(&self) -> Timestamp {
        match self {
            Self::Created(e) => e.occurred_at,
            Self::Submitted(e) => e.occurred_at,
            Self::Accepted(e) => e.occurred_at,
            Self::PartiallyFilled(e) => e.occurred_at,
            Self::Filled(e) => e.occurred_at,
            Self::Canceled(e) => e.occurred_at,
            Self::Rejected(e) => e.occurred_at,
        }
    }

    /// Status the order holds right after this event.
    #[must_use]
    pub const fn status_after(&self) -> OrderStatus {
        match self {
            Self::Created(_) => OrderStatus::Created,
            Self::Submitted(_) => OrderStatus::Submitted,
            Self::Accepted(_) => OrderStatus::Pending,
            Self::PartiallyFilled(_) => OrderStatus::Partial,
            Self::Filled(_) => OrderStatus::Completed,
            Self::Canceled(_) => OrderStatus::Canceled,
            Self::Rejected(_) => OrderStatus::Rejected,
        }
    }

    /// Get the event type name.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Created(_) => "ORDER_CREATED",
            Self::Submitted(_) => "ORDER_SUBMITTED",
            Self::Accepted(_) => "ORDER_ACCEPTED",
            Self::PartiallyFilled(_) => "ORDER_PARTIALLY_FILLED",
            Self::Filled(_) => "ORDER_FILLED",
            Self::Canceled(_) => "ORDER_CANCELED",
            Self::Rejected(_) => "ORDER_REJECTED",
        }
    }
}

/// Event: order built from an intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    /// Order ID.
    pub order_id: OrderId,
    /// Symbol.
    pub symbol: Symbol,
    /// Side.
    pub side: Side,
    /// Order type.
    pub order_type: OrderType,
    /// Requested quantity.
    pub quantity: Quantity,
    /// Limit price (if applicable).
    pub limit_price: Option<Price>,
    /// Reduce-only flag.
    pub reduce_only: bool,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

/// Event: order handed to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSubmitted {
    /// Order ID.
    pub order_id: OrderId,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

/// Event: acknowledgment received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAccepted {
    /// Order ID.
    pub order_id: OrderId,
    /// Venue-assigned ID (live modes only).
    pub venue_order_id: Option<VenueOrderId>,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

/// Event: a fill left quantity open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPartiallyFilled {
    /// Order ID.
    pub order_id: OrderId,
    /// The fill applied.
    pub fill: Fill,
    /// Cumulative filled quantity.
    pub filled_quantity: Quantity,
    /// Quantity still open.
    pub leaves_quantity: Quantity,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

/// Event: a fill completed the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFilled {
    /// Order ID.
    pub order_id: OrderId,
    /// The fill applied.
    pub fill: Fill,
    /// Total filled quantity.
    pub total_quantity: Quantity,
    /// Volume-weighted average fill price.
    pub average_price: Price,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

/// Event: order canceled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCanceled {
    /// Order ID.
    pub order_id: OrderId,
    /// Cancel reason.
    pub reason: CancelReason,
    /// Quantity filled before the cancel.
    pub filled_quantity: Quantity,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

/// Event: order rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRejected {
    /// Order ID.
    pub order_id: OrderId,
    /// Rejection reason.
    pub reason: RejectReason,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> Timestamp {
        Timestamp::parse("2024-01-01T00:00:00Z").unwrap()
    }

    #[test]
    fn accessors() {
        let event = OrderEvent::Submitted(OrderSubmitted {
            order_id: OrderId::new("ORD-000001"),
            occurred_at: at(),
        });
        assert_eq!(event.order_id().as_str(), "ORD-000001");
        assert_eq!(event.occurred_at(), at());
        assert_eq!(event.event_type(), "ORDER_SUBMITTED");
        assert_eq!(event.status_after(), OrderStatus::Submitted);
    }

    #[test]
    fn serde_is_tagged() {
        let event = OrderEvent::Rejected(OrderRejected {
            order_id: OrderId::new("ORD-000002"),
            reason: RejectReason::venue("no liquidity"),
            occurred_at: at(),
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"REJECTED\""));
        let back: OrderEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
