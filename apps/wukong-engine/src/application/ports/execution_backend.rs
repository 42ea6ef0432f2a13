//! Execution Backend Port (Driven Port)
//!
//! One implementation per [`Mode`], selected when the session is built and
//! never switched. Outcomes are never returned from `submit`: every
//! acknowledgment, rejection, fill and cancel confirmation is pushed as an
//! [`ExecutionReport`] onto the session's report channel, so backtest and
//! live modes share a single downstream consumer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::domain::market_data::Bar;
use crate::domain::order_execution::{
    CancelReason, Fill, Order, OrderStatus, OrderType, RejectReason, Side,
};
use crate::domain::session::Mode;
use crate::domain::shared::{OrderId, Price, Quantity, Symbol, Timestamp, VenueOrderId};

/// Asynchronous outcome reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionReport {
    /// Order accepted into the book.
    Accepted {
        /// Engine order ID.
        order_id: OrderId,
        /// Venue-assigned ID, if any.
        venue_order_id: Option<VenueOrderId>,
        /// When the backend accepted it.
        at: Timestamp,
    },
    /// Order declined.
    Rejected {
        /// Engine order ID.
        order_id: OrderId,
        /// Why.
        reason: RejectReason,
        /// When.
        at: Timestamp,
    },
    /// Quantity matched.
    Filled {
        /// The fill.
        fill: Fill,
    },
    /// Cancel confirmed.
    Canceled {
        /// Engine order ID.
        order_id: OrderId,
        /// Why.
        reason: CancelReason,
        /// When.
        at: Timestamp,
    },
    /// No acknowledgment arrived before the deadline.
    AckTimeout {
        /// Engine order ID.
        order_id: OrderId,
        /// Deadline that elapsed, in milliseconds.
        deadline_ms: u64,
        /// When the timer fired.
        at: Timestamp,
    },
}

impl ExecutionReport {
    /// Order this report concerns.
    #[must_use]
    pub const fn order_id(&self) -> &OrderId {
        match self {
            Self::Accepted { order_id, .. }
            | Self::Rejected { order_id, .. }
            | Self::Canceled { order_id, .. }
            | Self::AckTimeout { order_id, .. } => order_id,
            Self::Filled { fill } => fill.order_id(),
        }
    }

    /// Backend-side timestamp.
    #[must_use]
    pub const fn at(&self) -> Timestamp {
        match self {
            Self::Accepted { at, .. }
            | Self::Rejected { at, .. }
            | Self::Canceled { at, .. }
            | Self::AckTimeout { at, .. } => *at,
            Self::Filled { fill } => fill.timestamp(),
        }
    }

    /// Short label for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Accepted { .. } => "accepted",
            Self::Rejected { .. } => "rejected",
            Self::Filled { .. } => "filled",
            Self::Canceled { .. } => "canceled",
            Self::AckTimeout { .. } => "ack_timeout",
        }
    }

    /// True if this report settles whether the order was acknowledged.
    #[must_use]
    pub const fn resolves_ack(&self) -> bool {
        matches!(self, Self::Accepted { .. } | Self::Rejected { .. })
    }
}

/// Sending half of the report channel.
pub type ReportSender = mpsc::UnboundedSender<ExecutionReport>;

/// Receiving half of the report channel; owned by the engine.
pub type ReportReceiver = mpsc::UnboundedReceiver<ExecutionReport>;

/// Create the single report queue a session consumes.
#[must_use]
pub fn report_channel() -> (ReportSender, ReportReceiver) {
    mpsc::unbounded_channel()
}

/// Order as handed to a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// Engine order ID.
    pub order_id: OrderId,
    /// Instrument.
    pub symbol: Symbol,
    /// Direction.
    pub side: Side,
    /// Limit or market.
    pub order_type: OrderType,
    /// Requested quantity.
    pub quantity: Quantity,
    /// Limit price (limit orders only).
    pub limit_price: Option<Price>,
    /// Reduce-only flag.
    pub reduce_only: bool,
    /// Leverage the venue should apply.
    pub leverage: rust_decimal::Decimal,
    /// Hand-off time.
    pub submitted_at: Timestamp,
}

impl From<&Order> for SubmitRequest {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id().clone(),
            symbol: order.symbol().clone(),
            side: order.side(),
            order_type: order.order_type(),
            quantity: order.quantity(),
            limit_price: order.limit_price(),
            reduce_only: order.is_reduce_only(),
            leverage: order.leverage(),
            submitted_at: order.updated_at(),
        }
    }
}

impl SubmitRequest {
    /// Shape checks every backend runs before mode-specific logic.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Rejected`] for a non-positive quantity, a limit
    /// order without a positive price, or a market order carrying a price.
    pub fn validate(&self) -> Result<(), BackendError> {
        let reject = |message: &str| BackendError::Rejected {
            order_id: self.order_id.clone(),
            reason: RejectReason::invalid_order(message),
        };

        if !self.quantity.is_positive() {
            return Err(reject("quantity must be positive"));
        }
        match (self.order_type, self.limit_price) {
            (OrderType::Limit, Some(price)) if price.is_positive() => Ok(()),
            (OrderType::Limit, _) => Err(reject("limit order requires a positive limit price")),
            (OrderType::Market, Some(_)) => Err(reject("market order must not carry a limit price")),
            (OrderType::Market, None) => Ok(()),
        }
    }
}

/// Backend's own view of an order, returned by `query`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendOrderState {
    /// Engine order ID.
    pub order_id: OrderId,
    /// Status as the backend sees it.
    pub status: OrderStatus,
    /// Quantity matched so far.
    pub filled_quantity: Quantity,
}

/// Backend port error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Submission declined synchronously.
    #[error("Order {order_id} rejected: {reason}")]
    Rejected {
        /// Engine order ID.
        order_id: OrderId,
        /// Why.
        reason: RejectReason,
    },

    /// Nothing left to cancel; the final report is already queued.
    #[error("Order {order_id} already terminal")]
    AlreadyTerminal {
        /// Engine order ID.
        order_id: OrderId,
    },

    /// Backend has never seen this order.
    #[error("Order {order_id} unknown to backend")]
    UnknownOrder {
        /// Engine order ID.
        order_id: OrderId,
    },

    /// Backend cannot serve requests.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Port implemented once per execution mode.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Mode this backend serves.
    fn mode(&self) -> Mode;

    /// Name for logs.
    fn name(&self) -> &str;

    /// Hand an order to the backend.
    ///
    /// `Ok` means the backend took responsibility for the order; acceptance
    /// arrives later as [`ExecutionReport::Accepted`].
    async fn submit(&self, request: SubmitRequest) -> Result<(), BackendError>;

    /// Request cancellation; the confirmation is reported asynchronously.
    ///
    /// Returns [`BackendError::AlreadyTerminal`] when the order's final report
    /// is already on its way.
    async fn cancel(&self, order_id: &OrderId, reason: CancelReason) -> Result<(), BackendError>;

    /// Backend's view of an order.
    async fn query(&self, order_id: &OrderId) -> Result<Option<BackendOrderState>, BackendError>;

    /// Observe a closed bar. Simulated backends match resting orders here.
    async fn on_bar(&self, _bar: &Bar) -> Result<(), BackendError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::OrderIntent;
    use crate::domain::shared::FillId;
    use rust_decimal_macros::dec;

    fn request(order_type: OrderType, quantity: Quantity, limit: Option<Price>) -> SubmitRequest {
        SubmitRequest {
            order_id: OrderId::new("ORD-000001"),
            symbol: Symbol::new("BTCUSDT"),
            side: Side::Long,
            order_type,
            quantity,
            limit_price: limit,
            reduce_only: false,
            leverage: rust_decimal::Decimal::ONE,
            submitted_at: Timestamp::from_millis(0).unwrap(),
        }
    }

    #[test]
    fn request_from_order_copies_fields() {
        let intent = OrderIntent::limit(
            "ETHUSDT",
            Side::Short,
            Quantity::from_i64(5),
            Price::from_i64(50),
        )
        .reduce_only();
        let now = Timestamp::from_millis(60_000).unwrap();
        let order = Order::new(OrderId::new("ORD-7"), intent, now).unwrap();

        let req = SubmitRequest::from(&order);
        assert_eq!(req.order_id.as_str(), "ORD-7");
        assert_eq!(req.limit_price, Some(Price::from_i64(50)));
        assert!(req.reduce_only);
        assert_eq!(req.submitted_at, now);
    }

    #[test]
    fn validate_accepts_well_formed() {
        assert!(request(OrderType::Market, Quantity::from_i64(1), None).validate().is_ok());
        assert!(
            request(OrderType::Limit, Quantity::from_i64(1), Some(Price::from_i64(10)))
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn validate_rejects_bad_shapes() {
        let zero = request(OrderType::Market, Quantity::ZERO, None).validate();
        assert!(matches!(zero, Err(BackendError::Rejected { .. })));

        let no_price = request(OrderType::Limit, Quantity::from_i64(1), None).validate();
        assert!(matches!(no_price, Err(BackendError::Rejected { .. })));

        let priced_market =
            request(OrderType::Market, Quantity::from_i64(1), Some(Price::from_i64(1))).validate();
        assert!(matches!(priced_market, Err(BackendError::Rejected { .. })));
    }

    #[test]
    fn report_accessors() {
        let at = Timestamp::from_millis(120_000).unwrap();
        let fill = Fill::new(
            FillId::new("FILL-000001"),
            OrderId::new("ORD-1"),
            Quantity::new(dec!(2.5)),
            Price::from_i64(100),
            at,
        );
        let report = ExecutionReport::Filled { fill };
        assert_eq!(report.order_id().as_str(), "ORD-1");
        assert_eq!(report.at(), at);
        assert_eq!(report.kind(), "filled");
        assert!(!report.resolves_ack());
    }

    #[test]
    fn report_serializes_with_tag() {
        let report = ExecutionReport::AckTimeout {
            order_id: OrderId::new("ORD-1"),
            deadline_ms: 5_000,
            at: Timestamp::from_millis(0).unwrap(),
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"type\":\"ACK_TIMEOUT\""));
    }
}
