//! Order Aggregate Root
//!
//! Owns one order's lifecycle. Every status change goes through
//! [`OrderStateMachine`] and records an [`OrderEvent`]. Timestamps are
//! supplied by the caller so backtests run on simulated time.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::OrderIntent;
use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::events::{
    OrderAccepted, OrderCanceled, OrderCreated, OrderEvent, OrderFilled, OrderPartiallyFilled,
    OrderRejected, OrderSubmitted,
};
use crate::domain::order_execution::services::OrderStateMachine;
use crate::domain::order_execution::value_objects::{
    CancelReason, Fill, FillProgress, OrderStatus, OrderType, RejectReason, Side,
};
use crate::domain::shared::{OrderId, Price, Quantity, Symbol, Timestamp, VenueOrderId};

/// Order Aggregate Root.
#[allow(clippy::struct_field_names)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    symbol: Symbol,
    side: Side,
    order_type: OrderType,
    quantity: Quantity,
    limit_price: Option<Price>,
    reduce_only: bool,
    leverage: Decimal,
    status: OrderStatus,
    progress: FillProgress,
    venue_order_id: Option<VenueOrderId>,
    reject_reason: Option<RejectReason>,
    cancel_reason: Option<CancelReason>,
    cancel_requested: bool,
    #[serde(skip)]
    events: Vec<OrderEvent>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Order {
    /// Create an order in `Created` status from a validated intent.
    ///
    /// Generates an `OrderCreated` event.
    ///
    /// # Errors
    ///
    /// Returns error if intent validation fails.
    pub fn new(id: OrderId, intent: OrderIntent, now: Timestamp) -> Result<Self, OrderError> {
        intent.validate()?;

        let mut order = Self {
            id: id.clone(),
            symbol: intent.symbol.clone(),
            side: intent.side,
            order_type: intent.order_type,
            quantity: intent.quantity,
            limit_price: intent.limit_price,
            reduce_only: intent.reduce_only,
            leverage: intent.leverage,
            status: OrderStatus::Created,
            progress: FillProgress::new(intent.quantity),
            venue_order_id: None,
            reject_reason: None,
            cancel_reason: None,
            cancel_requested: false,
            events: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        order.events.push(OrderEvent::Created(OrderCreated {
            order_id: id,
            symbol: intent.symbol,
            side: intent.side,
            order_type: intent.order_type,
            quantity: intent.quantity,
            limit_price: intent.limit_price,
            reduce_only: intent.reduce_only,
            occurred_at: now,
        }));

        Ok(order)
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// Get the order ID.
    #[must_use]
    pub const fn id(&self) -> &OrderId {
        &self.id
    }

    /// Get the symbol.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Get the side.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Get the order type.
    #[must_use]
    pub const fn order_type(&self) -> OrderType {
        self.order_type
    }

    /// Get the requested quantity.
    #[must_use]
    pub const fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Get the limit price.
    #[must_use]
    pub const fn limit_price(&self) -> Option<Price> {
        self.limit_price
    }

    /// Whether the order may only shrink exposure.
    #[must_use]
    pub const fn is_reduce_only(&self) -> bool {
        self.reduce_only
    }

    /// Leverage the order trades with.
    #[must_use]
    pub const fn leverage(&self) -> Decimal {
        self.leverage
    }

    /// Margin the open quantity would tie up at `price`.
    ///
    /// Reduce-only orders release margin rather than consume it, so they
    /// reserve nothing.
    #[must_use]
    pub fn margin_at(&self, price: Price) -> Decimal {
        if self.reduce_only {
            return Decimal::ZERO;
        }
        self.progress.leaves().amount() * price.amount() / self.leverage
    }

    /// Get the current status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Cumulative filled quantity.
    #[must_use]
    pub const fn filled_quantity(&self) -> Quantity {
        self.progress.filled()
    }

    /// Quantity still open.
    #[must_use]
    pub const fn leaves_quantity(&self) -> Quantity {
        self.progress.leaves()
    }

    /// Volume-weighted average fill price.
    #[must_use]
    pub const fn average_fill_price(&self) -> Option<Price> {
        self.progress.avg_price()
    }

    /// Fills in arrival order.
    #[must_use]
    pub fn fills(&self) -> &[Fill] {
        self.progress.fills()
    }

    /// Full fill bookkeeping.
    #[must_use]
    pub const fn progress(&self) -> &FillProgress {
        &self.progress
    }

    /// Venue-assigned ID, once acknowledged by a venue.
    #[must_use]
    pub const fn venue_order_id(&self) -> Option<&VenueOrderId> {
        self.venue_order_id.as_ref()
    }

    /// Why the order was rejected.
    #[must_use]
    pub const fn reject_reason(&self) -> Option<&RejectReason> {
        self.reject_reason.as_ref()
    }

    /// Why the order was canceled.
    #[must_use]
    pub const fn cancel_reason(&self) -> Option<&CancelReason> {
        self.cancel_reason.as_ref()
    }

    /// A cancel is waiting for the acknowledgment to arrive.
    #[must_use]
    pub const fn cancel_requested(&self) -> bool {
        self.cancel_requested
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Get the last update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    // ========================================================================
    // State Transitions
    // ========================================================================

    /// Record the hand-off to a backend.
    ///
    /// # Errors
    ///
    /// Returns error unless the order is `Created`.
    pub fn mark_submitted(&mut self, now: Timestamp) -> Result<(), OrderError> {
        self.transition(OrderStatus::Submitted, now)?;
        self.events.push(OrderEvent::Submitted(OrderSubmitted {
            order_id: self.id.clone(),
            occurred_at: now,
        }));
        Ok(())
    }

    /// Record the backend or venue acknowledgment.
    ///
    /// # Errors
    ///
    /// Returns error unless the order is `Submitted`.
    pub fn accept(
        &mut self,
        venue_order_id: Option<VenueOrderId>,
        now: Timestamp,
    ) -> Result<(), OrderError> {
        self.transition(OrderStatus::Pending, now)?;
        self.venue_order_id.clone_from(&venue_order_id);
        self.events.push(OrderEvent::Accepted(OrderAccepted {
            order_id: self.id.clone(),
            venue_order_id,
            occurred_at: now,
        }));
        Ok(())
    }

    /// Reject the order.
    ///
    /// # Errors
    ///
    /// Returns error unless the order is `Submitted`.
    pub fn reject(&mut self, reason: RejectReason, now: Timestamp) -> Result<(), OrderError> {
        self.transition(OrderStatus::Rejected, now)?;
        self.reject_reason = Some(reason.clone());
        self.events.push(OrderEvent::Rejected(OrderRejected {
            order_id: self.id.clone(),
            reason,
            occurred_at: now,
        }));
        Ok(())
    }

    /// Check whether a fill of `quantity` could be applied right now.
    ///
    /// # Errors
    ///
    /// Returns error if the order is not working or the fill exceeds leaves.
    pub fn check_fill(&self, quantity: Quantity) -> Result<(), OrderError> {
        if !self.status.can_fill() {
            return Err(OrderError::CannotFill {
                order_id: self.id.clone(),
                status: self.status,
            });
        }
        self.progress
            .check(quantity)
            .map_err(|_| OrderError::FillExceedsRemaining {
                order_id: self.id.clone(),
                fill_qty: quantity,
                remaining_qty: self.progress.leaves(),
            })
    }

    /// Apply a fill.
    ///
    /// Generates `OrderPartiallyFilled` or `OrderFilled`.
    ///
    /// # Errors
    ///
    /// Returns error if the fill belongs to another order, the order is not
    /// working, or the fill exceeds the open quantity.
    pub fn apply_fill(&mut self, fill: Fill, now: Timestamp) -> Result<(), OrderError> {
        if fill.order_id() != &self.id {
            return Err(OrderError::invalid(
                "order_id",
                format!("fill for {} applied to {}", fill.order_id(), self.id),
            ));
        }
        self.check_fill(fill.quantity())?;

        let target = if fill.quantity() == self.progress.leaves() {
            OrderStatus::Completed
        } else {
            OrderStatus::Partial
        };
        OrderStateMachine::validate_transition(self.status, target)?;

        self.progress
            .apply(fill.clone())
            .map_err(|_| OrderError::FillExceedsRemaining {
                order_id: self.id.clone(),
                fill_qty: fill.quantity(),
                remaining_qty: self.progress.leaves(),
            })?;
        self.status = target;
        self.updated_at = now;

        let event = if target == OrderStatus::Completed {
            OrderEvent::Filled(OrderFilled {
                order_id: self.id.clone(),
                total_quantity: self.progress.filled(),
                average_price: self.progress.avg_price().unwrap_or(fill.price()),
                fill,
                occurred_at: now,
            })
        } else {
            OrderEvent::PartiallyFilled(OrderPartiallyFilled {
                order_id: self.id.clone(),
                filled_quantity: self.progress.filled(),
                leaves_quantity: self.progress.leaves(),
                fill,
                occurred_at: now,
            })
        };
        self.events.push(event);
        Ok(())
    }

    /// Flag a cancel for an order the backend has not acknowledged yet.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyTerminal` if nothing is left to cancel.
    pub fn request_cancel(&mut self) -> Result<(), OrderError> {
        if self.status.is_terminal() {
            return Err(OrderError::AlreadyTerminal {
                order_id: self.id.clone(),
                status: self.status,
            });
        }
        self.cancel_requested = true;
        Ok(())
    }

    /// Cancel the order.
    ///
    /// Generates an `OrderCanceled` event.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyTerminal` for terminal orders, or a transition error
    /// if the order is not yet working.
    pub fn cancel(&mut self, reason: CancelReason, now: Timestamp) -> Result<(), OrderError> {
        if self.status.is_terminal() {
            return Err(OrderError::AlreadyTerminal {
                order_id: self.id.clone(),
                status: self.status,
            });
        }
        self.transition(OrderStatus::Canceled, now)?;
        self.cancel_reason = Some(reason.clone());
        self.events.push(OrderEvent::Canceled(OrderCanceled {
            order_id: self.id.clone(),
            reason,
            filled_quantity: self.progress.filled(),
            occurred_at: now,
        }));
        Ok(())
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Drain accumulated domain events.
    pub fn drain_events(&mut self) -> Vec<OrderEvent> {
        std::mem::take(&mut self.events)
    }

    /// Get pending events without draining.
    #[must_use]
    pub fn pending_events(&self) -> &[OrderEvent] {
        &self.events
    }

    fn transition(&mut self, to: OrderStatus, now: Timestamp) -> Result<(), OrderError> {
        OrderStateMachine::validate_transition(self.status, to)?;
        self.status = to;
        self.updated_at = now;
        Ok(())
    }
}
