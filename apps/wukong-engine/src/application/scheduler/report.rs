//! End-of-run summary.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::account::Account;
use crate::domain::market_data::TimeFrame;
use crate::domain::order_execution::{Fill, Order, OrderEvent, OrderStatus};
use crate::domain::position::Position;
use crate::domain::session::Mode;
use crate::domain::shared::{OrderId, SessionId};
use crate::error::EngineError;

/// What a session did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    /// Session identifier.
    pub session_id: SessionId,
    /// Mode the session ran in.
    pub mode: Mode,
    /// Bar granularity.
    pub timeframe: TimeFrame,
    /// Bars dispatched to the strategy.
    pub bars_processed: u64,
    /// Stopped early on an inconsistency.
    pub halted: bool,
    /// Orders in creation order.
    pub orders: Vec<Order>,
    /// Fills in arrival order.
    pub fills: Vec<Fill>,
    /// Final positions by instrument.
    pub positions: Vec<Position>,
    /// Cash and margin after the last change.
    pub account: Account,
    /// Reports that could not be reconciled.
    pub inconsistencies: Vec<EngineError>,
    /// Every order event, in the order it happened.
    pub events: Vec<OrderEvent>,
}

impl SessionReport {
    /// Number of orders per final status.
    #[must_use]
    pub fn status_counts(&self) -> BTreeMap<OrderStatus, usize> {
        let mut counts = BTreeMap::new();
        for order in &self.orders {
            *counts.entry(order.status()).or_insert(0) += 1;
        }
        counts
    }

    /// Statuses one order passed through, starting at `Created`.
    #[must_use]
    pub fn status_path(&self, order_id: &OrderId) -> Vec<OrderStatus> {
        self.events
            .iter()
            .filter(|e| e.order_id() == order_id)
            .map(OrderEvent::status_after)
            .collect()
    }

    /// Look up an order.
    #[must_use]
    pub fn order(&self, order_id: &OrderId) -> Option<&Order> {
        self.orders.iter().find(|o| o.id() == order_id)
    }

    /// True when every order reached a terminal status.
    #[must_use]
    pub fn all_terminal(&self) -> bool {
        self.orders.iter().all(|o| o.status().is_terminal())
    }

    /// Realized P&L summed over all positions, before fees.
    #[must_use]
    pub fn realized_pnl(&self) -> Decimal {
        self.positions.iter().map(Position::realized_pnl).sum()
    }

    /// Fees paid across all fills.
    #[must_use]
    pub fn total_fees(&self) -> Decimal {
        self.fills.iter().map(Fill::fee).sum()
    }
}
