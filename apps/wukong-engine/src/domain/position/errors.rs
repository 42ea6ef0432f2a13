//! Ledger errors.

use rust_decimal::Decimal;
use std::fmt;

use crate::domain::order_execution::Side;
use crate::domain::shared::{OrderId, Quantity, Symbol};

/// Errors raised while booking a fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A reduce-only fill would grow the position or flip its sign.
    ReduceOnlyViolation {
        /// Originating order.
        order_id: OrderId,
        /// Instrument.
        symbol: Symbol,
        /// Signed net quantity before the fill.
        net_before: Decimal,
        /// Fill side.
        side: Side,
        /// Fill quantity.
        fill_quantity: Quantity,
    },

    /// Fill quantity was not positive.
    EmptyFill {
        /// Originating order.
        order_id: OrderId,
    },
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReduceOnlyViolation {
                order_id,
                symbol,
                net_before,
                side,
                fill_quantity,
            } => write!(
                f,
                "Reduce-only violation on {symbol}: {side} fill of {fill_quantity} from order {order_id} against net {net_before}"
            ),
            Self::EmptyFill { order_id } => {
                write!(f, "Fill from order {order_id} has no quantity")
            }
        }
    }
}

impl std::error::Error for LedgerError {}
