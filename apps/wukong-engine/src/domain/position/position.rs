//! Net position for one instrument.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::Side;
use crate::domain::shared::{Price, Quantity, Symbol, Timestamp};

/// One net position per instrument.
///
/// `net_quantity` is signed: positive long, negative short. A position that
/// returns to zero keeps its last average entry price.
///
/// `reserved_quantity` is the part of the exposure already claimed by
/// working reduce-only orders; only the rest is available to new ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    symbol: Symbol,
    net_quantity: Decimal,
    reserved_quantity: Decimal,
    leverage: Decimal,
    avg_entry_price: Price,
    realized_pnl: Decimal,
    fees_paid: Decimal,
    mark_price: Option<Price>,
    updated_at: Timestamp,
}

/// Result of booking a signed fill against a position.
pub(super) struct Booking {
    pub(super) next: Position,
    /// Whether the fill pushed the position through zero.
    pub(super) crossed_zero: bool,
    /// Whether the fill grew the absolute size.
    pub(super) increased: bool,
}

impl Position {
    /// A flat position, created lazily on first fill.
    #[must_use]
    pub fn flat(symbol: Symbol, now: Timestamp) -> Self {
        Self {
            symbol,
            net_quantity: Decimal::ZERO,
            reserved_quantity: Decimal::ZERO,
            leverage: Decimal::ONE,
            avg_entry_price: Price::ZERO,
            realized_pnl: Decimal::ZERO,
            fees_paid: Decimal::ZERO,
            mark_price: None,
            updated_at: now,
        }
    }

    /// Instrument.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Long, Short, or `None` when flat.
    #[must_use]
    pub fn side(&self) -> Option<Side> {
        if self.net_quantity > Decimal::ZERO {
            Some(Side::Long)
        } else if self.net_quantity < Decimal::ZERO {
            Some(Side::Short)
        } else {
            None
        }
    }

    /// Signed net quantity.
    #[must_use]
    pub const fn net_quantity(&self) -> Decimal {
        self.net_quantity
    }

    /// Absolute size.
    #[must_use]
    pub fn quantity(&self) -> Quantity {
        Quantity::new(self.net_quantity.abs())
    }

    /// Size claimed by working reduce-only orders.
    #[must_use]
    pub const fn reserved_quantity(&self) -> Decimal {
        self.reserved_quantity
    }

    /// Size a new reduce-only order may still claim.
    #[must_use]
    pub fn available_quantity(&self) -> Decimal {
        (self.net_quantity.abs() - self.reserved_quantity).max(Decimal::ZERO)
    }

    /// Leverage of the order that last opened or grew the position.
    #[must_use]
    pub const fn leverage(&self) -> Decimal {
        self.leverage
    }

    /// Collateral held: entry notional over leverage.
    #[must_use]
    pub fn margin(&self) -> Decimal {
        self.net_quantity.abs() * self.avg_entry_price.amount() / self.leverage
    }

    /// Quantity-weighted average entry price of the open exposure.
    #[must_use]
    pub const fn avg_entry_price(&self) -> Price {
        self.avg_entry_price
    }

    /// P&L realized by reducing fills, before fees.
    #[must_use]
    pub const fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    /// Fees charged on every fill booked here.
    #[must_use]
    pub const fn fees_paid(&self) -> Decimal {
        self.fees_paid
    }

    /// Last mark, if any bar has closed since the first fill.
    #[must_use]
    pub const fn mark_price(&self) -> Option<Price> {
        self.mark_price
    }

    /// Mark-to-market P&L of the open exposure.
    #[must_use]
    pub fn unrealized_pnl(&self) -> Decimal {
        self.mark_price.map_or(Decimal::ZERO, |mark| {
            (mark.amount() - self.avg_entry_price.amount()) * self.net_quantity
        })
    }

    /// Whether the position is flat.
    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.net_quantity.is_zero()
    }

    /// Last time a fill or mark touched this position.
    #[must_use]
    pub const fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub(super) fn reserve(&mut self, quantity: Decimal) {
        self.reserved_quantity = quantity;
    }

    pub(super) fn mark(&mut self, price: Price, now: Timestamp) {
        self.mark_price = Some(price);
        self.updated_at = now;
    }

    /// Compute the position after a fill without mutating `self`.
    pub(super) fn book(
        &self,
        side: Side,
        quantity: Quantity,
        price: Price,
        fee: Decimal,
        leverage: Decimal,
        now: Timestamp,
    ) -> Booking {
        let net = self.net_quantity;
        let delta = side.signed(quantity.amount());
        let new_net = net + delta;
        let mut next = self.clone();
        next.net_quantity = new_net;
        next.fees_paid += fee;
        next.updated_at = now;
        if next.mark_price.is_none() {
            next.mark_price = Some(price);
        }

        let same_direction = net.is_zero() || (net > Decimal::ZERO) == (delta > Decimal::ZERO);
        if same_direction {
            next.leverage = leverage;
            let old_value = self.avg_entry_price.amount() * net.abs();
            next.avg_entry_price =
                Price::new((old_value + price.amount() * quantity.amount()) / new_net.abs());
            return Booking {
                next,
                crossed_zero: false,
                increased: true,
            };
        }

        let closing = quantity.amount().min(net.abs());
        let direction = if net > Decimal::ZERO {
            Decimal::ONE
        } else {
            -Decimal::ONE
        };
        next.realized_pnl += closing * (price.amount() - self.avg_entry_price.amount()) * direction;

        let crossed_zero = !new_net.is_zero() && (new_net > Decimal::ZERO) != (net > Decimal::ZERO);
        if crossed_zero {
            next.avg_entry_price = price;
            next.leverage = leverage;
        }
        Booking {
            next,
            crossed_zero,
            increased: false,
        }
    }
}
