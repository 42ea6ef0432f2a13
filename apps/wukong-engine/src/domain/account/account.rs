//! Account snapshot: cash, margin and what is left to trade with.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::position::Position;

/// Funding rules for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSettings {
    /// Cash at session start.
    pub initial_cash: Decimal,
    /// Highest leverage an intent may ask for.
    pub max_leverage: Decimal,
    /// Refuse exposure-increasing intents whose margin exceeds available cash.
    pub check_margin: bool,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            initial_cash: Decimal::ZERO,
            max_leverage: Decimal::from(100),
            check_margin: false,
        }
    }
}

/// Account state derived from positions and working orders.
///
/// Cash moves only with realized P&L and fees. Margin is the collateral
/// held by open positions plus the collateral reserved by working orders
/// that could add exposure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    initial_cash: Decimal,
    cash: Decimal,
    position_margin: Decimal,
    order_margin: Decimal,
    pos_pnl: Decimal,
}

impl Account {
    /// Account holding `initial_cash` and nothing else.
    #[must_use]
    pub const fn new(initial_cash: Decimal) -> Self {
        Self {
            initial_cash,
            cash: initial_cash,
            position_margin: Decimal::ZERO,
            order_margin: Decimal::ZERO,
            pos_pnl: Decimal::ZERO,
        }
    }

    /// Cash at session start.
    #[must_use]
    pub const fn initial_cash(&self) -> Decimal {
        self.initial_cash
    }

    /// Initial cash plus realized P&L, minus fees.
    #[must_use]
    pub const fn cash(&self) -> Decimal {
        self.cash
    }

    /// Margin held by positions and working orders.
    #[must_use]
    pub fn margin(&self) -> Decimal {
        self.position_margin + self.order_margin
    }

    /// Margin held by open positions.
    #[must_use]
    pub const fn position_margin(&self) -> Decimal {
        self.position_margin
    }

    /// Margin reserved by working orders.
    #[must_use]
    pub const fn order_margin(&self) -> Decimal {
        self.order_margin
    }

    /// Unrealized P&L of every open position at its last mark.
    #[must_use]
    pub const fn pos_pnl(&self) -> Decimal {
        self.pos_pnl
    }

    /// Cash plus unrealized P&L.
    #[must_use]
    pub fn equity(&self) -> Decimal {
        self.cash + self.pos_pnl
    }

    /// Equity not tied up as margin. May go negative on losses.
    #[must_use]
    pub fn avail_cash(&self) -> Decimal {
        self.equity() - self.margin()
    }

    /// Recompute from the current positions and the working-order margin.
    pub fn revalue<'a>(
        &mut self,
        positions: impl IntoIterator<Item = &'a Position>,
        order_margin: Decimal,
    ) {
        let mut cash = self.initial_cash;
        let mut position_margin = Decimal::ZERO;
        let mut pos_pnl = Decimal::ZERO;
        for position in positions {
            cash += position.realized_pnl() - position.fees_paid();
            position_margin += position.margin();
            pos_pnl += position.unrealized_pnl();
        }
        self.cash = cash;
        self.position_margin = position_margin;
        self.order_margin = order_margin;
        self.pos_pnl = pos_pnl;
    }
}

impl Default for Account {
    fn default() -> Self {
        Self::new(Decimal::ZERO)
    }
}
