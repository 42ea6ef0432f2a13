//! Strategy-facing API.
//!
//! A [`Strategy`] sees the engine only through the [`StrategyContext`] it is
//! handed for the duration of one callback. Handlers are synchronous and run
//! to completion before the next event is dispatched; intents they issue are
//! validated immediately and handed to the backend once the handler returns.

use crate::application::services::OrderManager;
use crate::domain::account::Account;
use crate::domain::market_data::Bar;
use crate::domain::order_execution::{Order, OrderIntent};
use crate::domain::position::Position;
use crate::domain::session::Mode;
use crate::domain::shared::{OrderId, Symbol, Timestamp};
use crate::error::{EngineError, ErrorCode};

/// User trading logic.
///
/// The same implementation runs unchanged in every [`Mode`].
pub trait Strategy: Send {
    /// Called once before the first bar.
    fn on_start(&mut self, _ctx: &mut StrategyContext<'_>) {}

    /// Called on every closed bar, after pending fills have been applied.
    fn on_bar(&mut self, ctx: &mut StrategyContext<'_>, bar: &Bar);

    /// Called after every status change of one of this strategy's orders.
    fn on_order_update(&mut self, _ctx: &mut StrategyContext<'_>, _order: &Order) {}

    /// Called once after open orders have been swept. Intents are refused.
    fn on_stop(&mut self, _ctx: &mut StrategyContext<'_>) {}
}

/// Deferred work queued by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Submit(OrderId),
    Cancel(OrderId),
}

/// Handle passed to strategy callbacks.
pub struct StrategyContext<'a> {
    manager: &'a mut OrderManager,
    commands: &'a mut Vec<Command>,
    now: Timestamp,
    running: bool,
}

impl<'a> StrategyContext<'a> {
    pub(crate) fn new(
        manager: &'a mut OrderManager,
        commands: &'a mut Vec<Command>,
        now: Timestamp,
        running: bool,
    ) -> Self {
        Self {
            manager,
            commands,
            now,
            running,
        }
    }

    /// Validate an intent and queue it for submission.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error for malformed intents, unknown
    /// instruments, reduce-only intents without matching exposure, or after
    /// the session stopped. Nothing is created in that case.
    pub fn submit_order(&mut self, intent: OrderIntent) -> Result<OrderId, EngineError> {
        self.ensure_running()?;
        let order_id = self.manager.create_order(intent, self.now)?;
        self.commands.push(Command::Submit(order_id.clone()));
        Ok(order_id)
    }

    /// Queue a cancel. The final status arrives through `on_order_update`.
    ///
    /// # Errors
    ///
    /// Returns `OrderNotFound` for unknown ids and `AlreadyTerminal` for
    /// orders that already finished.
    pub fn cancel_order(&mut self, order_id: &OrderId) -> Result<(), EngineError> {
        self.ensure_running()?;
        let order = self
            .manager
            .order(order_id)
            .ok_or_else(|| EngineError::order_not_found(order_id))?;
        if order.status().is_terminal() {
            return Err(EngineError::new(
                ErrorCode::AlreadyTerminal,
                format!("Order {order_id} already {}", order.status()),
            )
            .with_context("order_id", order_id.as_str()));
        }
        self.commands.push(Command::Cancel(order_id.clone()));
        Ok(())
    }

    /// Look up an order.
    #[must_use]
    pub fn order(&self, order_id: &OrderId) -> Option<&Order> {
        self.manager.order(order_id)
    }

    /// Orders not yet terminal.
    #[must_use]
    pub fn open_orders(&self) -> Vec<&Order> {
        self.manager.open_orders().collect()
    }

    /// Net position for an instrument.
    #[must_use]
    pub fn position(&self, symbol: &Symbol) -> Option<&Position> {
        self.manager.position(symbol)
    }

    /// All positions.
    #[must_use]
    pub fn positions(&self) -> Vec<&Position> {
        self.manager.positions().collect()
    }

    /// Cash, margin and available cash.
    #[must_use]
    pub fn account(&self) -> &Account {
        self.manager.account()
    }

    /// Current session time (bar close time in backtests).
    #[must_use]
    pub const fn now(&self) -> Timestamp {
        self.now
    }

    /// Session mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.manager.mode()
    }

    /// Instruments the session trades.
    #[must_use]
    pub fn instruments(&self) -> Vec<&Symbol> {
        self.manager.instruments().collect()
    }

    /// False once the session is shutting down.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    fn ensure_running(&self) -> Result<(), EngineError> {
        if self.running {
            Ok(())
        } else {
            Err(EngineError::new(
                ErrorCode::SessionStopped,
                "session is no longer accepting intents",
            ))
        }
    }
}
