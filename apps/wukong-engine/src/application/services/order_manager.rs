//! Order Manager
//!
//! Single writer of order and position state for a session. Strategy
//! intents enter through [`OrderManager::create_order`]; everything after the
//! hand-off arrives as an [`ExecutionReport`] and is applied here strictly in
//! arrival order. The manager never retries and never talks to a backend; it
//! records outcomes and tells the caller what follow-up the backend needs.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use rust_decimal::Decimal;

use crate::application::ports::{ExecutionReport, SubmitRequest};
use crate::domain::account::{Account, AccountSettings};
use crate::domain::market_data::Bar;
use crate::domain::order_execution::{
    CancelReason, Fill, Order, OrderEvent, OrderIntent, OrderStatus, RejectReason, Side,
};
use crate::domain::position::{Position, PositionLedger};
use crate::domain::session::Mode;
use crate::domain::shared::{IdSequence, OrderId, Price, Symbol, Timestamp, VenueOrderId};
use crate::error::{EngineError, ErrorCode};

/// What the caller should do with a strategy cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelAction {
    /// Order is working; send the cancel to the backend now.
    Forward,
    /// Order is not acknowledged yet; the cancel goes out with the ack.
    Deferred,
}

/// Backend work triggered by a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    /// A deferred strategy cancel can now be sent.
    ForwardCancel(OrderId),
    /// The venue holds an order the engine already closed; cancel it there.
    VenueCancel(OrderId),
}

/// Result of applying one report.
#[derive(Debug, Clone)]
pub enum ReportOutcome {
    /// The order changed status.
    Updated {
        /// Snapshot after the change.
        order: Box<Order>,
        /// Fill that caused the change, if any.
        fill: Option<Fill>,
        /// Backend work to do next.
        follow_up: Option<FollowUp>,
    },
    /// A fill could not be booked and the order was closed instead.
    ///
    /// The error is already recorded in [`OrderManager::inconsistencies`].
    Closed {
        /// Snapshot after the close.
        order: Box<Order>,
        /// Why the fill was refused.
        error: EngineError,
        /// Backend work to do next.
        follow_up: Option<FollowUp>,
    },
    /// Report was late or redundant and changed nothing.
    Ignored {
        /// Order the report named.
        order_id: OrderId,
        /// Backend work to do next.
        follow_up: Option<FollowUp>,
    },
}

/// Owns every order, the position ledger and the account for one session.
#[derive(Debug)]
pub struct OrderManager {
    mode: Mode,
    instruments: BTreeSet<Symbol>,
    orders: BTreeMap<OrderId, Order>,
    creation_order: Vec<OrderId>,
    ledger: PositionLedger,
    account: Account,
    account_settings: AccountSettings,
    last_prices: BTreeMap<Symbol, Price>,
    order_ids: IdSequence,
    journal: Vec<OrderEvent>,
    fills: Vec<Fill>,
    inconsistencies: Vec<EngineError>,
}

impl OrderManager {
    /// Create a manager for a session trading `instruments`.
    ///
    /// Backtests number orders `ORD-000001`, `ORD-000002`, ...; live modes
    /// draw random ids.
    pub fn new(mode: Mode, instruments: impl IntoIterator<Item = Symbol>) -> Self {
        let order_ids = if mode.is_simulated() {
            IdSequence::sequential("ORD")
        } else {
            IdSequence::random()
        };
        Self {
            mode,
            instruments: instruments.into_iter().collect(),
            orders: BTreeMap::new(),
            creation_order: Vec::new(),
            ledger: PositionLedger::new(),
            account: Account::default(),
            account_settings: AccountSettings::default(),
            last_prices: BTreeMap::new(),
            order_ids,
            journal: Vec::new(),
            fills: Vec::new(),
            inconsistencies: Vec::new(),
        }
    }

    /// Fund the account and set its leverage and margin rules.
    #[must_use]
    pub fn with_account(mut self, settings: AccountSettings) -> Self {
        self.account = Account::new(settings.initial_cash);
        self.account_settings = settings;
        self
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Session mode.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Instruments the session may trade.
    pub fn instruments(&self) -> impl Iterator<Item = &Symbol> {
        self.instruments.iter()
    }

    /// Look up an order.
    #[must_use]
    pub fn order(&self, order_id: &OrderId) -> Option<&Order> {
        self.orders.get(order_id)
    }

    /// All orders in creation order.
    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.creation_order
            .iter()
            .filter_map(|id| self.orders.get(id))
    }

    /// Orders not yet terminal, in creation order.
    pub fn open_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders().filter(|o| o.status().is_open())
    }

    /// Ids of orders not yet terminal.
    #[must_use]
    pub fn open_order_ids(&self) -> Vec<OrderId> {
        self.open_orders().map(|o| o.id().clone()).collect()
    }

    /// Position for an instrument, if it has ever been filled.
    #[must_use]
    pub fn position(&self, symbol: &Symbol) -> Option<&Position> {
        self.ledger.position(symbol)
    }

    /// All positions.
    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.ledger.positions()
    }

    /// Cash, margin and available cash as of the last change.
    #[must_use]
    pub const fn account(&self) -> &Account {
        &self.account
    }

    /// Fills applied so far, in arrival order.
    #[must_use]
    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    /// Every order event recorded this session.
    #[must_use]
    pub fn journal(&self) -> &[OrderEvent] {
        &self.journal
    }

    /// Reports that could not be reconciled.
    #[must_use]
    pub fn inconsistencies(&self) -> &[EngineError] {
        &self.inconsistencies
    }

    // ========================================================================
    // Strategy-side commands
    // ========================================================================

    /// Validate an intent and create the order in `Created`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed intents, instruments outside
    /// the session, leverage above the account limit, reduce-only intents
    /// that do not face enough unreserved opposite exposure, or (when margin
    /// checks are on) intents the account cannot fund.
    pub fn create_order(
        &mut self,
        intent: OrderIntent,
        now: Timestamp,
    ) -> Result<OrderId, EngineError> {
        intent.validate()?;

        if !self.instruments.contains(&intent.symbol) {
            return Err(EngineError::new(
                ErrorCode::UnknownInstrument,
                format!("{} is not traded in this session", intent.symbol),
            )
            .with_context("symbol", intent.symbol.as_str()));
        }

        if intent.leverage > self.account_settings.max_leverage {
            return Err(EngineError::invalid_order(format!(
                "leverage {} exceeds the account limit of {}",
                intent.leverage, self.account_settings.max_leverage
            ))
            .with_context("field", "leverage"));
        }

        if intent.reduce_only {
            self.check_reduce_only(&intent)?;
        } else if self.account_settings.check_margin {
            self.check_margin(&intent)?;
        }

        let symbol = intent.symbol.clone();
        let order_id = OrderId::new(self.order_ids.next_id());
        let mut order = Order::new(order_id.clone(), intent, now)?;
        self.journal.extend(order.drain_events());
        self.orders.insert(order_id.clone(), order);
        self.creation_order.push(order_id.clone());
        self.refresh(&symbol);
        Ok(order_id)
    }

    /// Reduce-only intents may only claim opposite exposure that working
    /// reduce-only orders have not already claimed.
    fn check_reduce_only(&self, intent: &OrderIntent) -> Result<(), EngineError> {
        let net = self.ledger.net_quantity(&intent.symbol);
        let exposure = intent.side.opposite().signed(net.abs());
        if net.is_zero() || net != exposure {
            return Err(EngineError::new(
                ErrorCode::ReduceOnlyExposure,
                format!(
                    "reduce-only {} on {} has no opposite exposure (net {net})",
                    intent.side, intent.symbol
                ),
            )
            .with_context("symbol", intent.symbol.as_str()));
        }

        let reserved = self.reserved_by(&intent.symbol, intent.side);
        let available = (net.abs() - reserved).max(Decimal::ZERO);
        if intent.quantity.amount() > available {
            return Err(EngineError::new(
                ErrorCode::ReduceOnlyExposure,
                format!(
                    "reduce-only quantity {} exceeds available exposure {available} on {} \
                     ({reserved} of {} already claimed)",
                    intent.quantity,
                    intent.symbol,
                    net.abs()
                ),
            )
            .with_context("symbol", intent.symbol.as_str()));
        }
        Ok(())
    }

    fn check_margin(&self, intent: &OrderIntent) -> Result<(), EngineError> {
        let Some(price) = intent
            .limit_price
            .or_else(|| self.last_prices.get(&intent.symbol).copied())
        else {
            tracing::debug!(symbol = %intent.symbol, "No reference price yet; margin not checked");
            return Ok(());
        };
        let required = intent.quantity.amount() * price.amount() / intent.leverage;
        let available = self.account.avail_cash();
        if required > available {
            return Err(EngineError::new(
                ErrorCode::InsufficientMargin,
                format!(
                    "{} {} on {} needs margin {required} but only {available} is available",
                    intent.side, intent.quantity, intent.symbol
                ),
            )
            .with_context("symbol", intent.symbol.as_str()));
        }
        Ok(())
    }

    /// Open quantity of working reduce-only orders on `symbol` trading `side`.
    fn reserved_by(&self, symbol: &Symbol, side: Side) -> Decimal {
        self.open_orders()
            .filter(|o| o.is_reduce_only() && o.symbol() == symbol && o.side() == side)
            .map(|o| o.leaves_quantity().amount())
            .sum()
    }

    /// Margin working orders tie up at their limit or the last close.
    fn order_margin(&self) -> Decimal {
        self.open_orders()
            .filter_map(|o| {
                let price = o
                    .limit_price()
                    .or_else(|| self.last_prices.get(o.symbol()).copied())?;
                Some(o.margin_at(price))
            })
            .sum()
    }

    /// Bring the position's reserved size and the account up to date.
    fn refresh(&mut self, symbol: &Symbol) {
        let reserved = self
            .ledger
            .position(symbol)
            .and_then(Position::side)
            .map_or(Decimal::ZERO, |side| self.reserved_by(symbol, side.opposite()));
        self.ledger.reserve(symbol, reserved);
        let order_margin = self.order_margin();
        self.account.revalue(self.ledger.positions(), order_margin);
    }

    /// Move a created order to `Submitted` and build the backend request.
    ///
    /// # Errors
    ///
    /// Returns an error if the order is unknown or not in `Created`.
    pub fn mark_submitted(
        &mut self,
        order_id: &OrderId,
        now: Timestamp,
    ) -> Result<SubmitRequest, EngineError> {
        let order = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| EngineError::order_not_found(order_id))?;
        order.mark_submitted(now)?;
        self.journal.extend(order.drain_events());
        Ok(SubmitRequest::from(&*order))
    }

    /// Reject an order the backend refused at hand-off.
    ///
    /// # Errors
    ///
    /// Returns an error if the order is unknown or not in `Submitted`.
    pub fn reject_submission(
        &mut self,
        order_id: &OrderId,
        reason: RejectReason,
        now: Timestamp,
    ) -> Result<Order, EngineError> {
        let order = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| EngineError::order_not_found(order_id))?;
        order.reject(reason, now)?;
        self.journal.extend(order.drain_events());
        let snapshot = order.clone();
        self.refresh(snapshot.symbol());
        Ok(snapshot)
    }

    /// Register a cancel request.
    ///
    /// # Errors
    ///
    /// Returns `OrderNotFound` or `AlreadyTerminal`.
    pub fn request_cancel(&mut self, order_id: &OrderId) -> Result<CancelAction, EngineError> {
        let order = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| EngineError::order_not_found(order_id))?;
        order.request_cancel()?;
        if order.status().is_cancelable() {
            Ok(CancelAction::Forward)
        } else {
            Ok(CancelAction::Deferred)
        }
    }

    // ========================================================================
    // Report application
    // ========================================================================

    /// Apply one backend report.
    ///
    /// # Errors
    ///
    /// Returns an inconsistency error, already recorded in
    /// [`Self::inconsistencies`], when the report names an unknown order,
    /// fills a terminal order, overfills, breaches reduce-only, or does not
    /// fit the order's status. State is left untouched in that case.
    pub fn apply_report(
        &mut self,
        report: ExecutionReport,
        now: Timestamp,
    ) -> Result<ReportOutcome, EngineError> {
        let result = match report {
            ExecutionReport::Accepted {
                order_id,
                venue_order_id,
                ..
            } => self.on_accepted(order_id, venue_order_id, now),
            ExecutionReport::Rejected {
                order_id, reason, ..
            } => self.on_rejected(order_id, reason, now),
            ExecutionReport::Filled { fill } => self.on_filled(fill, now),
            ExecutionReport::Canceled {
                order_id, reason, ..
            } => self.on_canceled(order_id, reason, now),
            ExecutionReport::AckTimeout {
                order_id,
                deadline_ms,
                ..
            } => Ok(self.on_ack_timeout(order_id, deadline_ms, now)),
        };

        if let Err(err) = &result {
            self.inconsistencies.push(err.clone());
        }
        result
    }

    fn on_accepted(
        &mut self,
        order_id: OrderId,
        venue_order_id: Option<VenueOrderId>,
        now: Timestamp,
    ) -> Result<ReportOutcome, EngineError> {
        let order = self.known_order(&order_id, "acknowledgment")?;

        match order.status() {
            OrderStatus::Submitted => {}
            OrderStatus::Rejected => {
                tracing::info!(
                    order_id = %order_id,
                    "Late acknowledgment for rejected order ignored"
                );
                return Ok(ReportOutcome::Ignored {
                    order_id,
                    follow_up: None,
                });
            }
            status => {
                tracing::debug!(order_id = %order_id, %status, "Redundant acknowledgment ignored");
                return Ok(ReportOutcome::Ignored {
                    order_id,
                    follow_up: None,
                });
            }
        }

        order.accept(venue_order_id, now)?;
        let follow_up = order
            .cancel_requested()
            .then(|| FollowUp::ForwardCancel(order_id.clone()));
        Ok(self.updated(&order_id, None, follow_up))
    }

    fn on_rejected(
        &mut self,
        order_id: OrderId,
        reason: RejectReason,
        now: Timestamp,
    ) -> Result<ReportOutcome, EngineError> {
        let order = self.known_order(&order_id, "rejection")?;

        if order.status().is_terminal() {
            tracing::info!(order_id = %order_id, status = %order.status(), "Late rejection ignored");
            return Ok(ReportOutcome::Ignored {
                order_id,
                follow_up: None,
            });
        }
        if order.status() != OrderStatus::Submitted {
            return Err(EngineError::inconsistency(
                ErrorCode::UnexpectedReport,
                &order_id,
                format!("rejection for order in {}", order.status()),
            ));
        }

        order.reject(reason, now)?;
        Ok(self.updated(&order_id, None, None))
    }

    fn on_filled(&mut self, fill: Fill, now: Timestamp) -> Result<ReportOutcome, EngineError> {
        let order_id = fill.order_id().clone();
        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| unknown_order(&order_id, "fill"))?;

        order.check_fill(fill.quantity())?;
        if let Err(violation) = self.ledger.apply(order, &fill) {
            return self.close_unbookable(&order_id, violation.into(), now);
        }
        order.apply_fill(fill.clone(), now)?;
        self.fills.push(fill.clone());
        Ok(self.updated(&order_id, Some(fill), None))
    }

    /// The backend treats a filled order as done even when the ledger
    /// refused the fill, so close the order here and cancel whatever the
    /// venue still holds.
    fn close_unbookable(
        &mut self,
        order_id: &OrderId,
        error: EngineError,
        now: Timestamp,
    ) -> Result<ReportOutcome, EngineError> {
        let Some(order) = self.orders.get_mut(order_id) else {
            return Err(error);
        };
        if let Err(cancel_err) = order.cancel(CancelReason::reduce_only_violation(), now) {
            tracing::error!(order_id = %order_id, error = %cancel_err, "Failed to close order after refused fill");
            return Err(error);
        }
        tracing::warn!(order_id = %order_id, error = %error, "Fill refused; order closed");
        self.inconsistencies.push(error.clone());

        match self.updated(order_id, None, Some(FollowUp::VenueCancel(order_id.clone()))) {
            ReportOutcome::Updated {
                order, follow_up, ..
            } => Ok(ReportOutcome::Closed {
                order,
                error,
                follow_up,
            }),
            other => Ok(other),
        }
    }

    fn on_canceled(
        &mut self,
        order_id: OrderId,
        reason: CancelReason,
        now: Timestamp,
    ) -> Result<ReportOutcome, EngineError> {
        let order = self.known_order(&order_id, "cancel confirmation")?;

        if order.status().is_terminal() {
            tracing::info!(
                order_id = %order_id,
                status = %order.status(),
                "Cancel confirmation after terminal status ignored"
            );
            return Ok(ReportOutcome::Ignored {
                order_id,
                follow_up: None,
            });
        }
        if !order.status().is_cancelable() {
            return Err(EngineError::inconsistency(
                ErrorCode::UnexpectedReport,
                &order_id,
                format!("cancel confirmation for order in {}", order.status()),
            ));
        }

        order.cancel(reason, now)?;
        Ok(self.updated(&order_id, None, None))
    }

    fn on_ack_timeout(&mut self, order_id: OrderId, deadline_ms: u64, now: Timestamp) -> ReportOutcome {
        let Some(order) = self.orders.get_mut(&order_id) else {
            tracing::warn!(order_id = %order_id, "Acknowledgment timer fired for unknown order");
            return ReportOutcome::Ignored {
                order_id,
                follow_up: None,
            };
        };
        if order.status() != OrderStatus::Submitted {
            return ReportOutcome::Ignored {
                order_id,
                follow_up: None,
            };
        }

        let reason = RejectReason::ack_timeout(Duration::from_millis(deadline_ms));
        if let Err(err) = order.reject(reason, now) {
            tracing::error!(order_id = %order_id, error = %err, "Failed to reject timed-out order");
            return ReportOutcome::Ignored {
                order_id,
                follow_up: None,
            };
        }
        tracing::warn!(order_id = %order_id, deadline_ms, "Acknowledgment timed out");
        self.updated(
            &order_id,
            None,
            Some(FollowUp::VenueCancel(order_id.clone())),
        )
    }

    fn known_order(&mut self, order_id: &OrderId, what: &str) -> Result<&mut Order, EngineError> {
        self.orders
            .get_mut(order_id)
            .ok_or_else(|| unknown_order(order_id, what))
    }

    fn updated(
        &mut self,
        order_id: &OrderId,
        fill: Option<Fill>,
        follow_up: Option<FollowUp>,
    ) -> ReportOutcome {
        let Some(order) = self.orders.get_mut(order_id) else {
            return ReportOutcome::Ignored {
                order_id: order_id.clone(),
                follow_up,
            };
        };
        self.journal.extend(order.drain_events());
        let snapshot = Box::new(order.clone());
        self.refresh(snapshot.symbol());
        ReportOutcome::Updated {
            order: snapshot,
            fill,
            follow_up,
        }
    }

    /// Mark positions and the account to a closed bar.
    pub fn mark(&mut self, bar: &Bar) {
        self.last_prices.insert(bar.symbol().clone(), bar.close());
        self.ledger.mark(bar);
        self.refresh(bar.symbol());
    }
}

fn unknown_order(order_id: &OrderId, what: &str) -> EngineError {
    EngineError::inconsistency(
        ErrorCode::UnknownOrderReport,
        order_id,
        format!("{what} for unknown order {order_id}"),
    )
}
