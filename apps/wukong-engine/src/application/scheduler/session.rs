//! Trading Session
//!
//! Drives one strategy against one backend and one clock. Every event that
//! can touch an order or a position (bars, backend reports, strategy
//! intents) passes through this loop one at a time, so strategy handlers
//! never overlap and never observe a half-applied change.
//!
//! # Loop
//!
//! - **Backtest**: for each bar, the backend matches resting orders, their
//!   reports are applied, positions are marked, `on_bar` runs, the intents
//!   it produced are handed off, and the resulting reports are drained before
//!   the next bar. Nothing waits on wall time.
//! - **Sandbox / Real**: `tokio::select!` over cancellation, the report queue
//!   and the clock, biased in that order.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::report::SessionReport;
use super::strategy::{Command, Strategy, StrategyContext};
use crate::application::ports::{
    AuditPort, BackendError, BarClock, ExecutionBackend, ExecutionReport, NoOpAudit,
    ReportReceiver,
};
use crate::application::services::{CancelAction, FollowUp, OrderManager, ReportOutcome};
use crate::domain::account::AccountSettings;
use crate::domain::market_data::{Bar, TimeFrame};
use crate::domain::order_execution::{CancelReason, Fill, Order, OrderStatus, RejectReason};
use crate::domain::session::Mode;
use crate::domain::shared::{OrderId, SessionId, Symbol, Timestamp};
use crate::error::EngineError;
use crate::observability;

/// Fixed parameters of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Execution mode; must match the backend.
    pub mode: Mode,
    /// Bar granularity; must match the clock.
    pub timeframe: TimeFrame,
    /// Instruments the strategy may trade.
    pub instruments: Vec<Symbol>,
    /// Stop at the first inconsistency instead of logging and continuing.
    pub halt_on_inconsistency: bool,
    /// How long a live session waits for cancel confirmations at shutdown.
    pub shutdown_grace: Duration,
    /// Starting cash and leverage limits.
    pub account: AccountSettings,
}

impl SessionSettings {
    /// Settings with no halting, a five second shutdown grace and an
    /// unfunded account.
    #[must_use]
    pub fn new(mode: Mode, timeframe: TimeFrame, instruments: Vec<Symbol>) -> Self {
        Self {
            mode,
            timeframe,
            instruments,
            halt_on_inconsistency: false,
            shutdown_grace: Duration::from_secs(5),
            account: AccountSettings::default(),
        }
    }
}

/// One run of a strategy.
pub struct TradingSession {
    id: SessionId,
    settings: SessionSettings,
    backend: Box<dyn ExecutionBackend>,
    clock: Box<dyn BarClock>,
    reports: ReportReceiver,
    audit: Arc<dyn AuditPort>,
    strategy: Box<dyn Strategy>,
    manager: OrderManager,
    commands: Vec<Command>,
    cancel: CancellationToken,
    now: Timestamp,
    running: bool,
    bars_processed: u64,
    halted: bool,
}

impl TradingSession {
    /// Assemble a session.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the backend serves another mode or the
    /// clock runs on another timeframe.
    pub fn new(
        settings: SessionSettings,
        backend: Box<dyn ExecutionBackend>,
        clock: Box<dyn BarClock>,
        reports: ReportReceiver,
        strategy: Box<dyn Strategy>,
    ) -> Result<Self, EngineError> {
        if backend.mode() != settings.mode {
            return Err(EngineError::internal(format!(
                "backend {} serves {} but the session runs {}",
                backend.name(),
                backend.mode(),
                settings.mode
            )));
        }
        if clock.timeframe() != settings.timeframe {
            return Err(EngineError::internal(format!(
                "clock emits {} bars but the session runs {}",
                clock.timeframe(),
                settings.timeframe
            )));
        }

        let now = clock.start_time().unwrap_or_else(Timestamp::now);
        let manager = OrderManager::new(settings.mode, settings.instruments.iter().cloned())
            .with_account(settings.account.clone());

        Ok(Self {
            id: SessionId::generate(),
            settings,
            backend,
            clock,
            reports,
            audit: Arc::new(NoOpAudit),
            strategy,
            manager,
            commands: Vec::new(),
            cancel: CancellationToken::new(),
            now,
            running: true,
            bars_processed: 0,
            halted: false,
        })
    }

    /// Send terminal orders, fills and inconsistencies to `audit`.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditPort>) -> Self {
        self.audit = audit;
        self
    }

    /// Stop the session when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> &SessionId {
        &self.id
    }

    /// Run to end of data, cancellation, or a halting inconsistency.
    ///
    /// # Errors
    ///
    /// Returns an error if the clock or the backend fails. Order rejections
    /// and inconsistencies are not errors; they are in the report.
    pub async fn run(mut self) -> Result<SessionReport, EngineError> {
        let span = tracing::info_span!(
            "session",
            session_id = %self.id,
            mode = %self.settings.mode,
            timeframe = %self.settings.timeframe,
        );
        async move {
            tracing::info!(
                backend = self.backend.name(),
                instruments = self.settings.instruments.len(),
                "Session starting"
            );

            self.dispatch_start();
            self.pump().await;

            if self.settings.mode.is_simulated() {
                self.run_backtest().await?;
            } else {
                self.run_live().await?;
            }

            self.shutdown().await;
            self.dispatch_stop();

            let report = self.into_report();
            tracing::info!(
                bars = report.bars_processed,
                orders = report.orders.len(),
                fills = report.fills.len(),
                inconsistencies = report.inconsistencies.len(),
                halted = report.halted,
                "Session finished"
            );
            Ok::<_, EngineError>(report)
        }
        .instrument(span)
        .await
    }

    async fn run_backtest(&mut self) -> Result<(), EngineError> {
        while let Some(bar) = self.clock.advance().await? {
            if self.cancel.is_cancelled() {
                tracing::info!("Cancellation requested");
                break;
            }
            self.now = bar.close_time();
            self.process_bar(&bar).await?;
            if self.halted {
                break;
            }
        }
        Ok(())
    }

    async fn run_live(&mut self) -> Result<(), EngineError> {
        while !self.halted {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    tracing::info!("Cancellation requested");
                    break;
                }
                Some(report) = self.reports.recv() => {
                    self.now = Timestamp::now();
                    self.handle_report(report).await;
                    self.pump().await;
                }
                bar = self.clock.advance() => {
                    let Some(bar) = bar? else {
                        tracing::info!("Market data ended");
                        break;
                    };
                    self.now = Timestamp::now();
                    self.process_bar(&bar).await?;
                }
            }
        }
        Ok(())
    }

    async fn process_bar(&mut self, bar: &Bar) -> Result<(), EngineError> {
        tracing::debug!(
            symbol = %bar.symbol(),
            close_time = %bar.close_time(),
            close = %bar.close(),
            "Bar closed"
        );

        self.backend.on_bar(bar).await?;
        self.pump().await;

        self.manager.mark(bar);
        self.bars_processed += 1;
        observability::record_bar(self.settings.mode);

        let mut ctx =
            StrategyContext::new(&mut self.manager, &mut self.commands, self.now, self.running);
        self.strategy.on_bar(&mut ctx, bar);
        self.pump().await;

        observability::update_open_orders(self.settings.mode, self.manager.open_orders().count());
        Ok(())
    }

    /// Apply every report already queued and hand off queued intents until
    /// both are empty.
    async fn pump(&mut self) {
        loop {
            while let Ok(report) = self.reports.try_recv() {
                self.handle_report(report).await;
            }
            if self.commands.is_empty() {
                break;
            }
            self.flush_commands().await;
        }
    }

    async fn flush_commands(&mut self) {
        for command in std::mem::take(&mut self.commands) {
            match command {
                Command::Submit(order_id) => self.hand_off(&order_id).await,
                Command::Cancel(order_id) => {
                    self.request_cancel(&order_id, CancelReason::user_requested())
                        .await;
                }
            }
        }
    }

    async fn hand_off(&mut self, order_id: &OrderId) {
        let request = match self.manager.mark_submitted(order_id, self.now) {
            Ok(request) => request,
            Err(err) => {
                tracing::error!(order_id = %order_id, error = %err, "Hand-off failed");
                return;
            }
        };
        let order_type = request.order_type;

        tracing::info!(
            order_id = %order_id,
            symbol = %request.symbol,
            side = %request.side,
            order_type = %request.order_type,
            quantity = %request.quantity,
            reduce_only = request.reduce_only,
            "Order submitted"
        );
        observability::record_order_submitted(self.settings.mode, order_type);

        let reason = match self.backend.submit(request).await {
            Ok(()) => return,
            Err(BackendError::Rejected { reason, .. }) => reason,
            Err(BackendError::Unavailable(message)) => {
                RejectReason::new("BACKEND_UNAVAILABLE", message)
            }
            Err(other) => RejectReason::new("BACKEND_ERROR", other.to_string()),
        };

        match self.manager.reject_submission(order_id, reason, self.now) {
            Ok(order) => self.on_order_changed(order, None).await,
            Err(err) => {
                tracing::error!(order_id = %order_id, error = %err, "Failed to record rejection");
            }
        }
    }

    async fn request_cancel(&mut self, order_id: &OrderId, reason: CancelReason) {
        match self.manager.request_cancel(order_id) {
            Ok(CancelAction::Forward) => self.forward_cancel(order_id, reason).await,
            Ok(CancelAction::Deferred) => {
                tracing::debug!(order_id = %order_id, "Cancel deferred until acknowledgment");
            }
            Err(err) => {
                tracing::debug!(order_id = %order_id, error = %err, "Cancel not sent");
            }
        }
    }

    async fn forward_cancel(&mut self, order_id: &OrderId, reason: CancelReason) {
        match self.backend.cancel(order_id, reason).await {
            Ok(()) => tracing::debug!(order_id = %order_id, "Cancel sent"),
            Err(BackendError::AlreadyTerminal { .. }) => {
                tracing::debug!(order_id = %order_id, "Cancel lost the race; final report pending");
            }
            Err(err) => {
                tracing::warn!(order_id = %order_id, error = %err, "Cancel request failed");
            }
        }
    }

    async fn handle_report(&mut self, report: ExecutionReport) {
        tracing::debug!(
            order_id = %report.order_id(),
            kind = report.kind(),
            at = %report.at(),
            "Execution report"
        );

        match self.manager.apply_report(report, self.now) {
            Ok(ReportOutcome::Updated {
                order,
                fill,
                follow_up,
            }) => {
                if let Some(follow_up) = follow_up {
                    self.follow_up(follow_up).await;
                }
                self.on_order_changed(*order, fill).await;
            }
            Ok(ReportOutcome::Closed {
                order,
                error,
                follow_up,
            }) => {
                self.record_inconsistency(error).await;
                if let Some(follow_up) = follow_up {
                    self.follow_up(follow_up).await;
                }
                self.on_order_changed(*order, None).await;
            }
            Ok(ReportOutcome::Ignored {
                follow_up: Some(follow_up),
                ..
            }) => self.follow_up(follow_up).await,
            Ok(ReportOutcome::Ignored { .. }) => {}
            Err(err) => self.record_inconsistency(err).await,
        }
    }

    async fn follow_up(&mut self, follow_up: FollowUp) {
        match follow_up {
            FollowUp::ForwardCancel(order_id) => {
                self.forward_cancel(&order_id, CancelReason::user_requested())
                    .await;
            }
            FollowUp::VenueCancel(order_id) => {
                if let Err(err) = self
                    .backend
                    .cancel(&order_id, CancelReason::venue("order closed by engine"))
                    .await
                {
                    tracing::debug!(order_id = %order_id, error = %err, "Venue cleanup cancel failed");
                }
            }
        }
    }

    async fn on_order_changed(&mut self, order: Order, fill: Option<Fill>) {
        let mode = self.settings.mode;

        if let Some(fill) = &fill {
            tracing::info!(
                order_id = %order.id(),
                fill_id = %fill.fill_id(),
                quantity = %fill.quantity(),
                price = %fill.price(),
                status = %order.status(),
                "Order filled"
            );
            observability::record_fill(mode, decimal_to_f64(fill.quantity().amount()));
            if let Err(err) = self.audit.record_fill(fill).await {
                tracing::warn!(error = %err, "Audit fill write failed");
            }
        } else {
            tracing::info!(order_id = %order.id(), status = %order.status(), "Order status changed");
        }

        if order.status().is_terminal() {
            observability::record_order_terminal(mode, order.status());
            if order.status() == OrderStatus::Rejected {
                let code = order.reject_reason().map_or("UNKNOWN", |r| r.code.as_str());
                tracing::warn!(order_id = %order.id(), code, "Order rejected");
                observability::record_order_rejection(mode, code);
            }
            if let Err(err) = self.audit.record_order(&order).await {
                tracing::warn!(error = %err, "Audit order write failed");
            }
        }

        let mut ctx =
            StrategyContext::new(&mut self.manager, &mut self.commands, self.now, self.running);
        self.strategy.on_order_update(&mut ctx, &order);
    }

    async fn record_inconsistency(&mut self, err: EngineError) {
        if err.is_inconsistency() {
            tracing::error!(
                code = %err.code(),
                order_id = err.context_value("order_id").unwrap_or("-"),
                error = %err,
                "Inconsistent execution report"
            );
            observability::record_inconsistency(err.code());
        } else {
            tracing::warn!(error = %err, "Execution report not applied");
        }

        if let Err(audit_err) = self.audit.record_inconsistency(&err).await {
            tracing::warn!(error = %audit_err, "Audit inconsistency write failed");
        }
        if self.settings.halt_on_inconsistency && err.is_inconsistency() {
            tracing::error!("Halting session on inconsistency");
            self.halted = true;
        }
    }

    /// Cancel whatever is still open so every order ends terminal.
    async fn shutdown(&mut self) {
        self.pump().await;

        let open = self.manager.open_order_ids();
        if open.is_empty() {
            return;
        }
        tracing::info!(open = open.len(), "Canceling open orders at session end");
        for order_id in &open {
            self.request_cancel(order_id, CancelReason::session_end())
                .await;
        }

        if self.settings.mode.is_simulated() {
            self.pump().await;
            return;
        }

        let deadline = tokio::time::sleep(self.settings.shutdown_grace);
        tokio::pin!(deadline);
        while self.manager.open_orders().next().is_some() {
            tokio::select! {
                () = &mut deadline => {
                    tracing::warn!(
                        open = self.manager.open_orders().count(),
                        "Shutdown grace elapsed with orders still open"
                    );
                    break;
                }
                Some(report) = self.reports.recv() => {
                    self.now = Timestamp::now();
                    self.handle_report(report).await;
                }
            }
        }
    }

    fn dispatch_start(&mut self) {
        let mut ctx =
            StrategyContext::new(&mut self.manager, &mut self.commands, self.now, self.running);
        self.strategy.on_start(&mut ctx);
    }

    fn dispatch_stop(&mut self) {
        self.running = false;
        let mut ctx =
            StrategyContext::new(&mut self.manager, &mut self.commands, self.now, self.running);
        self.strategy.on_stop(&mut ctx);
    }

    fn into_report(self) -> SessionReport {
        SessionReport {
            session_id: self.id,
            mode: self.settings.mode,
            timeframe: self.settings.timeframe,
            bars_processed: self.bars_processed,
            halted: self.halted,
            orders: self.manager.orders().cloned().collect(),
            fills: self.manager.fills().to_vec(),
            positions: self.manager.positions().cloned().collect(),
            account: self.manager.account().clone(),
            inconsistencies: self.manager.inconsistencies().to_vec(),
            events: self.manager.journal().to_vec(),
        }
    }
}

fn decimal_to_f64(value: rust_decimal::Decimal) -> f64 {
    use rust_decimal::prelude::ToPrimitive;
    value.to_f64().unwrap_or(0.0)
}

impl std::fmt::Debug for TradingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradingSession")
            .field("id", &self.id)
            .field("settings", &self.settings)
            .field("backend", &self.backend.name())
            .field("bars_processed", &self.bars_processed)
            .field("halted", &self.halted)
            .finish_non_exhaustive()
    }
}
