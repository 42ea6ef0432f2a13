//! Backtest execution backend.
//!
//! Fully synchronous simulation: `submit` queues an acknowledgment at once,
//! `on_bar` matches the resting book and queues fills. Nothing here reads the
//! wall clock, so identical inputs produce identical report streams.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::fill_engine::{FillModel, RestingBook};
use crate::application::ports::{
    BackendError, BackendOrderState, ExecutionBackend, ExecutionReport, ReportSender,
    SubmitRequest,
};
use crate::domain::market_data::Bar;
use crate::domain::order_execution::{CancelReason, OrderStatus, RejectReason};
use crate::domain::session::Mode;
use crate::domain::shared::{IdSequence, OrderId, Quantity, Timestamp};

/// Simulated exchange for historical replay.
#[derive(Debug)]
pub struct BacktestBackend {
    reports: ReportSender,
    model: FillModel,
    state: Mutex<SimState>,
}

#[derive(Debug)]
struct SimState {
    book: RestingBook,
    fill_ids: IdSequence,
    orders: BTreeMap<OrderId, BackendOrderState>,
    last_bar_close: Option<Timestamp>,
}

impl BacktestBackend {
    /// Create a backend that reports onto `reports`.
    #[must_use]
    pub fn new(reports: ReportSender, model: FillModel) -> Self {
        Self {
            reports,
            model,
            state: Mutex::new(SimState {
                book: RestingBook::new(),
                fill_ids: IdSequence::sequential("FILL"),
                orders: BTreeMap::new(),
                last_bar_close: None,
            }),
        }
    }

    /// Fill model in use.
    #[must_use]
    pub const fn model(&self) -> &FillModel {
        &self.model
    }

    /// Orders still resting in the simulated book.
    #[must_use]
    pub fn resting_orders(&self) -> usize {
        self.state.lock().book.len()
    }

    fn push(&self, report: ExecutionReport) -> Result<(), BackendError> {
        self.reports
            .send(report)
            .map_err(|_| BackendError::Unavailable("report channel closed".to_string()))
    }
}

#[async_trait]
impl ExecutionBackend for BacktestBackend {
    fn mode(&self) -> Mode {
        Mode::Backtest
    }

    fn name(&self) -> &str {
        "backtest"
    }

    async fn submit(&self, request: SubmitRequest) -> Result<(), BackendError> {
        request.validate()?;

        let accepted = {
            let mut state = self.state.lock();
            if state.orders.contains_key(&request.order_id) {
                return Err(BackendError::Rejected {
                    order_id: request.order_id.clone(),
                    reason: RejectReason::invalid_order("duplicate order id"),
                });
            }
            state.orders.insert(
                request.order_id.clone(),
                BackendOrderState {
                    order_id: request.order_id.clone(),
                    status: OrderStatus::Pending,
                    filled_quantity: Quantity::ZERO,
                },
            );
            let report = ExecutionReport::Accepted {
                order_id: request.order_id.clone(),
                venue_order_id: None,
                at: request.submitted_at,
            };
            state.book.add(request);
            report
        };

        tracing::debug!(order_id = %accepted.order_id(), "Backtest order resting");
        self.push(accepted)
    }

    async fn cancel(&self, order_id: &OrderId, reason: CancelReason) -> Result<(), BackendError> {
        let report = {
            let mut state = self.state.lock();
            match state.book.remove(order_id) {
                Some(resting) => {
                    let at = state
                        .last_bar_close
                        .unwrap_or(resting.request.submitted_at);
                    if let Some(known) = state.orders.get_mut(order_id) {
                        known.status = OrderStatus::Canceled;
                    }
                    ExecutionReport::Canceled {
                        order_id: order_id.clone(),
                        reason,
                        at,
                    }
                }
                None if state.orders.contains_key(order_id) => {
                    return Err(BackendError::AlreadyTerminal {
                        order_id: order_id.clone(),
                    });
                }
                None => {
                    return Err(BackendError::UnknownOrder {
                        order_id: order_id.clone(),
                    });
                }
            }
        };
        self.push(report)
    }

    async fn query(&self, order_id: &OrderId) -> Result<Option<BackendOrderState>, BackendError> {
        Ok(self.state.lock().orders.get(order_id).cloned())
    }

    async fn on_bar(&self, bar: &Bar) -> Result<(), BackendError> {
        let fills = {
            let mut state = self.state.lock();
            let state = &mut *state;
            state.last_bar_close = Some(bar.close_time());
            let fills =
                state
                    .book
                    .match_bar(bar, &self.model, &mut state.fill_ids, bar.close_time());
            for fill in &fills {
                let still_resting = state.book.contains(fill.order_id());
                if let Some(known) = state.orders.get_mut(fill.order_id()) {
                    known.filled_quantity += fill.quantity();
                    known.status = if still_resting {
                        OrderStatus::Partial
                    } else {
                        OrderStatus::Completed
                    };
                }
            }
            fills
        };

        for fill in fills {
            tracing::debug!(
                order_id = %fill.order_id(),
                fill_id = %fill.fill_id(),
                quantity = %fill.quantity(),
                price = %fill.price(),
                "Simulated fill"
            );
            self.push(ExecutionReport::Filled { fill })?;
        }
        Ok(())
    }
}
