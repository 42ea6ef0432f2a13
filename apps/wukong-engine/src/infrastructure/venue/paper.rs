//! In-process paper venue for Sandbox sessions.
//!
//! Behaves like a remote venue from the engine's point of view: requests
//! only hand off, and every acknowledgment, fill and cancel confirmation
//! arrives on the event channel. Matching reuses the backtest fill engine
//! against live bars; timestamps come from the wall clock.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::application::ports::{
    BackendOrderState, ExecutionReport, ReportReceiver, ReportSender, SubmitRequest, VenueError,
    VenuePort, report_channel,
};
use crate::domain::market_data::Bar;
use crate::domain::order_execution::{CancelReason, OrderStatus};
use crate::domain::shared::{IdSequence, OrderId, Quantity, Timestamp, VenueOrderId};
use crate::infrastructure::backtest::{FillModel, RestingBook};

/// Simulated venue that matches against incoming bars.
#[derive(Debug)]
pub struct PaperVenue {
    events: ReportSender,
    model: FillModel,
    book: Mutex<PaperBook>,
}

#[derive(Debug)]
struct PaperBook {
    resting: RestingBook,
    fill_ids: IdSequence,
    venue_ids: IdSequence,
    orders: HashMap<OrderId, BackendOrderState>,
}

impl PaperVenue {
    /// Create the venue and the event stream it reports on.
    #[must_use]
    pub fn new(model: FillModel) -> (Self, ReportReceiver) {
        let (events, receiver) = report_channel();
        let venue = Self {
            events,
            model,
            book: Mutex::new(PaperBook {
                resting: RestingBook::new(),
                fill_ids: IdSequence::random(),
                venue_ids: IdSequence::random(),
                orders: HashMap::new(),
            }),
        };
        (venue, receiver)
    }

    /// Orders currently resting.
    #[must_use]
    pub fn resting_orders(&self) -> usize {
        self.book.lock().resting.len()
    }

    fn emit(&self, report: ExecutionReport) -> Result<(), VenueError> {
        self.events
            .send(report)
            .map_err(|_| VenueError::Disconnected("event stream closed".to_string()))
    }
}

#[async_trait]
impl VenuePort for PaperVenue {
    fn name(&self) -> &'static str {
        "paper"
    }

    async fn place_order(&self, request: &SubmitRequest) -> Result<(), VenueError> {
        request
            .validate()
            .map_err(|err| VenueError::Rejected(err.to_string()))?;

        let venue_order_id = {
            let mut book = self.book.lock();
            if book.orders.contains_key(&request.order_id) {
                return Err(VenueError::Rejected(format!(
                    "duplicate order id {}",
                    request.order_id
                )));
            }
            let venue_order_id = VenueOrderId::new(book.venue_ids.next_id());
            book.orders.insert(
                request.order_id.clone(),
                BackendOrderState {
                    order_id: request.order_id.clone(),
                    status: OrderStatus::Pending,
                    filled_quantity: Quantity::ZERO,
                },
            );
            book.resting.add(request.clone());
            venue_order_id
        };

        self.emit(ExecutionReport::Accepted {
            order_id: request.order_id.clone(),
            venue_order_id: Some(venue_order_id),
            at: Timestamp::now(),
        })
    }

    async fn cancel_order(
        &self,
        order_id: &OrderId,
        reason: &CancelReason,
    ) -> Result<(), VenueError> {
        {
            let mut book = self.book.lock();
            if book.resting.remove(order_id).is_none() {
                return Err(if book.orders.contains_key(order_id) {
                    VenueError::AlreadyTerminal {
                        order_id: order_id.clone(),
                    }
                } else {
                    VenueError::NotFound {
                        order_id: order_id.clone(),
                    }
                });
            }
            if let Some(known) = book.orders.get_mut(order_id) {
                known.status = OrderStatus::Canceled;
            }
        }

        self.emit(ExecutionReport::Canceled {
            order_id: order_id.clone(),
            reason: reason.clone(),
            at: Timestamp::now(),
        })
    }

    async fn query_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<BackendOrderState>, VenueError> {
        Ok(self.book.lock().orders.get(order_id).cloned())
    }

    async fn on_market_data(&self, bar: &Bar) -> Result<(), VenueError> {
        let fills = {
            let mut book = self.book.lock();
            let book = &mut *book;
            let fills = book
                .resting
                .match_bar(bar, &self.model, &mut book.fill_ids, Timestamp::now());
            for fill in &fills {
                let open = book.resting.contains(fill.order_id());
                if let Some(known) = book.orders.get_mut(fill.order_id()) {
                    known.filled_quantity += fill.quantity();
                    known.status = if open {
                        OrderStatus::Partial
                    } else {
                        OrderStatus::Completed
                    };
                }
            }
            fills
        };

        for fill in fills {
            self.emit(ExecutionReport::Filled { fill })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market_data::{Ohlc, TimeFrame};
    use crate::domain::order_execution::{OrderType, Side};
    use crate::domain::shared::{Price, Symbol};
    use rust_decimal_macros::dec;

    fn limit(id: &str, price: i64) -> SubmitRequest {
        SubmitRequest {
            order_id: OrderId::new(id),
            symbol: Symbol::new("ETH"),
            side: Side::Short,
            order_type: OrderType::Limit,
            quantity: Quantity::from_i64(2),
            limit_price: Some(Price::from_i64(price)),
            reduce_only: false,
            leverage: rust_decimal::Decimal::ONE,
            submitted_at: Timestamp::now(),
        }
    }

    fn bar(low: i64, high: i64) -> Bar {
        Bar::new(
            Symbol::new("ETH"),
            TimeFrame::Minute5,
            Timestamp::parse("2024-03-01T00:05:00Z").unwrap(),
            Ohlc::new(
                Price::from_i64(low),
                Price::from_i64(high),
                Price::from_i64(low),
                Price::from_i64(high),
            ),
            dec!(100),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn accepts_with_venue_id_and_fills_on_touch() {
        let (venue, mut events) = PaperVenue::new(FillModel::frictionless());

        venue.place_order(&limit("ORD-1", 50)).await.unwrap();
        let ExecutionReport::Accepted { venue_order_id, .. } = events.try_recv().unwrap() else {
            panic!("expected ack");
        };
        assert!(venue_order_id.is_some());

        venue.on_market_data(&bar(52, 55)).await.unwrap();
        assert!(events.try_recv().is_err());

        venue.on_market_data(&bar(48, 53)).await.unwrap();
        let ExecutionReport::Filled { fill } = events.try_recv().unwrap() else {
            panic!("expected fill");
        };
        assert_eq!(fill.price(), Price::from_i64(50));
        assert_eq!(venue.resting_orders(), 0);
    }

    #[tokio::test]
    async fn cancel_echoes_reason_once() {
        let (venue, mut events) = PaperVenue::new(FillModel::frictionless());
        venue.place_order(&limit("ORD-1", 50)).await.unwrap();
        let _ack = events.try_recv().unwrap();

        venue
            .cancel_order(&OrderId::new("ORD-1"), &CancelReason::session_end())
            .await
            .unwrap();
        let ExecutionReport::Canceled { reason, .. } = events.try_recv().unwrap() else {
            panic!("expected cancel");
        };
        assert_eq!(reason.code, "SESSION_END");

        let again = venue
            .cancel_order(&OrderId::new("ORD-1"), &CancelReason::session_end())
            .await;
        assert!(matches!(again, Err(VenueError::AlreadyTerminal { .. })));
        let missing = venue
            .cancel_order(&OrderId::new("ORD-9"), &CancelReason::session_end())
            .await;
        assert!(matches!(missing, Err(VenueError::NotFound { .. })));
    }

    #[tokio::test]
    async fn malformed_order_is_permanent_rejection() {
        let (venue, _events) = PaperVenue::new(FillModel::frictionless());
        let mut bad = limit("ORD-1", 50);
        bad.limit_price = None;

        let err = venue.place_order(&bad).await.unwrap_err();

        assert!(!err.is_retryable());
    }
}
