//! In-memory audit log for tests and short runs.

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::application::ports::{AuditError, AuditPort};
use crate::domain::order_execution::{Fill, Order};
use crate::error::EngineError;

/// Keeps every audit record in memory.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    orders: RwLock<Vec<Order>>,
    fills: RwLock<Vec<Fill>>,
    inconsistencies: RwLock<Vec<EngineError>>,
}

impl InMemoryAuditLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Terminal orders in the order they were recorded.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.orders.read().clone()
    }

    /// Fills in the order they were recorded.
    #[must_use]
    pub fn fills(&self) -> Vec<Fill> {
        self.fills.read().clone()
    }

    /// Recorded inconsistencies.
    #[must_use]
    pub fn inconsistencies(&self) -> Vec<EngineError> {
        self.inconsistencies.read().clone()
    }

    /// True if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.read().is_empty()
            && self.fills.read().is_empty()
            && self.inconsistencies.read().is_empty()
    }
}

#[async_trait]
impl AuditPort for InMemoryAuditLog {
    async fn record_order(&self, order: &Order) -> Result<(), AuditError> {
        self.orders.write().push(order.clone());
        Ok(())
    }

    async fn record_fill(&self, fill: &Fill) -> Result<(), AuditError> {
        self.fills.write().push(fill.clone());
        Ok(())
    }

    async fn record_inconsistency(&self, error: &EngineError) -> Result<(), AuditError> {
        self.inconsistencies.write().push(error.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::{OrderIntent, Side};
    use crate::domain::shared::{FillId, OrderId, Price, Quantity, Timestamp};

    #[tokio::test]
    async fn keeps_records_in_arrival_order() {
        let log = InMemoryAuditLog::new();
        assert!(log.is_empty());
        let at = Timestamp::from_millis(0).unwrap();
        let order = Order::new(
            OrderId::new("ORD-000001"),
            OrderIntent::market("BTC", Side::Long, Quantity::from_i64(1)),
            at,
        )
        .unwrap();
        let first = Fill::new(
            FillId::new("FILL-000001"),
            OrderId::new("ORD-000001"),
            Quantity::from_i64(1),
            Price::from_i64(10),
            at,
        );
        let second = Fill::new(
            FillId::new("FILL-000002"),
            OrderId::new("ORD-000001"),
            Quantity::from_i64(1),
            Price::from_i64(11),
            at,
        );

        log.record_order(&order).await.unwrap();
        log.record_fill(&first).await.unwrap();
        log.record_fill(&second).await.unwrap();
        log.record_inconsistency(&EngineError::internal("boom"))
            .await
            .unwrap();

        assert_eq!(log.orders().len(), 1);
        assert_eq!(log.fills(), vec![first, second]);
        assert_eq!(log.inconsistencies().len(), 1);
        assert!(!log.is_empty());
    }
}
