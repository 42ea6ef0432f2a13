//! Audit Port (Driven Port)
//!
//! Receives terminal orders, fills and inconsistencies. The engine pushes;
//! it never reads back.

use async_trait::async_trait;

use crate::domain::order_execution::{Fill, Order};
use crate::error::EngineError;

/// Audit sink error.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// Underlying storage failed.
    #[error("Audit write failed: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be encoded.
    #[error("Audit serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Port for the persistence/logging collaborator.
#[async_trait]
pub trait AuditPort: Send + Sync {
    /// Record an order that reached a terminal status.
    async fn record_order(&self, order: &Order) -> Result<(), AuditError>;

    /// Record a fill applied to an order.
    async fn record_fill(&self, fill: &Fill) -> Result<(), AuditError>;

    /// Record a report the engine could not reconcile.
    async fn record_inconsistency(&self, error: &EngineError) -> Result<(), AuditError>;
}

/// Audit sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpAudit;

#[async_trait]
impl AuditPort for NoOpAudit {
    async fn record_order(&self, _order: &Order) -> Result<(), AuditError> {
        Ok(())
    }

    async fn record_fill(&self, _fill: &Fill) -> Result<(), AuditError> {
        Ok(())
    }

    async fn record_inconsistency(&self, _error: &EngineError) -> Result<(), AuditError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::{OrderIntent, Side};
    use crate::domain::shared::{OrderId, Quantity, Timestamp};

    #[tokio::test]
    async fn no_op_audit_accepts_everything() {
        let audit = NoOpAudit;
        let order = Order::new(
            OrderId::new("ORD-1"),
            OrderIntent::market("AAPL", Side::Long, Quantity::from_i64(1)),
            Timestamp::from_millis(0).unwrap(),
        )
        .unwrap();

        assert!(audit.record_order(&order).await.is_ok());
        assert!(
            audit
                .record_inconsistency(&EngineError::internal("x"))
                .await
                .is_ok()
        );
    }
}
