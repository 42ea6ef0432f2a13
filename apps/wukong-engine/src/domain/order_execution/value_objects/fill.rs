//! Fill value object.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::{FillId, OrderId, Price, Quantity, Timestamp};

/// A matched quantity and price against one order.
///
/// Immutable once built. `order_id` is a lookup key only; the fill does not
/// own or borrow the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    fill_id: FillId,
    order_id: OrderId,
    quantity: Quantity,
    price: Price,
    fee: Decimal,
    timestamp: Timestamp,
}

impl Fill {
    /// Create a fill with no fee.
    #[must_use]
    pub const fn new(
        fill_id: FillId,
        order_id: OrderId,
        quantity: Quantity,
        price: Price,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            fill_id,
            order_id,
            quantity,
            price,
            fee: Decimal::ZERO,
            timestamp,
        }
    }

    /// Attach a fee charged on this fill.
    #[must_use]
    pub fn with_fee(mut self, fee: Decimal) -> Self {
        self.fee = fee;
        self
    }

    /// Fill identifier.
    #[must_use]
    pub const fn fill_id(&self) -> &FillId {
        &self.fill_id
    }

    /// Order the fill belongs to.
    #[must_use]
    pub const fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    /// Filled quantity.
    #[must_use]
    pub const fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Execution price.
    #[must_use]
    pub const fn price(&self) -> Price {
        self.price
    }

    /// Fee charged, in quote currency.
    #[must_use]
    pub const fn fee(&self) -> Decimal {
        self.fee
    }

    /// When the fill happened.
    #[must_use]
    pub const fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// `quantity * price`.
    #[must_use]
    pub fn notional(&self) -> Decimal {
        self.price * self.quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn notional_and_fee() {
        let fill = Fill::new(
            FillId::new("FILL-000001"),
            OrderId::new("ORD-000001"),
            Quantity::from_i64(10),
            Price::new(dec!(100.5)),
            Timestamp::parse("2024-01-01T00:00:00Z").unwrap(),
        )
        .with_fee(dec!(0.25));

        assert_eq!(fill.notional(), dec!(1005.0));
        assert_eq!(fill.fee(), dec!(0.25));
        assert_eq!(fill.order_id().as_str(), "ORD-000001");
    }
}
