//! What a strategy asks for before an order exists.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::value_objects::{OrderType, Side};
use crate::domain::shared::{Price, Quantity, Symbol};

/// Request to open an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderIntent {
    /// Instrument to trade.
    pub symbol: Symbol,
    /// Direction.
    pub side: Side,
    /// Pricing style.
    pub order_type: OrderType,
    /// Quantity to trade.
    pub quantity: Quantity,
    /// Required for Limit, absent for Market.
    pub limit_price: Option<Price>,
    /// Only close or shrink existing exposure.
    pub reduce_only: bool,
    /// Notional over margin; 1 is unleveraged.
    #[serde(default = "unleveraged")]
    pub leverage: Decimal,
}

const fn unleveraged() -> Decimal {
    Decimal::ONE
}

impl OrderIntent {
    /// Market order intent.
    #[must_use]
    pub fn market(symbol: impl Into<Symbol>, side: Side, quantity: Quantity) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            quantity,
            limit_price: None,
            reduce_only: false,
            leverage: Decimal::ONE,
        }
    }

    /// Limit order intent.
    #[must_use]
    pub fn limit(symbol: impl Into<Symbol>, side: Side, quantity: Quantity, price: Price) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Limit,
            quantity,
            limit_price: Some(price),
            reduce_only: false,
            leverage: Decimal::ONE,
        }
    }

    /// Mark the intent reduce-only.
    #[must_use]
    pub fn reduce_only(mut self) -> Self {
        self.reduce_only = true;
        self
    }

    /// Trade with `leverage`.
    #[must_use]
    pub fn with_leverage(mut self, leverage: Decimal) -> Self {
        self.leverage = leverage;
        self
    }

    /// Validate the order shape.
    ///
    /// # Errors
    ///
    /// Returns error on a bad symbol, a non-positive quantity, leverage
    /// below 1, a Limit order without a positive price, or a Market order
    /// carrying a price.
    pub fn validate(&self) -> Result<(), OrderError> {
        self.symbol
            .validate()
            .map_err(|e| OrderError::invalid("symbol", e.to_string()))?;

        self.quantity
            .validate_for_order()
            .map_err(|e| OrderError::invalid("quantity", e.to_string()))?;

        if self.leverage < Decimal::ONE {
            return Err(OrderError::invalid(
                "leverage",
                format!("must be at least 1, got {}", self.leverage),
            ));
        }

        match (self.order_type, self.limit_price) {
            (OrderType::Limit, None) => Err(OrderError::invalid(
                "limit_price",
                "Limit price required for limit orders",
            )),
            (OrderType::Limit, Some(price)) => price
                .validate_for_order()
                .map_err(|e| OrderError::invalid("limit_price", e.to_string())),
            (OrderType::Market, Some(_)) => Err(OrderError::invalid(
                "limit_price",
                "Market orders cannot carry a limit price",
            )),
            (OrderType::Market, None) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn market_intent_is_valid() {
        let intent = OrderIntent::market("BTCUSDT", Side::Long, Quantity::from_i64(1));
        assert!(intent.validate().is_ok());
        assert!(!intent.reduce_only);
    }

    #[test]
    fn zero_quantity_is_invalid() {
        let intent = OrderIntent::market("BTCUSDT", Side::Long, Quantity::ZERO);
        let err = intent.validate().unwrap_err();
        assert!(err.to_string().contains("quantity"));
    }

    #[test]
    fn limit_needs_positive_price() {
        let intent = OrderIntent::limit(
            "BTCUSDT",
            Side::Short,
            Quantity::from_i64(1),
            Price::new(dec!(0)),
        );
        assert!(intent.validate().is_err());

        let mut missing = OrderIntent::limit("BTCUSDT", Side::Short, Quantity::from_i64(1), Price::from_i64(5));
        missing.limit_price = None;
        assert!(missing.validate().is_err());
    }

    #[test]
    fn market_with_price_is_invalid() {
        let mut intent = OrderIntent::market("BTCUSDT", Side::Long, Quantity::from_i64(1));
        intent.limit_price = Some(Price::from_i64(10));
        assert!(intent.validate().is_err());
    }

    #[test]
    fn leverage_defaults_to_one_and_must_not_drop_below() {
        let intent = OrderIntent::market("BTCUSDT", Side::Long, Quantity::from_i64(1));
        assert_eq!(intent.leverage, Decimal::ONE);

        let err = intent.clone().with_leverage(dec!(0.5)).validate().unwrap_err();
        assert!(err.to_string().contains("leverage"));
        assert!(intent.with_leverage(dec!(20)).validate().is_ok());
    }

    #[test]
    fn leverage_is_optional_on_the_wire() {
        let json = r#"{"symbol":"BTCUSDT","side":"LONG","order_type":"MARKET","quantity":"1","limit_price":null,"reduce_only":false}"#;
        let intent: OrderIntent = serde_json::from_str(json).unwrap();
        assert_eq!(intent.leverage, Decimal::ONE);
    }

    #[test]
    fn reduce_only_builder() {
        let intent = OrderIntent::market("BTCUSDT", Side::Short, Quantity::from_i64(1)).reduce_only();
        assert!(intent.reduce_only);
    }
}
