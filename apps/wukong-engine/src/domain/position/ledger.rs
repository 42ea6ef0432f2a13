//! Position ledger: the only writer of positions.

use std::collections::BTreeMap;

use super::{LedgerError, Position};
use crate::domain::market_data::Bar;
use crate::domain::order_execution::{Fill, Order};
use crate::domain::shared::Symbol;

/// Net positions keyed by instrument.
///
/// Positions appear on the first fill and are never removed.
#[derive(Debug, Clone, Default)]
pub struct PositionLedger {
    positions: BTreeMap<Symbol, Position>,
}

impl PositionLedger {
    /// Empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Book `fill` from `order`.
    ///
    /// Same-side fills grow the position and re-average the entry price.
    /// Opposite-side fills shrink it; a non-reduce-only fill that passes zero
    /// opens the remainder on the other side at the fill price.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ReduceOnlyViolation`] if a reduce-only fill would
    /// grow the position or change its sign. The position is left untouched.
    pub fn apply(&mut self, order: &Order, fill: &Fill) -> Result<Position, LedgerError> {
        if !fill.quantity().is_positive() {
            return Err(LedgerError::EmptyFill {
                order_id: order.id().clone(),
            });
        }

        let current = self
            .positions
            .get(order.symbol())
            .cloned()
            .unwrap_or_else(|| Position::flat(order.symbol().clone(), fill.timestamp()));

        let booking = current.book(
            order.side(),
            fill.quantity(),
            fill.price(),
            fill.fee(),
            order.leverage(),
            fill.timestamp(),
        );

        if order.is_reduce_only() && (booking.increased || booking.crossed_zero) {
            return Err(LedgerError::ReduceOnlyViolation {
                order_id: order.id().clone(),
                symbol: order.symbol().clone(),
                net_before: current.net_quantity(),
                side: order.side(),
                fill_quantity: fill.quantity(),
            });
        }

        tracing::debug!(
            symbol = %order.symbol(),
            order_id = %order.id(),
            net_before = %current.net_quantity(),
            net_after = %booking.next.net_quantity(),
            avg_entry = %booking.next.avg_entry_price(),
            "Position updated"
        );

        self.positions
            .insert(order.symbol().clone(), booking.next.clone());
        Ok(booking.next)
    }

    /// Record how much of `symbol`'s exposure working reduce-only orders claim.
    ///
    /// Instruments never filled have nothing to reserve.
    pub fn reserve(&mut self, symbol: &Symbol, quantity: rust_decimal::Decimal) {
        if let Some(position) = self.positions.get_mut(symbol) {
            position.reserve(quantity);
        }
    }

    /// Mark an existing position to a bar's close.
    pub fn mark(&mut self, bar: &Bar) {
        if let Some(position) = self.positions.get_mut(bar.symbol()) {
            position.mark(bar.close(), bar.close_time());
        }
    }

    /// Position for `symbol`, if it has ever been filled.
    #[must_use]
    pub fn position(&self, symbol: &Symbol) -> Option<&Position> {
        self.positions.get(symbol)
    }

    /// Signed net quantity, zero for instruments never traded.
    #[must_use]
    pub fn net_quantity(&self, symbol: &Symbol) -> rust_decimal::Decimal {
        self.positions
            .get(symbol)
            .map_or(rust_decimal::Decimal::ZERO, Position::net_quantity)
    }

    /// All positions, ordered by symbol.
    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::{OrderIntent, Side};
    use crate::domain::shared::{FillId, OrderId, Price, Quantity, Timestamp};
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn at() -> Timestamp {
        Timestamp::parse("2024-01-01T00:00:00Z").unwrap()
    }

    fn order(id: &str, side: Side, qty: i64, reduce_only: bool) -> Order {
        let mut intent = OrderIntent::market("BTCUSDT", side, Quantity::from_i64(qty));
        intent.reduce_only = reduce_only;
        Order::new(OrderId::new(id), intent, at()).unwrap()
    }

    fn fill(order: &Order, qty: Decimal, price: Decimal) -> Fill {
        Fill::new(
            FillId::new(format!("F-{}", order.id())),
            order.id().clone(),
            Quantity::new(qty),
            Price::new(price),
            at(),
        )
    }

    fn book(ledger: &mut PositionLedger, side: Side, qty: i64, price: Decimal, reduce_only: bool) -> Result<Position, LedgerError> {
        let o = order("ORD-X", side, qty, reduce_only);
        let f = fill(&o, Decimal::from(qty), price);
        ledger.apply(&o, &f)
    }

    #[test]
    fn first_fill_opens_position() {
        let mut ledger = PositionLedger::new();
        let position = book(&mut ledger, Side::Long, 10, dec!(100), false).unwrap();
        assert_eq!(position.net_quantity(), dec!(10));
        assert_eq!(position.avg_entry_price(), Price::from_i64(100));
        assert_eq!(position.side(), Some(Side::Long));
    }

    #[test]
    fn same_side_reaverages() {
        let mut ledger = PositionLedger::new();
        book(&mut ledger, Side::Long, 10, dec!(100), false).unwrap();
        let position = book(&mut ledger, Side::Long, 10, dec!(110), false).unwrap();
        assert_eq!(position.net_quantity(), dec!(20));
        assert_eq!(position.avg_entry_price(), Price::from_i64(105));
    }

    #[test]
    fn opposite_side_reduces_and_realizes() {
        let mut ledger = PositionLedger::new();
        book(&mut ledger, Side::Long, 10, dec!(100), false).unwrap();
        let position = book(&mut ledger, Side::Short, 4, dec!(110), false).unwrap();
        assert_eq!(position.net_quantity(), dec!(6));
        assert_eq!(position.avg_entry_price(), Price::from_i64(100));
        assert_eq!(position.realized_pnl(), dec!(40));
    }

    #[test]
    fn closing_to_zero_keeps_position_and_average() {
        let mut ledger = PositionLedger::new();
        book(&mut ledger, Side::Short, 5, dec!(50), false).unwrap();
        let position = book(&mut ledger, Side::Long, 5, dec!(45), true).unwrap();
        assert!(position.is_flat());
        assert_eq!(position.side(), None);
        assert_eq!(position.avg_entry_price(), Price::from_i64(50));
        assert_eq!(position.realized_pnl(), dec!(25));
        assert!(ledger.position(&Symbol::new("BTCUSDT")).is_some());
    }

    #[test]
    fn flip_without_reduce_only_opens_other_side() {
        let mut ledger = PositionLedger::new();
        book(&mut ledger, Side::Long, 3, dec!(100), false).unwrap();
        let position = book(&mut ledger, Side::Short, 5, dec!(90), false).unwrap();
        assert_eq!(position.net_quantity(), dec!(-2));
        assert_eq!(position.avg_entry_price(), Price::from_i64(90));
    }

    #[test]
    fn reduce_only_crossing_zero_is_signaled_not_clamped() {
        let mut ledger = PositionLedger::new();
        book(&mut ledger, Side::Long, 3, dec!(100), false).unwrap();
        let err = book(&mut ledger, Side::Short, 5, dec!(90), true).unwrap_err();
        assert!(matches!(err, LedgerError::ReduceOnlyViolation { .. }));
        assert_eq!(ledger.net_quantity(&Symbol::new("BTCUSDT")), dec!(3));
    }

    #[test]
    fn reduce_only_on_flat_book_is_a_violation() {
        let mut ledger = PositionLedger::new();
        let err = book(&mut ledger, Side::Short, 1, dec!(90), true).unwrap_err();
        assert!(err.to_string().contains("Reduce-only"));
        assert!(ledger.position(&Symbol::new("BTCUSDT")).is_none());
    }

    #[test]
    fn reserved_size_is_not_available() {
        let mut ledger = PositionLedger::new();
        let symbol = Symbol::new("BTCUSDT");
        ledger.reserve(&symbol, dec!(1));
        assert!(ledger.position(&symbol).is_none());

        book(&mut ledger, Side::Short, 10, dec!(100), false).unwrap();
        ledger.reserve(&symbol, dec!(7));
        let position = ledger.position(&symbol).unwrap();
        assert_eq!(position.reserved_quantity(), dec!(7));
        assert_eq!(position.available_quantity(), dec!(3));

        ledger.reserve(&symbol, dec!(12));
        assert_eq!(ledger.position(&symbol).unwrap().available_quantity(), Decimal::ZERO);
    }

    #[test]
    fn opening_fill_carries_order_leverage() {
        let mut ledger = PositionLedger::new();
        let mut intent = OrderIntent::market("BTCUSDT", Side::Long, Quantity::from_i64(4));
        intent.leverage = dec!(4);
        let o = Order::new(OrderId::new("ORD-L"), intent, at()).unwrap();
        let position = ledger.apply(&o, &fill(&o, dec!(4), dec!(50))).unwrap();
        assert_eq!(position.leverage(), dec!(4));
        assert_eq!(position.margin(), dec!(50));

        // Reducing keeps the leverage the position was opened with.
        let position = book(&mut ledger, Side::Short, 2, dec!(60), true).unwrap();
        assert_eq!(position.leverage(), dec!(4));
        assert_eq!(position.margin(), dec!(25));
    }

    #[test]
    fn mark_sets_unrealized() {
        let mut ledger = PositionLedger::new();
        book(&mut ledger, Side::Short, 2, dec!(100), false).unwrap();
        let bar = Bar::new(
            Symbol::new("BTCUSDT"),
            crate::domain::market_data::TimeFrame::Hour1,
            Timestamp::parse("2024-01-01T01:00:00Z").unwrap(),
            crate::domain::market_data::Ohlc::new(
                Price::from_i64(100),
                Price::from_i64(100),
                Price::from_i64(90),
                Price::from_i64(95),
            ),
            dec!(1),
        )
        .unwrap();
        ledger.mark(&bar);
        let position = ledger.position(&Symbol::new("BTCUSDT")).unwrap();
        assert_eq!(position.unrealized_pnl(), dec!(10));
    }

    proptest! {
        #[test]
        fn reduce_only_never_changes_sign(
            open in 1i64..50,
            long in any::<bool>(),
            closes in proptest::collection::vec(1i64..30, 1..8),
        ) {
            let mut ledger = PositionLedger::new();
            let side = if long { Side::Long } else { Side::Short };
            book(&mut ledger, side, open, dec!(100), false).unwrap();
            let symbol = Symbol::new("BTCUSDT");
            let started_long = ledger.net_quantity(&symbol) > Decimal::ZERO;
            for qty in closes {
                let _ = book(&mut ledger, side.opposite(), qty, dec!(101), true);
                let net = ledger.net_quantity(&symbol);
                prop_assert!(net.is_zero() || (net > Decimal::ZERO) == started_long);
            }
        }
    }
}
